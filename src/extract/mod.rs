pub mod name;
pub mod scores;

use scores::TestKind;

/// Fields recovered from one record's raw page text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub name_en: Option<String>,
    pub toefl_ibt: Option<u32>,
    pub ielts: Option<f64>,
    pub toeic: Option<u32>,
}

pub fn extract_all(text: &str) -> ExtractedFields {
    // Score captures are \d+ and range-checked, so the casts cannot truncate.
    ExtractedFields {
        name_en: name::english_name(text),
        toefl_ibt: scores::language_score(text, TestKind::ToeflIbt).map(|s| s as u32),
        ielts: scores::language_score(text, TestKind::Ielts),
        toeic: scores::language_score(text, TestKind::Toeic).map(|s| s as u32),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.txt", name)).unwrap()
    }

    #[test]
    fn heidelberg_fields() {
        let fields = extract_all(&fixture("heidelberg"));
        assert_eq!(fields.name_en.as_deref(), Some("Heidelberg University"));
        assert_eq!(fields.toefl_ibt, Some(95));
        assert_eq!(fields.ielts, Some(7.0));
        assert_eq!(fields.toeic, None);
    }

    #[test]
    fn kyoto_partial_fields() {
        // Name line is followed by quota text, so the name extraction misses;
        // scores still come through.
        let fields = extract_all(&fixture("kyoto"));
        assert_eq!(fields.name_en, None);
        assert_eq!(fields.toefl_ibt, Some(79));
        assert_eq!(fields.ielts, None);
        assert_eq!(fields.toeic, Some(750));
    }

    #[test]
    fn empty_text() {
        assert_eq!(extract_all(""), ExtractedFields::default());
    }
}
