use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// One scraped institution as the collector left it. Only `id`, `name_zh`,
/// `country` and `url` are guaranteed; everything else depends on how much of
/// the detail page survived the scrape.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub name_zh: String,
    pub country: String,
    pub url: String,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub colleges: Option<String>,
    #[serde(default)]
    pub departments: Option<String>,
    #[serde(default)]
    pub grade_requirement: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gpa_min: Option<f64>,
    #[serde(default)]
    pub other_language: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub quota: Option<u32>,
    #[serde(default)]
    pub semesters: Option<String>,
    #[serde(default)]
    pub tuition: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub struct LoadOutcome {
    pub records: Vec<RawRecord>,
    pub skipped: usize,
}

/// Load the raw snapshot. The file must be a readable JSON list; individual
/// elements that fail to deserialize (missing mandatory keys, wrong shapes)
/// are skipped with a diagnostic rather than failing the batch.
pub fn load_records(path: &Path) -> Result<LoadOutcome> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading input file {}", path.display()))?;
    let values: Vec<Value> = serde_json::from_str(&text)
        .with_context(|| format!("parsing {} as a JSON list", path.display()))?;

    let mut records = Vec::with_capacity(values.len());
    let mut skipped = 0;
    for (idx, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawRecord>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("skipping malformed input record #{}: {}", idx + 1, e);
                skipped += 1;
            }
        }
    }

    Ok(LoadOutcome { records, skipped })
}

// Numeric extras round-tripped through spreadsheets upstream, so they arrive
// as numbers or numeric strings. Anything unparseable degrades to absent.
fn lenient_u32<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_path() -> PathBuf {
        PathBuf::from("tests/fixtures/raw_schools.json")
    }

    #[test]
    fn loads_well_formed_records() {
        let outcome = load_records(&fixture_path()).unwrap();
        assert_eq!(outcome.records.len(), 2);
        let first = &outcome.records[0];
        assert_eq!(first.name_zh, "海德堡大學");
        assert_eq!(first.city.as_deref(), Some("海德堡"));
        assert_eq!(first.quota, Some(2), "string quota should parse");
        let second = &outcome.records[1];
        assert_eq!(second.gpa_min, Some(3.2));
        assert_eq!(second.quota, None);
    }

    #[test]
    fn skips_record_missing_mandatory_key() {
        let outcome = load_records(&fixture_path()).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.records.iter().all(|r| !r.id.is_empty()));
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(load_records(Path::new("tests/fixtures/no_such.json")).is_err());
    }

    #[test]
    fn non_list_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"id\": \"1\"}").unwrap();
        assert!(load_records(&path).is_err());
    }

    #[test]
    fn lenient_numerics() {
        let json = r#"{
            "id": "7", "name_zh": "測試大學", "country": "日本",
            "url": "https://example.edu", "quota": "not a number", "gpa_min": 3
        }"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.quota, None);
        assert_eq!(record.gpa_min, Some(3.0));
        assert_eq!(record.text_content, "");
    }
}
