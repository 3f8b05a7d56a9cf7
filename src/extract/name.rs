// A scraped detail page opens with navigation chrome, then the institution's
// Chinese name, then its romanized name on the following line. The anchor is
// the Chinese-name line; boilerplate lines also containing 大學 are excluded.

const NAME_ANCHOR: &str = "大學";

const ANCHOR_BOILERPLATE: &[&str] = &["主選單", "國際事務處"];

const NAME_KEYWORDS: &[&str] = &[
    "University",
    "College",
    "Institute",
    "School",
    "Academy",
    "Universidade",
    "Université",
    "Universidad",
];

// The scraping office's own header, which sits right above some anchors.
const NAME_BOILERPLATE: &[&str] = &["Office of International Affairs", "National Taiwan University"];

/// Find the romanized institution name in a raw page-text dump.
///
/// Scans for the first anchor line and accepts only its immediate successor,
/// and only when that line carries an institution-type keyword. A page whose
/// first anchor is not followed by a qualifying line yields nothing.
pub fn english_name(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains(NAME_ANCHOR) && !ANCHOR_BOILERPLATE.iter().any(|m| line.contains(m)) {
            let next = lines.get(i + 1).map(|l| l.trim()).unwrap_or("");
            if NAME_KEYWORDS.iter().any(|k| next.contains(k))
                && !NAME_BOILERPLATE.iter().any(|m| next.contains(m))
            {
                return Some(next.to_string());
            }
            return None;
        }
    }

    None
}
