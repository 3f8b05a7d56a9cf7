use std::sync::LazyLock;

use regex::Regex;

// Patterns are tried in order; the first in-range capture wins. Both ASCII and
// full-width colons appear in the source text.
static TOEFL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)TOEFL\s*iBT\s*[:：]?\s*(\d+)",
        r"(?i)TOEFL\s*[:：]?\s*(\d+)",
        r"(?i)托福\s*[:：]?\s*(\d+)",
    ])
});
static IELTS_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"(?i)IELTS\s*[:：]?\s*(\d+\.?\d*)"]));
static TOEIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r"(?i)TOEIC\s*[:：]?\s*(\d+)", r"(?i)多益\s*[:：]?\s*(\d+)"])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    ToeflIbt,
    Ielts,
    Toeic,
}

impl TestKind {
    fn patterns(self) -> &'static [Regex] {
        match self {
            TestKind::ToeflIbt => &TOEFL_PATTERNS,
            TestKind::Ielts => &IELTS_PATTERNS,
            TestKind::Toeic => &TOEIC_PATTERNS,
        }
    }

    fn max_score(self) -> f64 {
        match self {
            TestKind::ToeflIbt => 120.0,
            TestKind::Ielts => 9.0,
            TestKind::Toeic => 990.0,
        }
    }
}

/// Parse a minimum language-test score out of free requirement text.
///
/// An out-of-range capture is treated as a non-match and the next pattern is
/// tried, so "TOEFL: 130" yields nothing rather than a bogus score. Callers
/// cannot tell "not mentioned" from "mentioned but invalid"; both are None.
pub fn language_score(text: &str, kind: TestKind) -> Option<f64> {
    let max = kind.max_score();
    for re in kind.patterns() {
        if let Some(caps) = re.captures(text) {
            if let Ok(score) = caps[1].parse::<f64>() {
                if (0.0..=max).contains(&score) {
                    return Some(score);
                }
            }
        }
    }
    None
}
