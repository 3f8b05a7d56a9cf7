use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::standardize;

/// Output column contract. Order matters: downstream consumers index by
/// position as well as by name.
pub const COLUMNS: [&str; 21] = [
    "id",
    "name_zh",
    "name_en",
    "country",
    "city",
    "region",
    "latitude",
    "longitude",
    "colleges",
    "departments",
    "grade_requirement",
    "gpa_min",
    "toefl_ibt",
    "ielts",
    "toeic",
    "other_language",
    "quota",
    "semesters",
    "tuition",
    "notes",
    "url",
];

/// One normalized institution. Field order mirrors [`COLUMNS`]; `country_en`
/// is derived for geocode queries and never written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub id: u32,
    pub name_zh: String,
    pub name_en: Option<String>,
    pub country: String,
    pub city: Option<String>,
    pub region: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub colleges: Option<String>,
    pub departments: Option<String>,
    pub grade_requirement: Option<String>,
    pub gpa_min: Option<f64>,
    pub toefl_ibt: Option<u32>,
    pub ielts: Option<f64>,
    pub toeic: Option<u32>,
    pub other_language: Option<String>,
    pub quota: Option<u32>,
    pub semesters: Option<String>,
    pub tuition: Option<String>,
    pub notes: Option<String>,
    pub url: String,
    #[serde(skip)]
    pub country_en: String,
}

impl SchoolRecord {
    /// Name used for geocode queries and display: romanized when available,
    /// otherwise the Chinese name.
    pub fn preferred_name(&self) -> &str {
        self.name_en
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name_zh)
    }

    pub fn missing_coordinates(&self) -> bool {
        self.latitude.is_none() || self.longitude.is_none()
    }
}

/// Read a previously written table and re-derive the internal fields.
pub fn read_table(path: &Path) -> Result<Vec<SchoolRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening table {}", path.display()))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let mut record: SchoolRecord =
            row.with_context(|| format!("parsing table row in {}", path.display()))?;
        record.country_en = standardize::country_to_english(&record.country);
        records.push(record);
    }
    Ok(records)
}

/// Write the full table to a temp sibling and rename it into place, so a
/// crash mid-write never leaves a truncated table behind. The header row is
/// always written, even for an empty table.
pub fn write_atomic(path: &Path, records: &[SchoolRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        writer.write_record(COLUMNS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing {}", tmp.display()))?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("moving {} into place", tmp.display()))?;
    Ok(())
}

// ── Tests ──
