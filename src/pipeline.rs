use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::extract;
use crate::geocode::{CoordinateResolver, Resolution, SearchBackend};
use crate::input::{self, RawRecord};
use crate::standardize;
use crate::table::{self, SchoolRecord};

/// Where and how often the resolve loops flush the partial table.
pub struct Checkpoint {
    pub path: PathBuf,
    pub every: usize,
}

pub struct RunSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

impl RunSummary {
    pub fn print(&self) {
        println!("\nPipeline summary:");
        println!("  Records loaded:    {}", self.loaded);
        println!("  Records skipped:   {}", self.skipped);
        println!("  With coordinates:  {}", self.resolved);
        println!("  Unresolved:        {}", self.unresolved);
    }
}

pub struct ResolveStats {
    pub processed: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

pub struct RetryStats {
    pub candidates: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl RetryStats {
    pub fn print(&self) {
        println!("\nRetry summary:");
        println!("  Unresolved before: {}", self.candidates);
        println!("  Updated:           {}", self.updated);
        println!("  Skipped (no name): {}", self.skipped);
        println!("  Still unresolved:  {}", self.candidates - self.updated - self.skipped);
    }
}

/// Full pipeline: load, assemble, resolve, persist.
pub fn run<B: SearchBackend>(
    input_path: &Path,
    output_path: &Path,
    resolver: &CoordinateResolver<B>,
    geocode: bool,
    limit: Option<usize>,
    checkpoint_every: usize,
) -> Result<RunSummary> {
    let outcome = input::load_records(input_path)?;
    let mut raw = outcome.records;
    if let Some(n) = limit {
        raw.truncate(n);
    }
    info!("loaded {} records ({} skipped)", raw.len(), outcome.skipped);

    let mut records = assemble_records(&raw);

    let (resolved, unresolved) = if geocode {
        let checkpoint = Checkpoint {
            path: output_path.to_path_buf(),
            every: checkpoint_every,
        };
        let stats = resolve_coordinates(&mut records, resolver, Some(&checkpoint));
        (stats.resolved, stats.unresolved)
    } else {
        (0, records.len())
    };

    table::write_atomic(output_path, &records)?;
    info!("wrote {} records to {}", records.len(), output_path.display());

    Ok(RunSummary {
        loaded: records.len(),
        skipped: outcome.skipped,
        resolved,
        unresolved,
    })
}

/// Resumable second pass over an existing table: re-resolve every record
/// still missing coordinates, rewrite the table in place.
pub fn run_retry<B: SearchBackend>(
    output_path: &Path,
    resolver: &CoordinateResolver<B>,
    limit: Option<usize>,
    checkpoint_every: usize,
) -> Result<RetryStats> {
    let mut records = table::read_table(output_path)?;
    info!(
        "loaded {} records, {} without coordinates",
        records.len(),
        records.iter().filter(|r| r.missing_coordinates()).count()
    );

    let checkpoint = Checkpoint {
        path: output_path.to_path_buf(),
        every: checkpoint_every,
    };
    let stats = retry_missing(
        &mut records,
        resolver,
        SchoolRecord::missing_coordinates,
        limit,
        Some(&checkpoint),
    );

    table::write_atomic(output_path, &records)?;
    Ok(stats)
}

/// Build output records from the raw snapshot: sequential ids, extracted
/// fields, standardized categories, defaults. Coordinates stay empty for the
/// resolve stage.
pub fn assemble_records(raw: &[RawRecord]) -> Vec<SchoolRecord> {
    raw.iter()
        .enumerate()
        .map(|(idx, r)| {
            let mut record = base_record(idx as u32 + 1, r);
            apply_extraction(&mut record, &r.text_content);
            apply_standardization(&mut record, r);
            apply_defaults(&mut record);
            record
        })
        .collect()
}

// Carries over the pass-through fields; collector ids are replaced by the
// sequential id.
fn base_record(id: u32, raw: &RawRecord) -> SchoolRecord {
    SchoolRecord {
        id,
        name_zh: raw.name_zh.clone(),
        name_en: None,
        country: raw.country.clone(),
        city: raw.city.clone(),
        region: String::new(),
        latitude: None,
        longitude: None,
        colleges: None,
        departments: raw.departments.clone(),
        grade_requirement: raw.grade_requirement.clone(),
        gpa_min: raw.gpa_min,
        toefl_ibt: None,
        ielts: None,
        toeic: None,
        other_language: raw.other_language.clone(),
        quota: raw.quota,
        semesters: raw.semesters.clone(),
        tuition: raw.tuition.clone(),
        notes: raw.notes.clone(),
        url: raw.url.clone(),
        country_en: String::new(),
    }
}

// The extraction stage owns name_en and the three scores.
fn apply_extraction(record: &mut SchoolRecord, text: &str) {
    let fields = extract::extract_all(text);
    record.name_en = fields.name_en;
    record.toefl_ibt = fields.toefl_ibt;
    record.ielts = fields.ielts;
    record.toeic = fields.toeic;
}

// The standardization stage owns region, colleges and country_en. An empty
// colleges field falls back to the departments text.
fn apply_standardization(record: &mut SchoolRecord, raw: &RawRecord) {
    record.region = standardize::standardize_region(&raw.country).to_string();
    let source = raw
        .colleges
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(raw.departments.as_deref());
    record.colleges = source.and_then(standardize::standardize_colleges);
    record.country_en = standardize::country_to_english(&raw.country);
}

// Defaults fill only absent values; an explicit empty string or zero stays.
fn apply_defaults(record: &mut SchoolRecord) {
    if record.quota.is_none() {
        record.quota = Some(1);
    }
    if record.grade_requirement.is_none() {
        record.grade_requirement = Some("不限".to_string());
    }
    if record.semesters.is_none() {
        record.semesters = Some("Fall,Spring".to_string());
    }
}

/// Sequential first-pass resolution with periodic atomic checkpoints. A
/// checkpoint failure is logged and retried at the next interval.
pub fn resolve_coordinates<B: SearchBackend>(
    records: &mut [SchoolRecord],
    resolver: &CoordinateResolver<B>,
    checkpoint: Option<&Checkpoint>,
) -> ResolveStats {
    let pb = progress_bar(records.len());
    let mut stats = ResolveStats {
        processed: 0,
        resolved: 0,
        unresolved: 0,
    };

    for i in 0..records.len() {
        let resolution = {
            let record = &records[i];
            let (name, city, country) = query_parts(record);
            resolver.resolve(name, city, country)
        };

        match resolution {
            Resolution::Found { lat, lon } => {
                records[i].latitude = Some(lat);
                records[i].longitude = Some(lon);
                stats.resolved += 1;
            }
            Resolution::NotFound => {
                records[i].latitude = None;
                records[i].longitude = None;
                stats.unresolved += 1;
            }
        }

        stats.processed += 1;
        pb.inc(1);
        maybe_checkpoint(records, checkpoint, stats.processed);
    }

    pb.finish_and_clear();
    info!("resolved {} of {} records", stats.resolved, stats.processed);
    stats
}

/// Re-attempt resolution for records matched by `needs_retry` using the
/// expanded query strategy. Only matched records are touched, and only on
/// success; everything else re-serializes exactly as loaded.
pub fn retry_missing<B, F>(
    records: &mut [SchoolRecord],
    resolver: &CoordinateResolver<B>,
    needs_retry: F,
    limit: Option<usize>,
    checkpoint: Option<&Checkpoint>,
) -> RetryStats
where
    B: SearchBackend,
    F: Fn(&SchoolRecord) -> bool,
{
    let mut targets: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| needs_retry(r))
        .map(|(i, _)| i)
        .collect();
    if let Some(n) = limit {
        targets.truncate(n);
    }

    let pb = progress_bar(targets.len());
    let mut stats = RetryStats {
        candidates: targets.len(),
        updated: 0,
        skipped: 0,
    };
    let mut processed = 0;

    for &i in &targets {
        let resolution = {
            let record = &records[i];
            let (name, city, country) = query_parts(record);
            if name.is_empty() {
                warn!("record {} has no usable name, skipping", record.id);
                stats.skipped += 1;
                pb.inc(1);
                continue;
            }
            resolver.resolve_expanded(name, city, country)
        };

        if let Resolution::Found { lat, lon } = resolution {
            records[i].latitude = Some(lat);
            records[i].longitude = Some(lon);
            stats.updated += 1;
        }

        processed += 1;
        pb.inc(1);
        maybe_checkpoint(records, checkpoint, processed);
    }

    pb.finish_and_clear();
    info!("retry updated {} of {} unresolved records", stats.updated, stats.candidates);
    stats
}

// Both passes must derive identical cache keys, so query inputs are
// normalized in one place: empty strings count as absent.
fn query_parts(record: &SchoolRecord) -> (&str, Option<&str>, Option<&str>) {
    let city = record.city.as_deref().filter(|s| !s.is_empty());
    let country = Some(record.country_en.as_str()).filter(|s| !s.is_empty());
    (record.preferred_name(), city, country)
}

fn maybe_checkpoint(records: &[SchoolRecord], checkpoint: Option<&Checkpoint>, processed: usize) {
    if let Some(cp) = checkpoint {
        if cp.every > 0 && processed % cp.every == 0 {
            match table::write_atomic(&cp.path, records) {
                Ok(()) => info!("checkpoint: {} records -> {}", records.len(), cp.path.display()),
                Err(e) => warn!("checkpoint write failed ({}); continuing", e),
            }
        }
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

// ── Tests ──
