use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::Resolution;

pub struct CacheStats {
    pub found: usize,
    pub not_found: usize,
}

/// Persistent geocode cache keyed by (name, city, country). SQLite-backed so
/// settled lookups survive across runs.
pub struct GeocodeCache {
    conn: Connection,
}

impl GeocodeCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating cache directory {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening geocode cache {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let cache = Self { conn };
        cache.init_schema()?;
        Ok(cache)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let cache = Self {
            conn: Connection::open_in_memory()?,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS geocode_cache (
                name        TEXT NOT NULL,
                city        TEXT NOT NULL DEFAULT '',
                country     TEXT NOT NULL DEFAULT '',
                latitude    REAL,
                longitude   REAL,
                found       BOOLEAN NOT NULL,
                resolved_at TEXT NOT NULL,
                PRIMARY KEY (name, city, country)
            );
            ",
        )?;
        Ok(())
    }

    pub fn get(&self, name: &str, city: &str, country: &str) -> Result<Option<Resolution>> {
        let row = self
            .conn
            .query_row(
                "SELECT latitude, longitude, found FROM geocode_cache
                 WHERE name = ?1 AND city = ?2 AND country = ?3",
                params![name, city, country],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(lat, lon, found)| match (found, lat, lon) {
            (true, Some(lat), Some(lon)) => Resolution::Found { lat, lon },
            _ => Resolution::NotFound,
        }))
    }

    /// Record a decision, replacing any earlier entry for the key.
    pub fn put(
        &self,
        name: &str,
        city: &str,
        country: &str,
        outcome: Resolution,
    ) -> Result<()> {
        let (lat, lon, found) = match outcome {
            Resolution::Found { lat, lon } => (Some(lat), Some(lon), true),
            Resolution::NotFound => (None, None, false),
        };
        self.conn.execute(
            "INSERT OR REPLACE INTO geocode_cache
             (name, city, country, latitude, longitude, found, resolved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![name, city, country, lat, lon, found, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let found: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM geocode_cache WHERE found = 1",
            [],
            |r| r.get(0),
        )?;
        let not_found: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM geocode_cache WHERE found = 0",
            [],
            |r| r.get(0),
        )?;
        Ok(CacheStats { found, not_found })
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_found() {
        let cache = GeocodeCache::open_in_memory().unwrap();
        cache
            .put("Heidelberg University", "海德堡", "德國", Resolution::Found {
                lat: 49.41,
                lon: 8.69,
            })
            .unwrap();
        assert_eq!(
            cache.get("Heidelberg University", "海德堡", "德國").unwrap(),
            Some(Resolution::Found { lat: 49.41, lon: 8.69 })
        );
    }

    #[test]
    fn roundtrip_not_found() {
        let cache = GeocodeCache::open_in_memory().unwrap();
        cache.put("幽靈大學", "", "", Resolution::NotFound).unwrap();
        assert_eq!(cache.get("幽靈大學", "", "").unwrap(), Some(Resolution::NotFound));
    }

    #[test]
    fn unknown_key_is_none() {
        let cache = GeocodeCache::open_in_memory().unwrap();
        assert_eq!(cache.get("X", "", "").unwrap(), None);
    }

    #[test]
    fn sentinel_can_be_overwritten() {
        let cache = GeocodeCache::open_in_memory().unwrap();
        cache.put("X", "", "日本", Resolution::NotFound).unwrap();
        cache
            .put("X", "", "日本", Resolution::Found { lat: 35.0, lon: 139.0 })
            .unwrap();
        assert_eq!(
            cache.get("X", "", "日本").unwrap(),
            Some(Resolution::Found { lat: 35.0, lon: 139.0 })
        );
    }

    #[test]
    fn composite_key_is_distinct() {
        let cache = GeocodeCache::open_in_memory().unwrap();
        cache
            .put("X University", "Springfield", "美國", Resolution::Found {
                lat: 1.0,
                lon: 2.0,
            })
            .unwrap();
        assert_eq!(cache.get("X University", "", "美國").unwrap(), None);
        assert_eq!(cache.get("X University", "Springfield", "").unwrap(), None);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        {
            let cache = GeocodeCache::open(&path).unwrap();
            cache
                .put("Waseda University", "", "日本", Resolution::Found {
                    lat: 35.7,
                    lon: 139.7,
                })
                .unwrap();
        }
        let cache = GeocodeCache::open(&path).unwrap();
        assert_eq!(
            cache.get("Waseda University", "", "日本").unwrap(),
            Some(Resolution::Found { lat: 35.7, lon: 139.7 })
        );
    }

    #[test]
    fn stats_counts_by_outcome() {
        let cache = GeocodeCache::open_in_memory().unwrap();
        cache.put("A", "", "", Resolution::Found { lat: 1.0, lon: 1.0 }).unwrap();
        cache.put("B", "", "", Resolution::Found { lat: 2.0, lon: 2.0 }).unwrap();
        cache.put("C", "", "", Resolution::NotFound).unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.found, 2);
        assert_eq!(stats.not_found, 1);
    }
}
