pub mod cache;
pub mod candidates;
pub mod service;

pub use cache::{CacheStats, GeocodeCache};
pub use service::{NominatimClient, Place, SearchBackend, ServiceError};

use tracing::{debug, info, warn};

const BASE_RESULT_LIMIT: u8 = 1;
const RETRY_RESULT_LIMIT: u8 = 3;

// Preferred over a raw first result when the service returns several hits.
const RESULT_KEYWORDS: &[&str] = &["university", "college", "institute", "school"];

/// Final decision for one institution. Always recorded in the cache, so a
/// transient service failure is never silently mistaken for a confirmed miss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Found { lat: f64, lon: f64 },
    NotFound,
}

/// Cache-first coordinate resolution over a degrading candidate-query list.
pub struct CoordinateResolver<B: SearchBackend> {
    cache: GeocodeCache,
    backend: B,
}

impl<B: SearchBackend> CoordinateResolver<B> {
    pub fn new(cache: GeocodeCache, backend: B) -> Self {
        Self { cache, backend }
    }

    /// First-pass resolution. Any cached decision short-circuits.
    pub fn resolve(&self, name: &str, city: Option<&str>, country: Option<&str>) -> Resolution {
        let (city_key, country_key) = (city.unwrap_or(""), country.unwrap_or(""));
        if let Some(hit) = self.cached(name, city_key, country_key) {
            return hit;
        }

        let queries = candidates::base_queries(name, city, country);
        let outcome = self.run_queries(&queries, BASE_RESULT_LIMIT);
        self.remember(name, city_key, country_key, outcome);
        outcome
    }

    /// Retry-pass resolution with the expanded query list and a wider result
    /// window. A cached hit stands, but the not-found sentinel is exactly
    /// what this pass re-examines, so it does not short-circuit and the new
    /// decision overwrites it.
    pub fn resolve_expanded(
        &self,
        name: &str,
        city: Option<&str>,
        country: Option<&str>,
    ) -> Resolution {
        let (city_key, country_key) = (city.unwrap_or(""), country.unwrap_or(""));
        if let Some(hit @ Resolution::Found { .. }) = self.cached(name, city_key, country_key) {
            return hit;
        }

        let queries = candidates::retry_queries(name, country);
        let outcome = self.run_queries(&queries, RETRY_RESULT_LIMIT);
        self.remember(name, city_key, country_key, outcome);
        outcome
    }

    fn run_queries(&self, queries: &[String], limit: u8) -> Resolution {
        let mut failures = 0u32;
        for query in queries {
            match self.backend.search(query, limit) {
                Ok(places) => {
                    if places.is_empty() {
                        debug!("no results for {:?}", query);
                        continue;
                    }
                    match pick_coordinates(&places) {
                        Some((lat, lon)) => {
                            info!("resolved {:?} -> ({}, {})", query, lat, lon);
                            return Resolution::Found { lat, lon };
                        }
                        None => debug!("unparseable coordinates in results for {:?}", query),
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!("geocode lookup failed for {:?}: {}", query, e);
                }
            }
        }
        if failures > 0 {
            info!(
                "recording not-found after exhausting {} queries ({} service failures)",
                queries.len(),
                failures
            );
        }
        Resolution::NotFound
    }

    // Cache trouble after startup degrades to a warning; resolution itself
    // must keep going.
    fn cached(&self, name: &str, city: &str, country: &str) -> Option<Resolution> {
        match self.cache.get(name, city, country) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("cache read failed for {:?}: {}", name, e);
                None
            }
        }
    }

    fn remember(&self, name: &str, city: &str, country: &str, outcome: Resolution) {
        if let Err(e) = self.cache.put(name, city, country, outcome) {
            warn!("cache write failed for {:?}: {}", name, e);
        }
    }
}

fn pick_place(places: &[Place]) -> Option<&Place> {
    places
        .iter()
        .find(|p| {
            let display = p.display_name.to_lowercase();
            RESULT_KEYWORDS.iter().any(|k| display.contains(k))
        })
        .or_else(|| places.first())
}

fn pick_coordinates(places: &[Place]) -> Option<(f64, f64)> {
    let place = pick_place(places)?;
    let lat = place.lat.parse().ok()?;
    let lon = place.lon.parse().ok()?;
    Some((lat, lon))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    struct StubBackend {
        responses: HashMap<String, Vec<Place>>,
        failing: HashSet<String>,
        calls: RefCell<Vec<(String, u8)>>,
    }

    impl StubBackend {
        fn new(responses: &[(&str, Vec<Place>)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(q, p)| (q.to_string(), p.clone()))
                    .collect(),
                failing: HashSet::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl SearchBackend for StubBackend {
        fn search(&self, query: &str, limit: u8) -> Result<Vec<Place>, ServiceError> {
            self.calls.borrow_mut().push((query.to_string(), limit));
            if self.failing.contains(query) {
                return Err(ServiceError::Timeout);
            }
            Ok(self.responses.get(query).cloned().unwrap_or_default())
        }
    }

    fn place(lat: &str, lon: &str, display_name: &str) -> Place {
        Place {
            lat: lat.to_string(),
            lon: lon.to_string(),
            display_name: display_name.to_string(),
        }
    }

    fn resolver(backend: StubBackend) -> CoordinateResolver<StubBackend> {
        CoordinateResolver::new(GeocodeCache::open_in_memory().unwrap(), backend)
    }

    #[test]
    fn first_query_wins_and_is_cached() {
        let r = resolver(StubBackend::new(&[(
            "Heidelberg University, Heidelberg, Germany",
            vec![place("49.41", "8.69", "Universität Heidelberg, Germany")],
        )]));

        let first = r.resolve("Heidelberg University", Some("Heidelberg"), Some("Germany"));
        assert_eq!(first, Resolution::Found { lat: 49.41, lon: 8.69 });
        assert_eq!(r.backend.call_count(), 1);

        // Identical input re-resolves from the cache with zero service calls.
        let second = r.resolve("Heidelberg University", Some("Heidelberg"), Some("Germany"));
        assert_eq!(second, first);
        assert_eq!(r.backend.call_count(), 1);
    }

    #[test]
    fn falls_through_to_weaker_query() {
        let r = resolver(StubBackend::new(&[(
            "SNU, South Korea",
            vec![place("37.45", "126.95", "Seoul National University, Korea")],
        )]));

        let got = r.resolve("Seoul National University (SNU)", None, Some("South Korea"));
        assert_eq!(got, Resolution::Found { lat: 37.45, lon: 126.95 });
        assert_eq!(r.backend.call_count(), 2);
    }

    #[test]
    fn service_failure_moves_to_next_candidate() {
        let mut backend = StubBackend::new(&[(
            "Heidelberg University, Germany",
            vec![place("49.41", "8.69", "Universität Heidelberg")],
        )]);
        backend
            .failing
            .insert("Heidelberg University, Heidelberg, Germany".to_string());

        let r = resolver(backend);
        let got = r.resolve("Heidelberg University", Some("Heidelberg"), Some("Germany"));
        assert_eq!(got, Resolution::Found { lat: 49.41, lon: 8.69 });
    }

    #[test]
    fn exhaustion_records_sentinel() {
        let r = resolver(StubBackend::new(&[]));
        let got = r.resolve("幽靈大學", None, Some("日本"));
        assert_eq!(got, Resolution::NotFound);
        assert_eq!(
            r.cache.get("幽靈大學", "", "日本").unwrap(),
            Some(Resolution::NotFound)
        );
    }

    #[test]
    fn retry_bypasses_sentinel_and_overwrites_it() {
        let r = resolver(StubBackend::new(&[(
            "University of Auckland",
            vec![place("-36.85", "174.77", "University of Auckland, New Zealand")],
        )]));
        r.cache
            .put("The University of Auckland", "", "New Zealand", Resolution::NotFound)
            .unwrap();

        // The base pass trusts the sentinel.
        let base = r.resolve("The University of Auckland", None, Some("New Zealand"));
        assert_eq!(base, Resolution::NotFound);
        assert_eq!(r.backend.call_count(), 0);

        // The retry pass does not, and settles the key for good.
        let retried = r.resolve_expanded("The University of Auckland", None, Some("New Zealand"));
        assert_eq!(retried, Resolution::Found { lat: -36.85, lon: 174.77 });
        assert_eq!(
            r.cache.get("The University of Auckland", "", "New Zealand").unwrap(),
            Some(Resolution::Found { lat: -36.85, lon: 174.77 })
        );
    }

    #[test]
    fn retry_honors_cached_hit() {
        let r = resolver(StubBackend::new(&[]));
        r.cache
            .put("Waseda University", "", "Japan", Resolution::Found { lat: 35.7, lon: 139.7 })
            .unwrap();

        let got = r.resolve_expanded("Waseda University", None, Some("Japan"));
        assert_eq!(got, Resolution::Found { lat: 35.7, lon: 139.7 });
        assert_eq!(r.backend.call_count(), 0);
    }

    #[test]
    fn prefers_institutional_display_name() {
        let r = resolver(StubBackend::new(&[(
            "Lund, Sweden",
            vec![
                place("55.70", "13.19", "Lund, Skåne län, Sweden"),
                place("55.71", "13.20", "Lund University, Lund, Sweden"),
            ],
        )]));

        let got = r.resolve("Lund", None, Some("Sweden"));
        assert_eq!(got, Resolution::Found { lat: 55.71, lon: 13.20 });
    }

    #[test]
    fn falls_back_to_first_result() {
        let r = resolver(StubBackend::new(&[(
            "Lund, Sweden",
            vec![
                place("55.70", "13.19", "Lund, Skåne län, Sweden"),
                place("55.71", "13.20", "Lund Cathedral, Lund, Sweden"),
            ],
        )]));

        let got = r.resolve("Lund", None, Some("Sweden"));
        assert_eq!(got, Resolution::Found { lat: 55.70, lon: 13.19 });
    }

    #[test]
    fn unparseable_coordinates_treated_as_miss() {
        let r = resolver(StubBackend::new(&[
            (
                "Heidelberg University, Heidelberg, Germany",
                vec![place("not-a-number", "8.69", "Universität Heidelberg")],
            ),
            (
                "Heidelberg University, Germany",
                vec![place("49.41", "8.69", "Universität Heidelberg")],
            ),
        ]));

        let got = r.resolve("Heidelberg University", Some("Heidelberg"), Some("Germany"));
        assert_eq!(got, Resolution::Found { lat: 49.41, lon: 8.69 });
    }

    #[test]
    fn result_limits_per_pass() {
        let r = resolver(StubBackend::new(&[]));
        r.resolve("X University", None, Some("Nowhere"));
        assert!(r.backend.calls.borrow().iter().all(|(_, limit)| *limit == 1));

        let r = resolver(StubBackend::new(&[]));
        r.resolve_expanded("X University", None, Some("Nowhere"));
        assert!(r.backend.calls.borrow().iter().all(|(_, limit)| *limit == 3));
    }
}
