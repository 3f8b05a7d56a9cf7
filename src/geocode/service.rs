use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// One result row from the geocoding service. Coordinates arrive as
/// stringified decimal degrees.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,
    #[error("service returned HTTP {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Seam between the resolver and the live service, so resolution logic stays
/// testable without network access.
pub trait SearchBackend {
    fn search(&self, query: &str, limit: u8) -> Result<Vec<Place>, ServiceError>;
}

/// Blocking Nominatim client. The service's usage policy requires a custom
/// User-Agent and at most one request per second, so every call is paced
/// against the previous one and bounded by a timeout.
pub struct NominatimClient {
    http: reqwest::blocking::Client,
    base_url: String,
    min_interval: Duration,
    timeout: Duration,
    last_call: Cell<Option<Instant>>,
}

impl NominatimClient {
    pub fn new(
        base_url: &str,
        user_agent: &str,
        min_interval: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            min_interval,
            timeout,
            last_call: Cell::new(None),
        })
    }

    fn pace(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
    }

    fn request(&self, query: &str, limit: u8) -> Result<Vec<Place>, ServiceError> {
        let limit = limit.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", limit.as_str()),
                ("addressdetails", "1"),
            ])
            .timeout(self.timeout)
            .send()
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }

        let body = response.text().map_err(classify)?;
        debug!("geocode response for {:?}: {} bytes", query, body.len());
        Ok(serde_json::from_str(&body)?)
    }
}

impl SearchBackend for NominatimClient {
    fn search(&self, query: &str, limit: u8) -> Result<Vec<Place>, ServiceError> {
        self.pace();
        let result = self.request(query, limit);
        self.last_call.set(Some(Instant::now()));
        result
    }
}

fn classify(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::Transport(e)
    }
}

// ── Tests ──
