//! Remote disc database (CDDB / freedb protocol over HTTP).

pub mod client;
pub mod protocol;

pub use client::CddbClient;

use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::models::{Candidate, Fingerprint, ResolvedRecord};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("CDDB server returned status {code}: {message}")]
    Status { code: u16, message: String },
    #[error("Malformed CDDB response: {0}")]
    Malformed(String),
    #[error("Invalid client agent {0:?}, expected name/version")]
    Agent(String),
}

/// Query-by-fingerprint and read-details operations of a disc database.
pub trait DiscDatabase {
    /// All candidate records for a fingerprint, without track titles.
    fn query(&mut self, fingerprint: &Fingerprint) -> Result<Vec<Candidate>, DatabaseError>;

    /// Fill in the track titles (and extended disc info) of a candidate.
    fn fetch_details(
        &mut self,
        candidate: Candidate,
        fingerprint: &Fingerprint,
    ) -> Result<Candidate, DatabaseError>;
}

/// Query the database and fetch details for every match.
///
/// Zero matches is not an error: the record simply has no candidates.
pub fn resolve(
    database: &mut dyn DiscDatabase,
    fingerprint: &Fingerprint,
) -> Result<ResolvedRecord, DatabaseError> {
    let mut record = ResolvedRecord::new(fingerprint.clone());
    let matches = database.query(fingerprint)?;
    log::info!("{} database match(es) for {fingerprint}", matches.len());

    for candidate in matches {
        let detailed = database.fetch_details(candidate, fingerprint)?;
        record.candidates.push(detailed);
    }
    Ok(record)
}

/// Enforces a minimum delay between successive remote requests.
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Block until the next request is allowed, then record it.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory database returning canned candidates.
    struct FakeDatabase {
        candidates: Vec<Candidate>,
        titles: Vec<Vec<String>>,
        detail_calls: usize,
    }

    impl DiscDatabase for FakeDatabase {
        fn query(&mut self, _fp: &Fingerprint) -> Result<Vec<Candidate>, DatabaseError> {
            Ok(self.candidates.clone())
        }

        fn fetch_details(
            &mut self,
            mut candidate: Candidate,
            _fp: &Fingerprint,
        ) -> Result<Candidate, DatabaseError> {
            candidate.track_titles = self.titles[self.detail_calls].clone();
            self.detail_calls += 1;
            Ok(candidate)
        }
    }

    struct FailingDatabase;

    impl DiscDatabase for FailingDatabase {
        fn query(&mut self, _fp: &Fingerprint) -> Result<Vec<Candidate>, DatabaseError> {
            Err(DatabaseError::Status {
                code: 500,
                message: "Internal error".into(),
            })
        }

        fn fetch_details(&mut self, c: Candidate, _fp: &Fingerprint) -> Result<Candidate, DatabaseError> {
            Ok(c)
        }
    }

    #[test]
    fn test_resolve_fetches_every_candidate() {
        let mut db = FakeDatabase {
            candidates: vec![Candidate::default(), Candidate::default()],
            titles: vec![vec!["a".into()], vec!["b".into()]],
            detail_calls: 0,
        };
        let record = resolve(&mut db, &Fingerprint::new(7, 1)).unwrap();
        assert_eq!(db.detail_calls, 2);
        assert_eq!(record.candidates[0].track_titles, vec!["a"]);
        assert_eq!(record.candidates[1].track_titles, vec!["b"]);
        assert!(record.preferred().is_none());
    }

    #[test]
    fn test_resolve_no_matches() {
        let mut db = FakeDatabase {
            candidates: vec![],
            titles: vec![],
            detail_calls: 0,
        };
        let record = resolve(&mut db, &Fingerprint::new(0x99, 2)).unwrap();
        assert!(record.is_unmatched());
        assert_eq!(record.fingerprint.id, 0x99);
    }

    #[test]
    fn test_resolve_propagates_failure() {
        let err = resolve(&mut FailingDatabase, &Fingerprint::new(1, 1)).unwrap_err();
        assert!(matches!(err, DatabaseError::Status { code: 500, .. }));
    }

    #[test]
    fn test_rate_limiter_spaces_requests() {
        let mut limiter = RateLimiter::new(Duration::from_millis(30));
        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        limiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
