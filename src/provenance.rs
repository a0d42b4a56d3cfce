//! YAML sidecar recording how a disc was identified.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Candidate, Fingerprint, ResolvedRecord};
use crate::PROVENANCE_FILENAME;

#[derive(Error, Debug)]
pub enum ProvenanceError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Sidecar contents. Field order is the order written to disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct Provenance {
    pub generator: String,
    pub recorded_at: DateTime<Utc>,
    pub fingerprint: Fingerprint,
    /// Index into `candidates` of the chosen record.
    pub preferred: Option<usize>,
    pub candidates: Vec<Candidate>,
}

impl Provenance {
    pub fn from_record(record: &ResolvedRecord) -> Self {
        Self {
            generator: format!("{} {}", crate::APP_NAME, env!("CARGO_PKG_VERSION")),
            recorded_at: Utc::now(),
            fingerprint: record.fingerprint.clone(),
            preferred: record.preferred_index(),
            candidates: record.candidates.clone(),
        }
    }

    pub fn into_record(self) -> ResolvedRecord {
        ResolvedRecord {
            fingerprint: self.fingerprint,
            candidates: self.candidates,
        }
    }
}

/// Write the sidecar into `directory`, even when the record has no candidates.
pub fn write(record: &ResolvedRecord, directory: &Path) -> Result<PathBuf, ProvenanceError> {
    let path = directory.join(PROVENANCE_FILENAME);
    let yaml = serde_yaml::to_string(&Provenance::from_record(record))?;
    std::fs::write(&path, yaml).map_err(|source| ProvenanceError::Io {
        path: path.clone(),
        source,
    })?;
    log::info!("Wrote disc record {}", path.display());
    Ok(path)
}

/// Read a sidecar back.
pub fn read(path: &Path) -> Result<Provenance, ProvenanceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ProvenanceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ResolvedRecord {
        let mut a = Candidate::default();
        a.disc_info.insert("title".into(), "Test Album".into());
        a.disc_info.insert("category".into(), "rock".into());
        a.track_titles = vec!["One".into(), "Two".into(), "Three".into()];
        let mut b = a.clone();
        b.disc_info.insert("category".into(), "misc".into());

        let mut r = ResolvedRecord::new(Fingerprint::from_toc(&[150, 20000, 40000], 60000));
        r.candidates = vec![a, b];
        r.mark_preferred(1);
        r
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let original = record();
        let path = write(&original, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("00 - disc info.yaml"));

        let loaded = read(&path).unwrap();
        assert_eq!(loaded.preferred, Some(1));
        assert!(loaded.generator.starts_with("discrip "));
        assert_eq!(loaded.into_record(), original);
    }

    #[test]
    fn test_written_without_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let empty = ResolvedRecord::new(Fingerprint::new(0x99, 2));
        let path = write(&empty, dir.path()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("id: 153"));
        assert!(text.contains("candidates: []"));
        assert!(text.contains("preferred: null"));
    }

    #[test]
    fn test_keys_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&record(), dir.path()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let pos = |k: &str| text.find(k).unwrap();
        assert!(pos("generator:") < pos("recorded_at:"));
        assert!(pos("fingerprint:") < pos("candidates:"));
        // disc_info is a sorted map
        assert!(pos("category:") < pos("title:"));
    }
}
