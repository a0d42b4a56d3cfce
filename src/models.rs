use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Disc identity read from the table of contents.
///
/// `id` and `track_count` identify the release (several pressings may share
/// them). `offsets` and `length_secs` are kept because the CDDB query needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub id: u32,
    pub track_count: u32,
    #[serde(default)]
    pub offsets: Vec<u32>,
    #[serde(default)]
    pub length_secs: u32,
}

impl Fingerprint {
    /// Fingerprint with only the identifying fields (no TOC detail).
    pub fn new(id: u32, track_count: u32) -> Self {
        Self {
            id,
            track_count,
            offsets: Vec::new(),
            length_secs: 0,
        }
    }

    /// Compute the freedb disc ID from track start frames and the lead-out frame.
    ///
    /// A lead-out before the first track gives a playing time of zero.
    pub fn from_toc(offsets: &[u32], leadout: u32) -> Self {
        let checksum = offsets
            .iter()
            .fold(0u32, |sum, o| sum.wrapping_add(digit_sum(o / 75)));
        let first = offsets.first().copied().unwrap_or(0);
        let total_secs = (leadout / 75).saturating_sub(first / 75);
        let track_count = offsets.len() as u32;
        let id = ((checksum % 0xff) << 24) | (total_secs << 8) | track_count;

        Self {
            id,
            track_count,
            offsets: offsets.to_vec(),
            length_secs: leadout / 75,
        }
    }

    /// Library tag for this disc: lowercase hex, unpadded.
    pub fn hex(&self) -> String {
        format!("{:x}", self.id)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x} ({} tracks)", self.id, self.track_count)
    }
}

fn digit_sum(mut n: u32) -> u32 {
    let mut sum = 0;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum
}

/// One database match for a disc.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub disc_info: BTreeMap<String, String>,
    pub track_titles: Vec<String>,
    #[serde(default)]
    pub preferred: bool,
}

impl Candidate {
    pub fn title(&self) -> Option<&str> {
        self.disc_info.get("title").map(|s| s.as_str())
    }

    /// All text fields, disc info values first, then track titles.
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        self.disc_info
            .values()
            .chain(self.track_titles.iter())
            .map(|s| s.as_str())
    }

    /// Apply `f` to every text field, producing a new candidate.
    pub fn map_text(&self, mut f: impl FnMut(&str) -> String) -> Candidate {
        Candidate {
            disc_info: self
                .disc_info
                .iter()
                .map(|(k, v)| (k.clone(), f(v)))
                .collect(),
            track_titles: self.track_titles.iter().map(|t| f(t)).collect(),
            preferred: self.preferred,
        }
    }

    /// Human-readable rendering of disc info and track list.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.disc_info {
            out.push_str(&format!("  {key}: {value}\n"));
        }
        out.push('\n');
        for (i, title) in self.track_titles.iter().enumerate() {
            out.push_str(&format!("  Track {:02}: {}\n", i + 1, title));
        }
        out
    }
}

/// Everything learned about a disc: its fingerprint and every candidate considered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    pub fingerprint: Fingerprint,
    pub candidates: Vec<Candidate>,
}

impl ResolvedRecord {
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            candidates: Vec::new(),
        }
    }

    pub fn is_unmatched(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Mark exactly one candidate as preferred.
    pub fn mark_preferred(&mut self, index: usize) {
        for (i, c) in self.candidates.iter_mut().enumerate() {
            c.preferred = i == index;
        }
    }

    pub fn preferred_index(&self) -> Option<usize> {
        self.candidates.iter().position(|c| c.preferred)
    }

    pub fn preferred(&self) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.preferred)
    }
}

/// Disc and track titles after the edit session, suffixed and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedTitles {
    pub disc_title: String,
    pub track_titles: Vec<String>,
    /// No candidate was chosen and the operator kept every placeholder.
    pub unnamed: bool,
}

/// Concrete destination of a disc rip.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscLayout {
    pub directory_path: std::path::PathBuf,
    pub track_filenames: Vec<String>,
    /// The destination exists and overwrite was permitted.
    pub replace_existing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toc_disc_id() {
        // secs 2, 266, 533 -> digit sums 2 + 14 + 11 = 27; length 800 - 2 = 798
        let fp = Fingerprint::from_toc(&[150, 20000, 40000], 60000);
        assert_eq!(fp.id, 0x1b03_1e03);
        assert_eq!(fp.track_count, 3);
        assert_eq!(fp.length_secs, 800);
        assert_eq!(fp.offsets, vec![150, 20000, 40000]);
    }

    #[test]
    fn test_from_toc_leadout_before_first_track() {
        let fp = Fingerprint::from_toc(&[200000], 750);
        assert_eq!(fp.id & 0x00ff_ff00, 0);
        assert_eq!(fp.track_count, 1);
    }

    #[test]
    fn test_hex_unpadded() {
        assert_eq!(Fingerprint::new(0xAB12CD, 3).hex(), "ab12cd");
        assert_eq!(Fingerprint::new(0x99, 2).hex(), "99");
    }

    #[test]
    fn test_display_padded() {
        assert_eq!(Fingerprint::new(0x99, 2).to_string(), "00000099 (2 tracks)");
    }

    #[test]
    fn test_mark_preferred_single() {
        let mut record = ResolvedRecord::new(Fingerprint::new(1, 1));
        record.candidates = vec![Candidate::default(), Candidate::default()];
        record.mark_preferred(1);
        assert_eq!(record.preferred_index(), Some(1));
        record.mark_preferred(0);
        assert_eq!(record.preferred_index(), Some(0));
        assert_eq!(record.candidates.iter().filter(|c| c.preferred).count(), 1);
    }

    #[test]
    fn test_map_text_keeps_keys() {
        let mut c = Candidate::default();
        c.disc_info.insert("title".into(), "abc".into());
        c.track_titles = vec!["x".into()];
        let upper = c.map_text(|s| s.to_uppercase());
        assert_eq!(upper.title(), Some("ABC"));
        assert_eq!(upper.track_titles, vec!["X"]);
    }
}
