//! Repair of mis-encoded CDDB text.
//!
//! Legacy records were often entered in a local code page and later decoded
//! as the carrier encoding (windows-1252 by default), producing mojibake.
//! Repair re-encodes the text to the carrier's bytes and decodes those bytes
//! with the true source encoding. The operator always confirms the result.

use encoding_rs::Encoding;
use thiserror::Error;

use crate::config::EncodingConfig;
use crate::models::Candidate;
use crate::prompt::{prompt_until, Operator, PromptError};

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Unknown encoding label {0:?}")]
    UnknownLabel(String),
}

/// Operator verdict on one proposed source encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verdict {
    Accept,
    Next,
    Keep,
}

pub struct EncodingNormalizer {
    carrier: &'static Encoding,
    fallbacks: Vec<&'static Encoding>,
    enabled: bool,
}

impl EncodingNormalizer {
    pub fn new(carrier: &'static Encoding, fallbacks: Vec<&'static Encoding>) -> Self {
        Self {
            carrier,
            fallbacks,
            enabled: true,
        }
    }

    pub fn from_config(config: &EncodingConfig) -> Result<Self, EncodingError> {
        let carrier = lookup(&config.carrier)?;
        let fallbacks = config
            .fallbacks
            .iter()
            .map(|label| lookup(label))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            enabled: config.repair,
            ..Self::new(carrier, fallbacks)
        })
    }

    pub fn carrier(&self) -> &'static Encoding {
        self.carrier
    }

    /// Re-decode every text field of `candidate` as if its bytes were `source`.
    ///
    /// Malformed sequences become U+FFFD. Fields the carrier cannot represent
    /// were never mangled through it and are returned unchanged. Repair is not
    /// idempotent, so it must only ever be applied to text as received.
    pub fn transcode(&self, candidate: &Candidate, source: &'static Encoding) -> Candidate {
        candidate.map_text(|text| self.repair_text(text, source))
    }

    pub fn repair_text(&self, text: &str, source: &'static Encoding) -> String {
        let (bytes, _, unmappable) = self.carrier.encode(text);
        if unmappable {
            return text.to_string();
        }
        source.decode_without_bom_handling(&bytes).0.into_owned()
    }

    /// Inverse of [`repair_text`](Self::repair_text): how `text` looks after
    /// being stored as `source` and read back as the carrier.
    pub fn mangle_text(&self, text: &str, source: &'static Encoding) -> String {
        let (bytes, _, _) = source.encode(text);
        self.carrier.decode_without_bom_handling(&bytes).0.into_owned()
    }

    /// Carrier bytes of every field, for statistical detection.
    fn carrier_bytes(&self, candidate: &Candidate) -> Vec<u8> {
        let mut bytes = Vec::new();
        for text in candidate.text_fields() {
            bytes.extend_from_slice(&self.carrier.encode(text).0);
            bytes.push(b'\n');
        }
        bytes
    }

    #[cfg(feature = "detect")]
    pub fn guess(&self, candidate: &Candidate) -> Option<&'static Encoding> {
        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(&self.carrier_bytes(candidate), true);
        let guess = detector.guess(None, true);
        log::debug!("Detector guessed {}", guess.name());
        Some(guess)
    }

    #[cfg(not(feature = "detect"))]
    pub fn guess(&self, _candidate: &Candidate) -> Option<&'static Encoding> {
        None
    }

    /// Source encodings to offer, best guess first, without duplicates.
    pub fn proposals(&self, candidate: &Candidate) -> Vec<&'static Encoding> {
        let mut out: Vec<&'static Encoding> = Vec::new();
        for enc in self.guess(candidate).into_iter().chain(self.fallbacks.iter().copied()) {
            if !out.contains(&enc) {
                out.push(enc);
            }
        }
        if out.is_empty() {
            out.push(self.carrier);
        }
        out
    }

    /// Whether a candidate has any text that could be mis-encoded.
    pub fn needs_repair(candidate: &Candidate) -> bool {
        candidate.text_fields().any(|t| !t.is_ascii())
    }

    /// Show repaired renderings until the operator accepts one (or keeps the original).
    pub fn confirm(
        &self,
        candidate: &Candidate,
        operator: &mut dyn Operator,
    ) -> Result<Candidate, PromptError> {
        if !self.enabled {
            return Ok(candidate.clone());
        }
        if !Self::needs_repair(candidate) {
            log::debug!("Candidate text is ASCII, no encoding repair needed");
            return Ok(candidate.clone());
        }

        let proposals = self.proposals(candidate);
        let mut index = 0;
        loop {
            let source = proposals[index];
            let repaired = self.transcode(candidate, source);
            operator.show(&format!(
                "\n----- Decoded as {} ({}/{}) -----\n{}",
                source.name(),
                index + 1,
                proposals.len(),
                repaired.render()
            ));

            let verdict = prompt_until(
                operator,
                "Accept this encoding? [y]es / [n]ext / [k]eep as received: ",
                "Please answer y, n or k",
                parse_verdict,
            )?;
            match verdict {
                Verdict::Accept => {
                    log::info!("Accepted source encoding {}", source.name());
                    return Ok(repaired);
                }
                Verdict::Keep => return Ok(candidate.clone()),
                Verdict::Next => index = (index + 1) % proposals.len(),
            }
        }
    }
}

fn parse_verdict(answer: &str) -> Option<Verdict> {
    match answer.to_lowercase().as_str() {
        "y" | "yes" => Some(Verdict::Accept),
        "n" | "next" => Some(Verdict::Next),
        "k" | "keep" => Some(Verdict::Keep),
        _ => None,
    }
}

fn lookup(label: &str) -> Result<&'static Encoding, EncodingError> {
    Encoding::for_label(label.as_bytes()).ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
}
