use std::process::Command;

use super::DriveError;
use crate::models::Fingerprint;

/// Source of the inserted disc's fingerprint.
pub trait FingerprintSource {
    fn read(&mut self) -> Result<Fingerprint, DriveError>;
}

/// Fingerprint via the `cd-discid` utility.
///
/// Output format: `<id hex> <track count> <offset frames...> <disc seconds>`.
pub struct CdDiscid {
    command: String,
    device: String,
}

impl CdDiscid {
    pub fn new(command: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            device: device.into(),
        }
    }
}

impl FingerprintSource for CdDiscid {
    fn read(&mut self) -> Result<Fingerprint, DriveError> {
        let toc_err = |message: String| DriveError::Toc {
            device: self.device.clone(),
            message,
        };

        let output = Command::new(&self.command)
            .arg(&self.device)
            .output()
            .map_err(|e| toc_err(format!("could not run {}: {e}", self.command)))?;
        if crate::interrupt::killed_by_signal(&output.status) {
            return Err(DriveError::Interrupted);
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(toc_err(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let fp = parse_discid_line(&stdout).map_err(toc_err)?;
        log::info!("Disc fingerprint: {fp}");
        Ok(fp)
    }
}

/// Parse a `cd-discid` output line, cross-checking the reported ID against the TOC.
pub fn parse_discid_line(line: &str) -> Result<Fingerprint, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(format!("unexpected disc ID output {:?}", line.trim()));
    }

    let id = u32::from_str_radix(fields[0], 16)
        .map_err(|e| format!("bad disc ID {:?}: {e}", fields[0]))?;
    let track_count: usize = fields[1]
        .parse()
        .map_err(|e| format!("bad track count {:?}: {e}", fields[1]))?;
    let expected_fields = track_count
        .checked_add(3)
        .ok_or_else(|| format!("bad track count {track_count}"))?;
    if fields.len() != expected_fields {
        return Err(format!(
            "expected {} offsets, got {}",
            track_count,
            fields.len().saturating_sub(3)
        ));
    }

    let offsets = fields[2..2 + track_count]
        .iter()
        .map(|f| f.parse::<u32>().map_err(|e| format!("bad offset {f:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    let length_secs: u32 = fields[2 + track_count]
        .parse()
        .map_err(|e| format!("bad disc length {:?}: {e}", fields[2 + track_count]))?;

    let leadout = length_secs
        .checked_mul(75)
        .ok_or_else(|| format!("disc length {length_secs}s out of range"))?;
    if let Some(&first) = offsets.first() {
        if leadout < first {
            return Err(format!(
                "disc length {length_secs}s ends before the first track offset {first}"
            ));
        }
    }

    let computed = Fingerprint::from_toc(&offsets, leadout);
    if computed.id != id {
        log::warn!(
            "Drive reported disc ID {id:08x} but TOC computes {:08x}; using reported ID",
            computed.id
        );
    }

    Ok(Fingerprint {
        id,
        track_count: track_count as u32,
        offsets,
        length_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discid_line() {
        let fp = parse_discid_line("1b031e03 3 150 20000 40000 800\n").unwrap();
        assert_eq!(fp.id, 0x1b03_1e03);
        assert_eq!(fp.track_count, 3);
        assert_eq!(fp.offsets, vec![150, 20000, 40000]);
        assert_eq!(fp.length_secs, 800);
    }

    #[test]
    fn test_parse_discid_offset_count_mismatch() {
        let err = parse_discid_line("1b031e03 3 150 20000 800").unwrap_err();
        assert!(err.contains("expected 3 offsets"));
    }

    #[test]
    fn test_parse_discid_length_before_first_offset() {
        let err = parse_discid_line("00000001 1 200000 10").unwrap_err();
        assert!(err.contains("ends before the first track"), "{err}");
    }

    #[test]
    fn test_parse_discid_out_of_range_numbers() {
        let err = parse_discid_line("00000001 1 150 4294967295").unwrap_err();
        assert!(err.contains("out of range"), "{err}");
        let huge = format!("00000001 {} 150 10", usize::MAX);
        assert!(parse_discid_line(&huge).is_err());
    }

    #[test]
    fn test_parse_discid_garbage() {
        assert!(parse_discid_line("").is_err());
        assert!(parse_discid_line("zz 1 150 10").is_err());
    }
}
