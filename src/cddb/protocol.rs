//! CDDB response parsing (query matches and xmcd entries).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;

use super::DatabaseError;

/// One line of a query response: `<category> <disc id> <title>`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub category: String,
    pub disc_id: String,
    pub title: String,
}

/// Parsed xmcd entry from a read response.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscEntry {
    /// Every non-track key (`DTITLE`, `DYEAR`, `DGENRE`, `EXTD`, ...).
    pub fields: BTreeMap<String, String>,
    /// `TTITLE<n>` values placed at index `n`.
    pub track_titles: Vec<String>,
}

static TRACK_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TTITLE(?P<index>\d+)$").unwrap());

/// Decode a response body: UTF-8 when valid, otherwise byte-for-byte through the carrier.
pub fn decode_payload(bytes: &[u8], carrier: &'static Encoding) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            log::debug!("Response is not UTF-8, decoding as {}", carrier.name());
            carrier.decode_without_bom_handling(bytes).0.into_owned()
        }
    }
}

/// Split the leading status line into its code and message.
pub fn parse_status(body: &str) -> Result<(u16, &str), DatabaseError> {
    let line = body.lines().next().unwrap_or("").trim();
    let (code, message) = line.split_once(' ').unwrap_or((line, ""));
    let code: u16 = code
        .parse()
        .map_err(|_| DatabaseError::Malformed(format!("missing status in {line:?}")))?;
    Ok((code, message))
}

/// Lines following the status line, up to the terminating `.`.
fn payload_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines()
        .skip(1)
        .map(|l| l.trim_end_matches('\r'))
        .take_while(|l| *l != ".")
}

/// Parse a `cddb query` response.
///
/// `200` is a single exact match, `210`/`211` a list of matches and `202`
/// means the disc is unknown. Any non-2xx status is an error.
pub fn parse_query_response(body: &str) -> Result<Vec<QueryMatch>, DatabaseError> {
    let (code, message) = parse_status(body)?;
    match code {
        200 => Ok(vec![parse_match_line(message)?]),
        210 | 211 => payload_lines(body)
            .filter(|l| !l.trim().is_empty())
            .map(parse_match_line)
            .collect(),
        202 => Ok(Vec::new()),
        200..=299 => {
            log::warn!("Unexpected query status {code} {message}, treating as no match");
            Ok(Vec::new())
        }
        _ => Err(DatabaseError::Status {
            code,
            message: message.to_string(),
        }),
    }
}

fn parse_match_line(line: &str) -> Result<QueryMatch, DatabaseError> {
    let mut parts = line.trim().splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(category), Some(disc_id), title) if !category.is_empty() => Ok(QueryMatch {
            category: category.to_string(),
            disc_id: disc_id.to_string(),
            title: title.unwrap_or("").trim().to_string(),
        }),
        _ => Err(DatabaseError::Malformed(format!("bad match line {line:?}"))),
    }
}

/// Parse a `cddb read` response into an entry with `track_count` titles.
pub fn parse_read_response(body: &str, track_count: usize) -> Result<DiscEntry, DatabaseError> {
    let (code, message) = parse_status(body)?;
    if !(200..300).contains(&code) {
        return Err(DatabaseError::Status {
            code,
            message: message.to_string(),
        });
    }

    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    let mut tracks: BTreeMap<usize, String> = BTreeMap::new();

    for line in payload_lines(body) {
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        // Long values are split over several lines with the same key
        match TRACK_KEY_RE.captures(key) {
            Some(caps) => {
                let index: usize = caps["index"]
                    .parse()
                    .map_err(|_| DatabaseError::Malformed(format!("bad track key {key:?}")))?;
                tracks.entry(index).or_default().push_str(value);
            }
            None => fields.entry(key.to_string()).or_default().push_str(value),
        }
    }

    let mut track_titles = vec![String::new(); track_count];
    for (index, title) in tracks {
        match track_titles.get_mut(index) {
            Some(slot) => *slot = title,
            None => log::warn!("Ignoring TTITLE{index}: disc has {track_count} tracks"),
        }
    }
    for (i, title) in track_titles.iter().enumerate() {
        if title.is_empty() {
            log::warn!("No title for track {} in CDDB entry", i + 1);
        }
    }

    Ok(DiscEntry {
        fields,
        track_titles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let m = parse_query_response("200 rock ab12cd03 Artist / Test Album\r\n").unwrap();
        assert_eq!(
            m,
            vec![QueryMatch {
                category: "rock".into(),
                disc_id: "ab12cd03".into(),
                title: "Artist / Test Album".into(),
            }]
        );
    }

    #[test]
    fn test_close_matches() {
        let body = "211 close matches found\r\nrock ab12cd03 A / One\r\nmisc ab12cd04 B / Two\r\n.\r\n";
        let m = parse_query_response(body).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m[1].category, "misc");
        assert_eq!(m[1].title, "B / Two");
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        assert!(parse_query_response("202 No match found\n").unwrap().is_empty());
    }

    #[test]
    fn test_error_status() {
        match parse_query_response("403 Database entry is corrupt\n") {
            Err(DatabaseError::Status { code, message }) => {
                assert_eq!(code, 403);
                assert_eq!(message, "Database entry is corrupt");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_garbage_status() {
        assert!(matches!(
            parse_query_response("<html>oops</html>"),
            Err(DatabaseError::Malformed(_))
        ));
    }

    #[test]
    fn test_read_orders_tracks_numerically() {
        let mut body = String::from("210 rock ab12cd03 CD database entry follows\n# xmcd\n");
        body.push_str("DTITLE=Artist / Album\nDYEAR=1999\n");
        // Deliberately out of order, and 10 sorts before 2 as a string
        for i in [10, 2, 0, 1, 3, 4, 5, 6, 7, 8, 9] {
            body.push_str(&format!("TTITLE{i}=Song {}\n", i + 1));
        }
        body.push_str(".\n");

        let entry = parse_read_response(&body, 11).unwrap();
        let expected: Vec<String> = (1..=11).map(|n| format!("Song {n}")).collect();
        assert_eq!(entry.track_titles, expected);
        assert_eq!(entry.fields["DTITLE"], "Artist / Album");
        assert_eq!(entry.fields["DYEAR"], "1999");
    }

    #[test]
    fn test_read_concatenates_continuations() {
        let body = "210 ok\nTTITLE0=A very long \nTTITLE0=title\nEXTD=x\nEXTD=y\n.\n";
        let entry = parse_read_response(body, 1).unwrap();
        assert_eq!(entry.track_titles, vec!["A very long title"]);
        assert_eq!(entry.fields["EXTD"], "xy");
    }

    #[test]
    fn test_read_pads_and_ignores_extra_tracks() {
        let body = "210 ok\nTTITLE0=One\nTTITLE5=Six\n.\n";
        let entry = parse_read_response(body, 2).unwrap();
        assert_eq!(entry.track_titles, vec!["One".to_string(), String::new()]);
    }

    #[test]
    fn test_read_error_status() {
        assert!(matches!(
            parse_read_response("401 Specified CDDB entry not found.\n", 3),
            Err(DatabaseError::Status { code: 401, .. })
        ));
    }

    #[test]
    fn test_decode_payload_falls_back_to_carrier() {
        let bytes = b"200 rock 1 Caf\xe9\n";
        let s = decode_payload(bytes, encoding_rs::WINDOWS_1252);
        assert!(s.ends_with("Café\n"));
        assert_eq!(decode_payload("Café".as_bytes(), encoding_rs::WINDOWS_1252), "Café");
    }
}
