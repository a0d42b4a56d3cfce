use std::time::Duration;

use encoding_rs::Encoding;

use super::protocol::{self, QueryMatch};
use super::{DatabaseError, DiscDatabase, RateLimiter};
use crate::config::DatabaseConfig;
use crate::models::{Candidate, Fingerprint};

/// CDDB protocol level requested from the server (UTF-8 responses).
const PROTOCOL_LEVEL: &str = "6";

/// HTTP client for a CDDB mirror (`cddb.cgi`).
pub struct CddbClient {
    agent: ureq::Agent,
    url: String,
    user_agent: String,
    hello: String,
    limiter: RateLimiter,
    carrier: &'static Encoding,
}

impl CddbClient {
    pub fn new(config: &DatabaseConfig, carrier: &'static Encoding) -> Result<Self, DatabaseError> {
        let (client_name, client_version) = config
            .agent
            .split_once('/')
            .filter(|(n, v)| !n.is_empty() && !v.is_empty() && !v.contains('/'))
            .ok_or_else(|| DatabaseError::Agent(config.agent.clone()))?;

        let user = std::env::var("USER").unwrap_or_else(|_| "anonymous".to_string());
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());

        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            agent: agent_config.into(),
            url: config.mirror_url.clone(),
            user_agent: config.agent.clone(),
            hello: format!("{user} {host} {client_name} {client_version}"),
            limiter: RateLimiter::new(Duration::from_millis(config.rate_limit_ms)),
            carrier,
        })
    }

    /// Send one CDDB command and return the decoded response body.
    fn command(&mut self, cmd: &str) -> Result<String, DatabaseError> {
        self.limiter.wait();
        log::debug!("CDDB command: {cmd}");

        let http_err = |e: ureq::Error| DatabaseError::Http {
            url: self.url.clone(),
            source: Box::new(e),
        };
        let mut response = self
            .agent
            .get(&self.url)
            .header("User-Agent", &self.user_agent)
            .query("cmd", cmd)
            .query("hello", &self.hello)
            .query("proto", PROTOCOL_LEVEL)
            .call()
            .map_err(http_err)?;
        let bytes = response.body_mut().read_to_vec().map_err(http_err)?;
        Ok(protocol::decode_payload(&bytes, self.carrier))
    }
}

impl DiscDatabase for CddbClient {
    fn query(&mut self, fingerprint: &Fingerprint) -> Result<Vec<Candidate>, DatabaseError> {
        let body = self.command(&query_command(fingerprint))?;
        let matches = protocol::parse_query_response(&body)?;
        Ok(matches.into_iter().map(candidate_from_match).collect())
    }

    fn fetch_details(
        &mut self,
        mut candidate: Candidate,
        fingerprint: &Fingerprint,
    ) -> Result<Candidate, DatabaseError> {
        let category = candidate.disc_info.get("category").cloned().unwrap_or_default();
        let disc_id = candidate.disc_info.get("disc_id").cloned().unwrap_or_default();
        let body = self.command(&format!("cddb read {category} {disc_id}"))?;

        let entry = protocol::parse_read_response(&body, fingerprint.track_count as usize)?;
        candidate.disc_info.extend(entry.fields);
        candidate.track_titles = entry.track_titles;
        Ok(candidate)
    }
}

/// `cddb query <id> <n> <offsets...> <seconds>`
pub fn query_command(fingerprint: &Fingerprint) -> String {
    let mut cmd = format!(
        "cddb query {:08x} {}",
        fingerprint.id, fingerprint.track_count
    );
    for offset in &fingerprint.offsets {
        cmd.push_str(&format!(" {offset}"));
    }
    cmd.push_str(&format!(" {}", fingerprint.length_secs));
    cmd
}

fn candidate_from_match(m: QueryMatch) -> Candidate {
    let mut candidate = Candidate::default();
    candidate.disc_info.insert("category".to_string(), m.category);
    candidate.disc_info.insert("disc_id".to_string(), m.disc_id);
    candidate.disc_info.insert("title".to_string(), m.title);
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_command() {
        let fp = Fingerprint::from_toc(&[150, 20000, 40000], 60000);
        assert_eq!(query_command(&fp), "cddb query 1b031e03 3 150 20000 40000 800");
    }

    #[test]
    fn test_candidate_from_match() {
        let c = candidate_from_match(QueryMatch {
            category: "rock".into(),
            disc_id: "ab12cd03".into(),
            title: "Test Album".into(),
        });
        assert_eq!(c.title(), Some("Test Album"));
        assert_eq!(c.disc_info["category"], "rock");
        assert!(c.track_titles.is_empty());
        assert!(!c.preferred);
    }

    #[test]
    fn test_rejects_bad_agent() {
        let config = DatabaseConfig {
            agent: "no-version".into(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            CddbClient::new(&config, encoding_rs::WINDOWS_1252),
            Err(DatabaseError::Agent(_))
        ));
    }

    #[test]
    fn test_default_agent_accepted() {
        assert!(CddbClient::new(&DatabaseConfig::default(), encoding_rs::WINDOWS_1252).is_ok());
    }
}
