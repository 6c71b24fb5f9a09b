//! Remote-target allow-list backed by the SSOT cache file.
//!
//! The cache is written by `we ssot sync` and only ever read here. A missing,
//! malformed, undated, future-dated, or expired cache silently resolves to the
//! compiled-in defaults.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cannot read cache: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed cache: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("cache has no cachedAt timestamp")]
    MissingTimestamp,
    #[error("unrecognized cachedAt timestamp {0:?}")]
    BadTimestamp(String),
    #[error("cachedAt {0} is in the future")]
    ClockSkew(DateTime<Utc>),
    #[error("cache expired ({0} minutes old)")]
    Expired(i64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    cached_at: Option<String>,
    servers: Option<CachedServers>,
}

#[derive(Debug, Deserialize)]
struct CachedServers {
    ips: Option<Vec<String>>,
    hostnames: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowListSource {
    Cache,
    Defaults,
}

/// Permitted remote targets.
#[derive(Debug, Clone)]
pub struct AllowList {
    pub ips: Vec<String>,
    pub hostnames: Vec<String>,
    pub source: AllowListSource,
}

impl AllowList {
    pub fn allows_ip(&self, ip: &str) -> bool {
        self.ips.iter().any(|a| a == ip)
    }

    /// Exact match, or the target contains an allowed name.
    pub fn allows_hostname(&self, host: &str) -> bool {
        self.hostnames
            .iter()
            .any(|h| h == host || (!h.is_empty() && host.contains(h.as_str())))
    }
}

pub struct AllowListResolver {
    cache_path: PathBuf,
    ttl: chrono::Duration,
    default_ips: Vec<String>,
    default_hostnames: Vec<String>,
}

impl AllowListResolver {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_path: config.settings.cache_path(),
            ttl: config.settings.cache_ttl(),
            default_ips: config.allowlist.ips.clone(),
            default_hostnames: config.allowlist.hostnames.clone(),
        }
    }

    /// Resolve against the current clock. Never fails.
    pub fn resolve(&self) -> AllowList {
        self.resolve_at(Utc::now())
    }

    pub fn resolve_at(&self, now: DateTime<Utc>) -> AllowList {
        match self.load(now) {
            Ok(list) => list,
            Err(e) => {
                log::debug!("allow-list cache unusable, using defaults: {e}");
                self.defaults()
            }
        }
    }

    fn defaults(&self) -> AllowList {
        AllowList {
            ips: self.default_ips.clone(),
            hostnames: self.default_hostnames.clone(),
            source: AllowListSource::Defaults,
        }
    }

    fn load(&self, now: DateTime<Utc>) -> Result<AllowList, CacheError> {
        let content = std::fs::read_to_string(&self.cache_path)?;
        let cache: CacheFile = serde_json::from_str(&content)?;

        let raw = cache.cached_at.ok_or(CacheError::MissingTimestamp)?;
        let cached_at = parse_timestamp(&raw).ok_or(CacheError::BadTimestamp(raw))?;
        let age = now.signed_duration_since(cached_at);
        if age < chrono::Duration::zero() {
            return Err(CacheError::ClockSkew(cached_at));
        }
        if age > self.ttl {
            return Err(CacheError::Expired(age.num_minutes()));
        }

        // A cache without a servers block carries nothing to use.
        let Some(servers) = cache.servers else {
            return Ok(self.defaults());
        };
        Ok(AllowList {
            ips: servers.ips.unwrap_or_else(|| self.default_ips.clone()),
            hostnames: servers
                .hostnames
                .unwrap_or_else(|| self.default_hostnames.clone()),
            source: AllowListSource::Cache,
        })
    }
}

/// RFC 3339 (`2026-01-05T08:29:24.123Z`), or a naive ISO-8601 timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn resolver_with(dir: &tempfile::TempDir, content: Option<&str>) -> AllowListResolver {
        let path = dir.path().join("ssot-cache.json");
        if let Some(c) = content {
            std::fs::write(&path, c).unwrap();
        }
        let mut config = Config::default_config();
        config.settings.cache_path = path.to_string_lossy().into_owned();
        AllowListResolver::from_config(&config)
    }

    fn cache_json(cached_at: &str) -> String {
        format!(
            r#"{{"cachedAt": "{cached_at}", "servers": {{"ips": ["198.51.100.7"], "hostnames": ["staging-box"]}}}}"#
        )
    }

    #[test]
    fn missing_cache_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let list = resolver_with(&dir, None).resolve_at(now());
        assert_eq!(list.source, AllowListSource::Defaults);
        assert!(list.allows_ip("141.164.60.51"));
    }

    #[test]
    fn fresh_cache_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let list =
            resolver_with(&dir, Some(&cache_json("2026-03-01T11:31:00Z"))).resolve_at(now());
        assert_eq!(list.source, AllowListSource::Cache);
        assert_eq!(list.ips, vec!["198.51.100.7"]);
        assert!(!list.allows_ip("141.164.60.51"));
    }

    #[test]
    fn expired_cache_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let list =
            resolver_with(&dir, Some(&cache_json("2026-03-01T11:29:00Z"))).resolve_at(now());
        assert_eq!(list.source, AllowListSource::Defaults);
        assert!(!list.allows_ip("198.51.100.7"));
    }

    #[test]
    fn cache_exactly_at_ttl_is_still_valid() {
        let dir = tempfile::tempdir().unwrap();
        let list =
            resolver_with(&dir, Some(&cache_json("2026-03-01T11:30:00Z"))).resolve_at(now());
        assert_eq!(list.source, AllowListSource::Cache);
    }

    #[test]
    fn offset_timestamps_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        // 20:50 at +09:00 is 11:50 UTC
        let list = resolver_with(&dir, Some(&cache_json("2026-03-01T20:50:00+09:00")))
            .resolve_at(now());
        assert_eq!(list.source, AllowListSource::Cache);
    }

    #[test]
    fn naive_timestamp_is_utc() {
        let dir = tempfile::tempdir().unwrap();
        let list = resolver_with(&dir, Some(&cache_json("2026-03-01T11:45:10.250")))
            .resolve_at(now());
        assert_eq!(list.source, AllowListSource::Cache);
    }

    #[test]
    fn future_timestamp_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let list =
            resolver_with(&dir, Some(&cache_json("2026-03-01T13:00:00Z"))).resolve_at(now());
        assert_eq!(list.source, AllowListSource::Defaults);
    }

    #[test]
    fn malformed_or_undated_cache_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        for content in [
            "not json",
            r#"{"servers": {"ips": ["198.51.100.7"]}}"#,
            r#"{"cachedAt": "yesterday", "servers": {"ips": ["198.51.100.7"]}}"#,
            r#"{"cachedAt": "2026-03-01T11:50:00Z", "servers": {"ips": "198.51.100.7"}}"#,
        ] {
            let list = resolver_with(&dir, Some(content)).resolve_at(now());
            assert_eq!(list.source, AllowListSource::Defaults, "{content}");
        }
    }

    #[test]
    fn missing_field_falls_back_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let list = resolver_with(
            &dir,
            Some(r#"{"cachedAt": "2026-03-01T11:50:00Z", "servers": {"ips": ["198.51.100.7"]}}"#),
        )
        .resolve_at(now());
        assert_eq!(list.source, AllowListSource::Cache);
        assert_eq!(list.ips, vec!["198.51.100.7"]);
        assert!(list.hostnames.contains(&"codeb-infra".to_string()));
    }

    #[test]
    fn hostname_matching_is_permissive() {
        let list = AllowList {
            ips: vec![],
            hostnames: vec!["codeb-infra".into(), "localhost".into()],
            source: AllowListSource::Defaults,
        };
        assert!(list.allows_hostname("codeb-infra"));
        assert!(list.allows_hostname("codeb-infra.internal"));
        assert!(list.allows_hostname("localhost"));
        assert!(!list.allows_hostname("evil.example.com"));
    }
}
