use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Environment variable overriding the policy service socket path.
pub const SOCKET_PATH_ENV: &str = "CODEB_SOCKET_PATH";

// ── Final (merged) config types ──

/// Immutable gate configuration, built once per invocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub allowlist: AllowListConfig,
    #[serde(default)]
    pub isolation: IsolationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub socket_path: String,
    #[serde(default)]
    pub socket_timeout_ms: u64,
    #[serde(default)]
    pub cache_path: String,
    #[serde(default)]
    pub cache_ttl_minutes: i64,
    #[serde(default)]
    pub audit_log_path: String,
    /// Maximum number of command characters written to an audit line.
    #[serde(default)]
    pub audit_command_prefix: usize,
}

/// Compiled-in allow-list used whenever the SSOT cache is unusable.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AllowListConfig {
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub hostnames: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IsolationConfig {
    /// Marker identifying platform-managed resources (case-insensitive).
    #[serde(default)]
    pub namespace_marker: String,
}

impl Settings {
    pub fn socket_path(&self) -> PathBuf {
        expand_path(&self.socket_path)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn cache_path(&self) -> PathBuf {
        expand_path(&self.cache_path)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache_ttl_minutes)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        expand_path(&self.audit_log_path)
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    allowlist: AllowListOverlay,
    #[serde(default)]
    isolation: IsolationOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    socket_path: Option<String>,
    socket_timeout_ms: Option<u64>,
    cache_path: Option<String>,
    cache_ttl_minutes: Option<i64>,
    audit_log_path: Option<String>,
    audit_command_prefix: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct AllowListOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    ips: Vec<String>,
    #[serde(default)]
    hostnames: Vec<String>,
    #[serde(default)]
    remove_ips: Vec<String>,
    #[serde(default)]
    remove_hostnames: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct IsolationOverlay {
    namespace_marker: Option<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/codeb-hook/config.toml (if exists)
    /// 3. Apply environment overrides (`CODEB_SOCKET_PATH`)
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        if let Some(path) = std::env::var_os(SOCKET_PATH_ENV)
            && !path.is_empty()
        {
            config.settings.socket_path = path.to_string_lossy().into_owned();
        }
        config
    }

    /// Try to load user overlay from ~/.config/codeb-hook/config.toml.
    fn load_overlay() -> Option<ConfigOverlay> {
        let path = expand_path("~/.config/codeb-hook/config.toml");
        let content = std::fs::read_to_string(&path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                log::warn!("ignoring {}: {e}", path.display());
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.socket_path {
            self.settings.socket_path = v;
        }
        if let Some(v) = s.socket_timeout_ms {
            self.settings.socket_timeout_ms = v;
        }
        if let Some(v) = s.cache_path {
            self.settings.cache_path = v;
        }
        if let Some(v) = s.cache_ttl_minutes {
            self.settings.cache_ttl_minutes = v;
        }
        if let Some(v) = s.audit_log_path {
            self.settings.audit_log_path = v;
        }
        if let Some(v) = s.audit_command_prefix {
            self.settings.audit_command_prefix = v;
        }

        let a = overlay.allowlist;
        merge_list(&mut self.allowlist.ips, a.ips, &a.remove_ips, a.replace);
        merge_list(
            &mut self.allowlist.hostnames,
            a.hostnames,
            &a.remove_hostnames,
            a.replace,
        );

        if let Some(v) = overlay.isolation.namespace_marker {
            self.isolation.namespace_marker = v;
        }
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
