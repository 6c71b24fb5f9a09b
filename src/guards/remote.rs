use std::sync::LazyLock;

use regex::Regex;

use crate::allowlist::{AllowList, AllowListResolver};
use crate::eval::{Stage, Verdict};
use crate::guards::{Guard, GuardContext};

const SYNC_HINT: &str = "we ssot sync";

static REMOTE_ACCESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(ssh|scp|rsync)\s+").unwrap());

static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}$").unwrap());

/// `ssh [options] [user@]host`. Options in the first branch take an argument;
/// option letters are case-sensitive (`-F` takes one, `-f` does not).
static SSH_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?i:ssh)\s+(?:-[bcDEeFIiJLlmOopQRSWw]\s*\S+\s+|-\S+\s+)*(?:[^\s@]+@)?([^\s@:\-][^\s@:]*)",
    )
    .unwrap()
});

/// Jump hosts given with `-J host[,host]` or `-o ProxyJump=host[,host]`.
static SSH_JUMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)(?:-J\s*|-o\s*(?i:ProxyJump)[=\s]\s*)["']?([^\s"']+)"#).unwrap()
});

/// First IPv4 literal anywhere in a scp/rsync command.
static COPY_IP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:scp|rsync)\s+.*?\b(\d{1,3}(?:\.\d{1,3}){3})\b").unwrap()
});

static RSYNC_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brsync://(?:[^\s@/]+@)?([\w.-]+)").unwrap());

/// `[user@]host:path` operand of scp/rsync.
static COPY_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(?:[^\s@]+@)?([A-Za-z0-9][\w.-]*):").unwrap());

/// Where a remote-access command is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    Ip(String),
    Host(String),
}

impl RemoteTarget {
    fn classify(raw: &str) -> Self {
        if IPV4.is_match(raw) {
            RemoteTarget::Ip(raw.to_string())
        } else {
            RemoteTarget::Host(raw.to_string())
        }
    }
}

/// Whether the command itself is ssh/scp/rsync.
pub fn is_remote_access(command: &str) -> bool {
    REMOTE_ACCESS.is_match(command)
}

/// `[ssh://][user@]host[:port]` to `host`.
fn jump_host(spec: &str) -> Option<&str> {
    let spec = spec.strip_prefix("ssh://").unwrap_or(spec);
    let host = spec.rsplit_once('@').map_or(spec, |(_, host)| host);
    let host = host.split_once(':').map_or(host, |(host, _)| host);
    (!host.is_empty()).then_some(host)
}

/// Every server a remote-access command connects to: for ssh the destination
/// followed by any jump hosts, for scp/rsync the copy target.
pub fn remote_targets(command: &str) -> Vec<RemoteTarget> {
    let Some(verb) = REMOTE_ACCESS.captures(command).and_then(|c| c.get(1)) else {
        return Vec::new();
    };

    if verb.as_str().eq_ignore_ascii_case("ssh") {
        let mut targets: Vec<RemoteTarget> = SSH_TARGET
            .captures(command)
            .and_then(|c| c.get(1))
            .map(|m| RemoteTarget::classify(m.as_str()))
            .into_iter()
            .collect();
        for caps in SSH_JUMP.captures_iter(command) {
            targets.extend(
                caps[1]
                    .split(',')
                    .filter_map(jump_host)
                    .map(RemoteTarget::classify),
            );
        }
        return targets;
    }

    if let Some(ip) = COPY_IP.captures(command).and_then(|c| c.get(1)) {
        return vec![RemoteTarget::Ip(ip.as_str().to_string())];
    }
    RSYNC_URL
        .captures(command)
        .or_else(|| COPY_HOST.captures(command))
        .and_then(|c| c.get(1))
        .map(|host| RemoteTarget::Host(host.as_str().to_string()))
        .into_iter()
        .collect()
}

/// Only applies to ssh/scp/rsync; checks the target against the resolved allow-list.
pub struct RemoteTargetGuard {
    resolver: AllowListResolver,
}

impl RemoteTargetGuard {
    pub fn new(resolver: AllowListResolver) -> Self {
        Self { resolver }
    }

    fn verdict(target: &RemoteTarget, list: &AllowList) -> Option<Verdict> {
        match target {
            RemoteTarget::Ip(ip) if !list.allows_ip(ip) => Some(Verdict::deny(
                Stage::SafeMode,
                format!(
                    "server IP {ip} is not on the allow-list\nAllowed IPs: {}",
                    list.ips.join(", ")
                ),
                Some(SYNC_HINT.into()),
            )),
            RemoteTarget::Host(host) if !list.allows_hostname(host) => Some(Verdict::deny(
                Stage::SafeMode,
                format!(
                    "server {host} is not on the allow-list\nAllowed hosts: {}",
                    list.hostnames.join(", ")
                ),
                Some(SYNC_HINT.into()),
            )),
            _ => None,
        }
    }
}

impl Guard for RemoteTargetGuard {
    fn name(&self) -> &'static str {
        "remote-target"
    }

    fn check(&self, command: &str, _ctx: &GuardContext) -> Option<Verdict> {
        if !is_remote_access(command) {
            return None;
        }
        let targets = remote_targets(command);
        if targets.is_empty() {
            return None;
        }
        let list = self.resolver.resolve();
        log::debug!("remote targets {targets:?} checked against {:?} allow-list", list.source);
        targets.iter().find_map(|target| Self::verdict(target, &list))
    }
}
