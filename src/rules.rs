//! Built-in rule tables.
//!
//! Every rule is a case-insensitive regex searched against the raw command
//! text. There is no shell parsing and no quoting awareness: a forbidden token
//! inside a string literal still matches. Within a set the first match wins.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Which concern a rule set covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Bypass,
    Allow,
    Forbid,
    ProductionGuard,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleCategory::Bypass => "bypass",
            RuleCategory::Allow => "allow",
            RuleCategory::Forbid => "forbid",
            RuleCategory::ProductionGuard => "production-guard",
        }
    }
}

/// Uncompiled table entry.
#[derive(Debug, Clone, Copy)]
pub struct RuleDef {
    pub pattern: &'static str,
    pub reason: &'static str,
    pub suggestion: Option<&'static str>,
}

const fn rule(pattern: &'static str, reason: &'static str) -> RuleDef {
    RuleDef {
        pattern,
        reason,
        suggestion: None,
    }
}

const fn rule_alt(pattern: &'static str, reason: &'static str, alt: &'static str) -> RuleDef {
    RuleDef {
        pattern,
        reason,
        suggestion: Some(alt),
    }
}

/// A compiled rule.
#[derive(Debug)]
pub struct Rule {
    pub pattern: Regex,
    pub reason: &'static str,
    pub suggestion: Option<&'static str>,
}

/// An ordered, compiled set of rules for one category.
#[derive(Debug)]
pub struct RuleSet {
    pub category: RuleCategory,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile a table. Patterns are compile-time constants, so a bad one is a bug.
    pub fn compile(category: RuleCategory, defs: &[RuleDef]) -> Self {
        let rules = defs
            .iter()
            .map(|d| Rule {
                pattern: RegexBuilder::new(d.pattern)
                    .case_insensitive(true)
                    .build()
                    .unwrap_or_else(|e| panic!("built-in rule {:?} must compile: {e}", d.pattern)),
                reason: d.reason,
                suggestion: d.suggestion,
            })
            .collect();
        Self { category, rules }
    }

    /// First rule (in table order) whose pattern occurs in `text`.
    pub fn first_match(&self, text: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.pattern.is_match(text))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ── Bypass detection ──

const BYPASS_RULES: &[RuleDef] = &[
    rule(
        r"base64\s+(?:-d|--decode).*\|.*\b(?:ba|z|da)?sh\b",
        "base64-decoded payload piped into a shell",
    ),
    rule(
        r"echo\s+.*\|\s*base64\s+(?:-d|--decode)",
        "base64-encoded command payload",
    ),
    rule(r"\beval\s+.*podman", "eval indirection around podman"),
    rule(r"\beval\s+.*docker", "eval indirection around docker"),
    rule(r"\beval\s+.*rm\s+-rf", "eval indirection around recursive deletion"),
    rule(
        r"export\s+CODEB_SOCKET",
        "redirecting the protection service socket path",
    ),
    rule(
        r"export\s+CODEB_PROJECT",
        "overriding the current project identifier",
    ),
    rule(r"unset\s+CODEB", "unsetting protection environment variables"),
    rule(r"\brm\s+.*protection\.sock", "deleting the protection socket"),
    rule(
        r"\bchmod\s+.*protection\.sock",
        "changing permissions of the protection socket",
    ),
    rule(r"\bmv\s+.*protection\.sock", "moving the protection socket"),
    rule(r"systemctl\s+mask\s+codeb", "masking the protection service"),
    rule(
        r"(?:podman|docker)\s+rm\b.*>\s*/dev/null",
        "container removal with output hidden",
    ),
    rule(
        r"\bnohup\b.*(?:podman|docker)\s+rm\b",
        "container removal sent to the background",
    ),
];

// ── Always allow ──

const ALLOW_RULES: &[RuleDef] = &[
    rule(r"^we\s+", "workflow CLI"),
    rule(
        r"^podman\s+(?:ps|logs|inspect|images|stats|volume\s+ls|network\s+ls)\b",
        "read-only podman inspection",
    ),
    rule(
        r"^docker\s+(?:ps|logs|inspect)\b",
        "read-only docker inspection",
    ),
    rule(r"^(?:ls|cat|grep|find)\b", "read-only file inspection"),
    rule(r"^(?:curl|wget)\b", "http client"),
    rule(r"^git\s+", "git"),
    rule(r"^(?:npm|node)\s+", "node tooling"),
];

// ── Forbidden (Safe Mode) ──

const STOP: &str = "we workflow stop <project>";
const CLEANUP: &str = "we workflow cleanup <project>";

const FORBIDDEN_RULES: &[RuleDef] = &[
    // containers, volumes, networks
    rule_alt(
        r"(?:podman|docker)\s+rm\s+(?:-[a-z]*f|--force)",
        "direct forced container removal is forbidden",
        STOP,
    ),
    rule_alt(
        r"(?:podman|docker)\s+volume\s+(?:rm|remove)\b",
        "direct volume removal is forbidden",
        CLEANUP,
    ),
    rule(
        r"(?:podman|docker)\s+network\s+(?:rm|remove)\b",
        "direct network removal is forbidden",
    ),
    rule_alt(
        r"(?:podman|docker)\s+(?:rm|remove)\s+.*(?:postgres|redis)",
        "database container removal is forbidden",
        STOP,
    ),
    // bulk pruning
    rule(
        r"(?:podman|docker)\s+system\s+prune",
        "system-wide prune is forbidden",
    ),
    rule_alt(
        r"(?:podman|docker)\s+volume\s+prune",
        "pruning all volumes is forbidden",
        CLEANUP,
    ),
    rule(
        r"(?:podman|docker)\s+network\s+prune",
        "pruning all networks is forbidden",
    ),
    rule_alt(
        r"(?:podman|docker)\s+container\s+prune",
        "pruning all containers is forbidden",
        CLEANUP,
    ),
    rule(
        r"(?:podman|docker)\s+image\s+prune\s+(?:-a|--all)",
        "pruning all images is forbidden",
    ),
    rule_alt(
        r"(?:podman|docker)\s+kill\b",
        "forced container termination is forbidden",
        STOP,
    ),
    rule_alt(
        r"(?:podman|docker)[\s-]compose\s+down\b.*\s(?:-[a-z]*v[a-z]*|--volumes)\b",
        "compose down with volume removal is forbidden",
        STOP,
    ),
    // protected directories
    rule(
        r"\brm\s+(?:-rf|-fr)\s+/\s*$",
        "deleting the root filesystem is forbidden",
    ),
    rule(
        r"\brm\s+(?:-rf|-fr|--recursive)\s+.*/var/lib/containers",
        "deleting container storage is forbidden",
    ),
    rule(
        r"\brm\s+(?:-rf|-fr|--recursive)\s+.*/var/lib/docker",
        "deleting docker storage is forbidden",
    ),
    rule(
        r"\brm\s+(?:-rf|-fr|--recursive)\s+.*/home/codeb",
        "deleting the platform home directory is forbidden",
    ),
    rule(
        r"\brm\s+(?:-rf|-fr|--recursive)\s+.*codeb",
        "deleting platform directories is forbidden",
    ),
    rule(
        r"\brm\s+(?:-rf|-fr)\s+.*(?:postgres|redis).*data",
        "deleting database data is forbidden",
    ),
    // services and processes
    rule(
        r"systemctl\s+(?:stop|disable)\s+codeb-protection",
        "stopping the protection service is forbidden",
    ),
    rule(
        r"systemctl\s+(?:stop|disable)\s+podman",
        "stopping the podman service is forbidden",
    ),
    rule(r"\bpkill\s+.*podman", "killing podman processes is forbidden"),
    rule(r"\bpkill\s+.*codeb", "killing platform processes is forbidden"),
    rule(r"\bpkill\s+-9", "forced process termination is forbidden"),
    rule(r"\bkill\s+-9", "forced process termination is forbidden"),
    // destructive remote invocations
    rule(r"\bssh\s+.*rm\s+-rf", "remote recursive deletion is forbidden"),
    rule(
        r"\bssh\s+.*podman\s+rm\s+-f",
        "remote container removal is forbidden",
    ),
    // databases and disks
    rule(r"\bDROP\s+DATABASE\b", "DROP DATABASE is forbidden"),
    rule(r"\bdropdb\s+", "dropdb is forbidden"),
    rule(r"\bFLUSHALL\b", "redis FLUSHALL is forbidden"),
    rule(r"\bFLUSHDB\b", "redis FLUSHDB is forbidden"),
    rule(r"\bmkfs\.", "formatting a filesystem is forbidden"),
    rule(r"\bdd\s+if=.*of=/dev/", "raw disk writes are forbidden"),
];

// ── Production resource names ──

const PRODUCTION_NAME_RULES: &[RuleDef] = &[
    rule(r"-production$", "production suffix"),
    rule(r"-prod$", "production suffix"),
    rule(r"-prd$", "production suffix"),
    rule(r"^prod-", "production prefix"),
    rule(r"^production-", "production prefix"),
];

pub static BYPASS: LazyLock<RuleSet> =
    LazyLock::new(|| RuleSet::compile(RuleCategory::Bypass, BYPASS_RULES));

pub static ALWAYS_ALLOW: LazyLock<RuleSet> =
    LazyLock::new(|| RuleSet::compile(RuleCategory::Allow, ALLOW_RULES));

pub static FORBIDDEN: LazyLock<RuleSet> =
    LazyLock::new(|| RuleSet::compile(RuleCategory::Forbid, FORBIDDEN_RULES));

/// Matched against a resource name, not the whole command.
pub static PRODUCTION_NAMES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::compile(RuleCategory::ProductionGuard, PRODUCTION_NAME_RULES)
});
