//! Safe Mode guards: local rules applied when the policy service is unreachable.
//!
//! Each guard is independent and either denies the command or passes it on.
//! The gate runs them in a fixed order and stops at the first denial.

/// Built-in forbidden patterns (forced removal, pruning, kills, ...).
pub mod forbidden;
/// Project isolation: keep an agent inside its own project's resources.
pub mod isolation;
/// Protection for production-named containers.
pub mod production;
/// Remote-access target validation against the server allow-list.
pub mod remote;

pub use forbidden::ForbiddenGuard;
pub use isolation::IsolationGuard;
pub use production::ProductionGuard;
pub use remote::RemoteTargetGuard;

use std::sync::LazyLock;

use regex::Regex;

use crate::eval::Verdict;

/// Per-invocation facts a guard may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardContext<'a> {
    /// Current project identifier, if the agent is project-scoped.
    pub project: Option<&'a str>,
}

/// A local rule that can deny a command.
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Some(deny verdict)` to block, `None` to pass.
    fn check(&self, command: &str, ctx: &GuardContext) -> Option<Verdict>;
}

/// Container operation followed by optional flags and a target name.
static RESOURCE_OP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:podman|docker)\s+(?:rm|stop|kill|restart)\s+(?:-\S+\s+)*(\S+)").unwrap()
});

/// Name of the container a remove/stop/kill/restart command targets.
pub(crate) fn resource_target(command: &str) -> Option<&str> {
    RESOURCE_OP
        .captures(command)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\''))
        .filter(|name| !name.is_empty())
}
