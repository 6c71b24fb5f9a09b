//! codeb-hook: a PreToolUse hook that gates agent shell commands.
//!
//! Each invocation evaluates one command and returns
//! [`eval::Decision::Allow`], [`eval::Decision::Ask`], or
//! [`eval::Decision::Deny`]. Commands are matched as raw text against regex
//! rule sets; nothing is tokenized or executed.
//!
//! # Pipeline
//!
//! 1. Bypass detection: encoded or `eval`-wrapped destructive calls, tampering
//!    with the gate's environment or the policy socket. Always denies.
//! 2. Always-allow: read-only inspection, the `we` workflow CLI, dev tools.
//! 3. Policy service: when its Unix socket exists, its answer is final.
//!    Warnings turn an allow into ask.
//! 4. Safe Mode, only if the service is unreachable: forbidden patterns,
//!    production guard, remote-target allow-list, project isolation.
//!
//! # Architecture
//!
//! - **[`eval`]**: The [`Gate`](crate::eval::Gate), verdict types, per-invocation context.
//! - **[`rules`]**: Built-in rule tables (bypass, allow, forbidden, production names).
//! - **[`guards`]**: Safe Mode guards.
//! - **[`policy`]**: Unix socket client for the protection policy service.
//! - **[`allowlist`]**: Remote-target allow-list from the SSOT cache file.
//! - **[`audit`]**: Append-only audit log of denials (`~/.codeb/hook-audit.log`).
//! - **[`hook`]**: PreToolUse envelope parsing and verdict output.
//! - **[`config`]**: Embedded defaults + user overlay + environment overrides.
//! - **[`logging`]**: Diagnostic logging to stderr.

/// Allow-list resolution from the SSOT cache with compiled-in fallback.
pub mod allowlist;
/// Denial audit log.
pub mod audit;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Decision engine: gate pipeline, verdicts, evaluation context.
pub mod eval;
/// Safe Mode guards applied when the policy service is unreachable.
pub mod guards;
/// Hook envelope in, verdict envelope out.
pub mod hook;
/// Diagnostic logger setup.
pub mod logging;
/// Policy service wire protocol and client.
pub mod policy;
/// Built-in regex rule tables.
pub mod rules;

use config::Config;
use eval::{EvalContext, Gate};

/// Handle one hook invocation from its raw stdin payload.
///
/// Loads configuration and the project context from the environment, then
/// returns the verdict envelope to print (`None` means allow).
pub fn run_hook(input: &str) -> Option<String> {
    let config = Config::load();
    let gate = Gate::new(&config);
    hook::respond(input, &gate, &EvalContext::from_env())
}
