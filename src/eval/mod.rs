pub mod context;
pub mod decision;

pub use context::EvalContext;
pub use decision::{Decision, Stage, Verdict};

use crate::allowlist::AllowListResolver;
use crate::audit::{AuditAction, AuditSink};
use crate::config::Config;
use crate::guards::{
    ForbiddenGuard, Guard, GuardContext, IsolationGuard, ProductionGuard, RemoteTargetGuard,
};
use crate::policy::{PolicyClient, PolicyOutcome, PolicyRequest, PolicyResponse, PolicyService};
use crate::rules::{ALWAYS_ALLOW, BYPASS};

/// The decision engine.
///
/// Stages, in strict order, each skipped once a verdict exists:
/// 1. bypass detection (deny, cannot be overridden)
/// 2. always-allow rules
/// 3. the remote policy service, when reachable
/// 4. Safe Mode guards, only when the service is unreachable
pub struct Gate {
    policy: Box<dyn PolicyService>,
    guards: Vec<Box<dyn Guard>>,
    audit: AuditSink,
}

impl Gate {
    /// Build the gate with the Unix socket policy client from configuration.
    pub fn new(config: &Config) -> Self {
        Self::with_policy(config, Box::new(PolicyClient::from_config(config)))
    }

    pub fn with_policy(config: &Config, policy: Box<dyn PolicyService>) -> Self {
        // Safe Mode order: forbidden, production, remote target, isolation
        let guards: Vec<Box<dyn Guard>> = vec![
            Box::new(ForbiddenGuard::default()),
            Box::new(ProductionGuard),
            Box::new(RemoteTargetGuard::new(AllowListResolver::from_config(config))),
            Box::new(IsolationGuard::from_config(config)),
        ];
        Self {
            policy,
            guards,
            audit: AuditSink::from_config(config),
        }
    }

    /// Produce exactly one verdict for `command`. Denials are audited.
    pub fn evaluate(&self, command: &str, ctx: &EvalContext) -> Verdict {
        let verdict = self.decide(command, ctx);
        log::debug!(
            "{} via {:?}: {}",
            verdict.decision.label(),
            verdict.stage,
            verdict.reason.as_deref().unwrap_or("-")
        );
        if verdict.decision == Decision::Deny {
            self.audit.record(AuditAction::Denied, &verdict.message(), command);
        }
        verdict
    }

    fn decide(&self, command: &str, ctx: &EvalContext) -> Verdict {
        if command.trim().is_empty() {
            return Verdict::allow(Stage::NoCommand);
        }

        if let Some(rule) = BYPASS.first_match(command) {
            self.audit.record(AuditAction::BypassAttempt, rule.reason, command);
            return Verdict::deny(
                Stage::Bypass,
                format!("Security bypass attempt detected: {}", rule.reason),
                None,
            );
        }

        if let Some(rule) = ALWAYS_ALLOW.first_match(command) {
            log::debug!("always-allow: {}", rule.reason);
            return Verdict::allow(Stage::AlwaysAllow);
        }

        if self.policy.is_available() {
            let request = PolicyRequest::validate(command, ctx.project.as_deref());
            match self.policy.validate(&request) {
                PolicyOutcome::Decided(response) => return from_policy(response),
                PolicyOutcome::Unreachable => {
                    log::debug!("policy service unreachable, using Safe Mode")
                }
            }
        }

        let guard_ctx = GuardContext {
            project: ctx.project.as_deref(),
        };
        for guard in &self.guards {
            if let Some(verdict) = guard.check(command, &guard_ctx) {
                log::debug!("safe mode: {} guard denied", guard.name());
                return verdict;
            }
        }
        Verdict::allow(Stage::SafeMode)
    }
}

fn from_policy(response: PolicyResponse) -> Verdict {
    let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

    if !response.allowed {
        let reason = non_empty(response.reason)
            .unwrap_or_else(|| "Command blocked by the protection policy".into());
        return Verdict::deny(Stage::Policy, reason, non_empty(response.suggestion));
    }
    if !response.warnings.is_empty() {
        let warnings: Vec<String> = response
            .warnings
            .iter()
            .map(|w| format!("- {w}"))
            .collect();
        return Verdict::ask(
            Stage::Policy,
            format!(
                "The protection policy raised warnings:\n{}\n\nConfirm to continue.",
                warnings.join("\n")
            ),
        );
    }
    Verdict::allow(Stage::Policy)
}
