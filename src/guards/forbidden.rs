use crate::eval::{Stage, Verdict};
use crate::guards::{Guard, GuardContext};
use crate::rules::{FORBIDDEN, RuleSet};

/// Denies anything in a forbidden rule set; the matched rule supplies the reason.
pub struct ForbiddenGuard {
    rules: &'static RuleSet,
}

impl ForbiddenGuard {
    pub fn new(rules: &'static RuleSet) -> Self {
        Self { rules }
    }
}

impl Default for ForbiddenGuard {
    fn default() -> Self {
        Self::new(&FORBIDDEN)
    }
}

impl Guard for ForbiddenGuard {
    fn name(&self) -> &'static str {
        "forbidden"
    }

    fn check(&self, command: &str, _ctx: &GuardContext) -> Option<Verdict> {
        let rule = self.rules.first_match(command)?;
        Some(Verdict::deny(
            Stage::SafeMode,
            rule.reason,
            rule.suggestion.map(str::to_string),
        ))
    }
}
