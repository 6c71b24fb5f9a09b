use crate::eval::{Stage, Verdict};
use crate::guards::{Guard, GuardContext, resource_target};
use crate::rules::PRODUCTION_NAMES;

/// Blocks remove/stop/kill/restart aimed at a production-named container.
///
/// Two separate matches: the operation verb on the command, then the
/// production naming convention on the extracted target name.
pub struct ProductionGuard;

impl Guard for ProductionGuard {
    fn name(&self) -> &'static str {
        "production"
    }

    fn check(&self, command: &str, _ctx: &GuardContext) -> Option<Verdict> {
        let name = resource_target(command)?;
        PRODUCTION_NAMES.first_match(name)?;
        Some(Verdict::deny(
            Stage::SafeMode,
            format!("production container '{name}' is protected"),
            Some("we workflow stop <project>".into()),
        ))
    }
}
