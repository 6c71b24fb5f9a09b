use crate::config::Config;
use crate::eval::{Stage, Verdict};
use crate::guards::{Guard, GuardContext, resource_target};

/// Stops a project-scoped agent from touching another project's containers.
///
/// Inert without a current project. A target is foreign when its name carries
/// the platform namespace marker but not the current project identifier.
pub struct IsolationGuard {
    marker: String,
}

impl IsolationGuard {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.isolation.namespace_marker.as_str())
    }
}

impl Guard for IsolationGuard {
    fn name(&self) -> &'static str {
        "isolation"
    }

    fn check(&self, command: &str, ctx: &GuardContext) -> Option<Verdict> {
        let project = ctx.project.filter(|p| !p.is_empty())?;
        if self.marker.is_empty() {
            return None;
        }
        let name = resource_target(command)?;
        if name.contains(project) || !name.to_lowercase().contains(&self.marker) {
            return None;
        }
        Some(Verdict::deny(
            Stage::SafeMode,
            format!("container '{name}' belongs to another project (current project: {project})"),
            None,
        ))
    }
}
