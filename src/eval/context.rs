/// Environment variable naming the project the agent is scoped to.
pub const PROJECT_ENV: &str = "CODEB_PROJECT";

/// Per-invocation context for evaluating one command.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// Current project identifier; `None` disables project isolation.
    pub project: Option<String>,
}

impl EvalContext {
    pub fn new(project: Option<&str>) -> Self {
        Self {
            project: project.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    /// Read the project identifier from `CODEB_PROJECT`.
    pub fn from_env() -> Self {
        let project = std::env::var(PROJECT_ENV).ok();
        Self::new(project.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_project_is_none() {
        assert!(EvalContext::new(Some("")).project.is_none());
        assert!(EvalContext::new(None).project.is_none());
        assert_eq!(EvalContext::new(Some("shop")).project.as_deref(), Some("shop"));
    }
}
