#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Decision {
    Allow,
    Ask,
    Deny,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Ask => "ask",
            Decision::Deny => "deny",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Ask => "ASK",
            Decision::Deny => "DENY",
        }
    }
}

/// Pipeline stage that produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The envelope carried no command.
    NoCommand,
    Bypass,
    AlwaysAllow,
    /// Decided by the remote policy service.
    Policy,
    /// Local fallback rules (policy service unreachable).
    SafeMode,
}

/// Final outcome for one command.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: Option<String>,
    /// Safe alternative to offer the agent instead of the blocked command.
    pub suggestion: Option<String>,
    pub stage: Stage,
}

impl Verdict {
    pub fn allow(stage: Stage) -> Self {
        Self {
            decision: Decision::Allow,
            reason: None,
            suggestion: None,
            stage,
        }
    }

    pub fn deny(stage: Stage, reason: impl Into<String>, suggestion: Option<String>) -> Self {
        Self {
            decision: Decision::Deny,
            reason: Some(reason.into()),
            suggestion,
            stage,
        }
    }

    pub fn ask(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Ask,
            reason: Some(reason.into()),
            suggestion: None,
            stage,
        }
    }

    /// Text shown to the user: the reason, then the suggested alternative.
    pub fn message(&self) -> String {
        let mut msg = self.reason.clone().unwrap_or_default();
        if let Some(ref alt) = self.suggestion {
            if !msg.is_empty() {
                msg.push('\n');
            }
            msg.push_str("Suggested: ");
            msg.push_str(alt);
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_order_by_severity() {
        assert!(Decision::Allow < Decision::Ask);
        assert!(Decision::Ask < Decision::Deny);
    }

    #[test]
    fn message_appends_suggestion() {
        let v = Verdict::deny(
            Stage::SafeMode,
            "direct volume removal is forbidden",
            Some("we workflow cleanup <project>".into()),
        );
        assert_eq!(
            v.message(),
            "direct volume removal is forbidden\nSuggested: we workflow cleanup <project>"
        );
    }

    #[test]
    fn message_without_suggestion() {
        let v = Verdict::ask(Stage::Policy, "check this");
        assert_eq!(v.message(), "check this");
        assert_eq!(Verdict::allow(Stage::AlwaysAllow).message(), "");
    }
}
