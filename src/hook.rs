//! PreToolUse hook envelope: command in, permission decision out.
//!
//! Allow is signalled by printing nothing. Deny and ask print a
//! `hookSpecificOutput` object. A missing or unreadable command is allowed,
//! since the gate only governs command execution.

use serde::Deserialize;

use crate::eval::{Decision, EvalContext, Gate, Verdict};

const HOOK_EVENT_NAME: &str = "PreToolUse";

#[derive(Debug, Deserialize, Default)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<ToolInput>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ToolInput {
    #[serde(default)]
    pub command: Option<String>,
}

/// Extract `tool_input.command`. Empty, absent, or malformed → `None`.
pub fn command_from_envelope(input: &str) -> Option<String> {
    if input.trim().is_empty() {
        return None;
    }
    let hook_input: HookInput = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("unreadable hook input, allowing: {e}");
            return None;
        }
    };
    log::debug!("tool: {}", hook_input.tool_name.as_deref().unwrap_or("?"));
    hook_input
        .tool_input
        .and_then(|t| t.command)
        .filter(|c| !c.trim().is_empty())
}

/// Verdict envelope for deny and ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutput {
    pub decision: Decision,
    pub reason: String,
}

impl HookOutput {
    /// `None` for allow: no output is the allow signal.
    pub fn from_verdict(verdict: &Verdict) -> Option<Self> {
        match verdict.decision {
            Decision::Allow => None,
            decision => Some(Self {
                decision,
                reason: verdict.message(),
            }),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({
            "hookSpecificOutput": {
                "hookEventName": HOOK_EVENT_NAME,
                "permissionDecision": self.decision.as_str(),
                "permissionDecisionReason": self.reason,
            }
        })
        .to_string()
    }
}

/// Evaluate one hook invocation; returns the line to print, if any.
pub fn respond(input: &str, gate: &Gate, ctx: &EvalContext) -> Option<String> {
    let command = command_from_envelope(input)?;
    let verdict = gate.evaluate(&command, ctx);
    HookOutput::from_verdict(&verdict).map(|out| out.to_json())
}
