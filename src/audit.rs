use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Denied,
    BypassAttempt,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Denied => "DENIED",
            AuditAction::BypassAttempt => "BYPASS_ATTEMPT",
        }
    }
}

/// Append-only audit log of denials.
pub struct AuditSink {
    path: PathBuf,
    prefix_len: usize,
}

impl AuditSink {
    pub fn new(path: impl Into<PathBuf>, prefix_len: usize) -> Self {
        Self {
            path: path.into(),
            prefix_len,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.settings.audit_log_path(),
            config.settings.audit_command_prefix,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Best-effort: failures are silently ignored
    /// (auditing must never block the hook).
    pub fn record(&self, action: AuditAction, message: &str, command: &str) {
        if let Err(e) = self.append(&self.format_line(action, message, command)) {
            log::debug!("audit write to {} failed: {e}", self.path.display());
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// `[timestamp] ACTION: message | Command: <prefix>\n`
    fn format_line(&self, action: AuditAction, message: &str, command: &str) -> String {
        // Compact single-line message (replace newlines with "; ")
        let message = message.replace('\n', "; ");
        let ts = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f");
        let mut line = format!("[{ts}] {}: {message}", action.as_str());
        if !command.is_empty() {
            let prefix: String = command
                .chars()
                .take(self.prefix_len)
                .map(|c| if c == '\n' { ' ' } else { c })
                .collect();
            line.push_str(" | Command: ");
            line.push_str(&prefix);
        }
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let sink = AuditSink::new(dir.path().join("nested/dir/audit.log"), 100);
        sink.record(AuditAction::BypassAttempt, "eval indirection", "eval podman rm x");
        sink.record(AuditAction::Denied, "blocked", "eval podman rm x");

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].contains("] BYPASS_ATTEMPT: eval indirection | Command: eval podman rm x"));
        assert!(lines[1].contains("] DENIED: blocked | Command: eval podman rm x"));
    }

    #[test]
    fn truncates_command_prefix() {
        let sink = AuditSink::new("/unused", 10);
        let line = sink.format_line(AuditAction::Denied, "msg", &"x".repeat(500));
        assert!(line.ends_with(&format!("| Command: {}\n", "x".repeat(10))));
    }

    #[test]
    fn flattens_multiline_message() {
        let sink = AuditSink::new("/unused", 100);
        let line = sink.format_line(AuditAction::Denied, "first\nsecond", "");
        assert!(line.ends_with("DENIED: first; second\n"));
        assert!(!line.contains("Command:"));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn unwritable_path_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        // Parent is a regular file, so create_dir_all fails.
        let sink = AuditSink::new(blocker.join("audit.log"), 100);
        sink.record(AuditAction::Denied, "msg", "cmd");
        assert!(!sink.path().exists());
    }
}
