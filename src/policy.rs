//! Client for the protection policy service.
//!
//! One request per connection over a Unix socket: a newline-terminated JSON
//! request, then a newline-terminated JSON response. Every failure (missing
//! socket, refused connection, timeout, malformed or empty response) collapses
//! into [`PolicyOutcome::Unreachable`]; callers only see reachability.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Config;

/// Upper bound on a response line.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Identifies this hook to the service.
pub const SOURCE: &str = "claude-hook";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyContext {
    pub project_name: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRequest {
    pub action: &'static str,
    pub command: String,
    pub context: PolicyContext,
    pub client_id: String,
}

impl PolicyRequest {
    pub fn validate(command: &str, project_name: Option<&str>) -> Self {
        Self {
            action: "validate",
            command: command.to_string(),
            context: PolicyContext {
                project_name: project_name.map(str::to_string),
                source: SOURCE.to_string(),
            },
            client_id: format!("{SOURCE}-{}", std::process::id()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PolicyResponse {
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Absent and `null` both mean no warnings.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub warnings: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    Unreachable,
    Decided(PolicyResponse),
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("socket i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode request: {0}")]
    Encode(serde_json::Error),
    #[error("malformed response: {0}")]
    Decode(serde_json::Error),
    #[error("service closed the connection without a response")]
    EmptyResponse,
    #[error("no complete response before the deadline")]
    TimedOut,
    #[error("response exceeds {MAX_RESPONSE_BYTES} bytes")]
    Oversized,
}

/// Source of remote policy decisions.
pub trait PolicyService {
    /// Cheap reachability probe; must not block.
    fn is_available(&self) -> bool;

    fn validate(&self, request: &PolicyRequest) -> PolicyOutcome;
}

pub struct PolicyClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl PolicyClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.settings.socket_path(),
            config.settings.socket_timeout(),
        )
    }

    /// One request, one response line, all within a single deadline.
    fn round_trip(&self, request: &PolicyRequest) -> Result<PolicyResponse, PolicyError> {
        let deadline = Instant::now() + self.timeout;
        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.set_write_timeout(Some(remaining(deadline)?))?;

        let mut line = serde_json::to_string(request).map_err(PolicyError::Encode)?;
        line.push('\n');
        stream.write_all(line.as_bytes())?;
        stream.flush()?;

        // Read until the first newline or end of stream. The read timeout is
        // re-armed with what is left of the deadline before every read.
        let mut response = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            stream.set_read_timeout(Some(remaining(deadline)?))?;
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&chunk[..n]);
            if let Some(end) = response.iter().position(|&b| b == b'\n') {
                response.truncate(end);
                break;
            }
            if response.len() > MAX_RESPONSE_BYTES {
                return Err(PolicyError::Oversized);
            }
        }

        if response.iter().all(u8::is_ascii_whitespace) {
            return Err(PolicyError::EmptyResponse);
        }
        serde_json::from_slice(&response).map_err(PolicyError::Decode)
    }
}

/// Time left before `deadline`; an elapsed deadline is a timeout.
fn remaining(deadline: Instant) -> Result<Duration, PolicyError> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or(PolicyError::TimedOut)
}

impl PolicyService for PolicyClient {
    fn is_available(&self) -> bool {
        self.socket_path.exists()
    }

    fn validate(&self, request: &PolicyRequest) -> PolicyOutcome {
        if !self.is_available() {
            return PolicyOutcome::Unreachable;
        }
        match self.round_trip(request) {
            Ok(response) => PolicyOutcome::Decided(response),
            Err(e) => {
                log::debug!(
                    "policy service at {} unreachable: {e}",
                    self.socket_path.display()
                );
                PolicyOutcome::Unreachable
            }
        }
    }
}
