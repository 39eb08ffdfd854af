//! Typed error hierarchy shared by both agents.
//!
//! Every error that can surface inside a polling cycle maps to exactly one
//! [`Recovery`] policy, so the loop never has to guess whether to keep going.

use thiserror::Error;

/// What the polling loop does when a cycle fails with a given error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Abandon the rest of this cycle, sleep, poll again.
    SkipCycle,
    /// Only valid before the loop starts: terminate the process.
    Fatal,
}

/// Unified error type for the agents.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Missing credential, bankroll, or an invalid setting.
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream answered with a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    Transport {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Connection, timeout, or body read failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload did not have the shape we expect.
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    /// The completion backend answered without usable text.
    #[error("completion backend returned no text")]
    EmptyCompletion,

    /// Persisted state could not be parsed.
    #[error("state file {path} is corrupt: {reason}")]
    StateCorruption { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Recovery policy for this error kind.
    pub fn recovery(&self) -> Recovery {
        match self {
            AgentError::Config(_) => Recovery::Fatal,
            AgentError::Transport { .. }
            | AgentError::Http(_)
            | AgentError::MalformedResponse { .. }
            | AgentError::EmptyCompletion
            | AgentError::StateCorruption { .. }
            | AgentError::Io(_)
            | AgentError::Json(_) => Recovery::SkipCycle,
        }
    }

    /// Upstream failures, as opposed to local bugs or disk problems.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AgentError::Transport { .. }
                | AgentError::Http(_)
                | AgentError::MalformedResponse { .. }
                | AgentError::EmptyCompletion
        )
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_fatal() {
        assert_eq!(AgentError::Config("no key".into()).recovery(), Recovery::Fatal);
    }

    #[test]
    fn test_upstream_errors_skip_cycle() {
        let transport = AgentError::Transport {
            endpoint: "GET /markets".into(),
            status: 503,
            body: "down".into(),
        };
        assert_eq!(transport.recovery(), Recovery::SkipCycle);
        assert!(transport.is_upstream());

        let malformed = AgentError::malformed("GET /bets", "expected array");
        assert_eq!(malformed.recovery(), Recovery::SkipCycle);
        assert!(malformed.is_upstream());

        assert_eq!(AgentError::EmptyCompletion.recovery(), Recovery::SkipCycle);
    }

    #[test]
    fn test_io_is_not_upstream() {
        let err = AgentError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(err.recovery(), Recovery::SkipCycle);
        assert!(!err.is_upstream());
    }

    #[test]
    fn test_transport_display_includes_status_and_body() {
        let err = AgentError::Transport {
            endpoint: "POST /bet".into(),
            status: 400,
            body: "Insufficient balance".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("Insufficient balance"));
        assert!(msg.contains("POST /bet"));
    }
}
