use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payout provider credentials are not configured")]
    NotConfigured,

    #[error("http error: {0}")]
    Http(String),

    #[error("payout call timed out")]
    Timeout,

    #[error("provider rejected request: status={status}")]
    Rejected { status: u16, payload: Value },

    #[error("decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Provider diagnostic for notes and error responses. Uses the
    /// provider's own payload when there is one, else the error message.
    pub fn diagnostic(&self) -> Value {
        match self {
            GatewayError::Rejected { payload, .. } => payload.clone(),
            other => json!({ "message": other.to_string() }),
        }
    }

    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Http(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_diagnostic_is_provider_payload() {
        let payload = json!({ "name": "VALIDATION_ERROR", "debug_id": "abc" });
        let err = GatewayError::Rejected {
            status: 400,
            payload: payload.clone(),
        };
        assert_eq!(err.diagnostic(), payload);
    }

    #[test]
    fn other_diagnostics_wrap_message() {
        assert_eq!(
            GatewayError::Timeout.diagnostic(),
            json!({ "message": "payout call timed out" })
        );
    }
}
