//! Gateway error taxonomy
//!
//! Upstream failures are translated at the handler boundary into one of a
//! small set of outward-facing classes; raw upstream error bodies never
//! leave the gateway. Failures inside a fan-out batch are not errors at all,
//! they become per-item markers in the aggregated response.

use thiserror::Error;

/// Outward-facing failure classes of the gateway
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The caller's request is malformed (missing required parameter)
    #[error("{0}")]
    BadRequest(String),

    /// Upstream reports the resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Upstream quota exhaustion or permission denial (403/429)
    #[error("{0}")]
    RateLimited(String),

    /// Timeout, network error, or any unexpected upstream status
    #[error("{0}")]
    Upstream(String),
}

impl GatewayError {
    /// Translate an upstream HTTP status into the outward class
    ///
    /// `what` names the resource for the human-readable message.
    pub fn from_status(status: u16, what: &str) -> Self {
        match status {
            404 => GatewayError::NotFound(format!("{what} not found on GitHub.")),
            403 | 429 => GatewayError::RateLimited(format!(
                "GitHub rate limit reached or access forbidden while fetching {what}. \
                 Retry later or log in for higher limits."
            )),
            _ => GatewayError::Upstream(format!("Error fetching {what} from GitHub.")),
        }
    }

    /// Rewrite the message to name the resource, keeping the class
    ///
    /// The upstream client only knows URLs; handlers use this to attach the
    /// resource name the caller asked for.
    pub fn describing(self, what: &str) -> Self {
        match self {
            GatewayError::BadRequest(m) => GatewayError::BadRequest(m),
            GatewayError::NotFound(_) => GatewayError::from_status(404, what),
            GatewayError::RateLimited(_) => GatewayError::from_status(403, what),
            GatewayError::Upstream(_) => {
                GatewayError::Upstream(format!("Error fetching {what} from GitHub."))
            }
        }
    }

    /// The HTTP status this error maps to on the inbound surface
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::BadRequest(_) => 400,
            GatewayError::NotFound(_) => 404,
            GatewayError::RateLimited(_) => 403,
            GatewayError::Upstream(_) => 500,
        }
    }
}
