use std::fmt;

/// Coarse error taxonomy used for propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retried locally with backoff up to the retry cap.
    TransientNetwork,
    /// Never retried.
    PermanentRequest,
    /// No asset URL could be found for an item.
    ResolutionEmpty,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    ContentTypeMismatch { content_type: String },
    MalformedPayload,
    Storage(String),
    ResolutionEmpty,
    Cancelled,
}

impl FailureKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            FailureKind::Timeout | FailureKind::Network => ErrorClass::TransientNetwork,
            FailureKind::HttpStatus(code) if is_transient_status(*code) => {
                ErrorClass::TransientNetwork
            }
            FailureKind::ResolutionEmpty => ErrorClass::ResolutionEmpty,
            FailureKind::Cancelled => ErrorClass::Cancelled,
            _ => ErrorClass::PermanentRequest,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::TransientNetwork
    }
}

/// 429 and every 5xx are worth another attempt.
fn is_transient_status(code: u16) -> bool {
    code == 429 || code >= 500
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::ContentTypeMismatch { content_type } => {
                write!(f, "unexpected content type {content_type:?}")
            }
            FailureKind::MalformedPayload => write!(f, "malformed metadata payload"),
            FailureKind::Storage(message) => write!(f, "storage error: {message}"),
            FailureKind::ResolutionEmpty => write!(f, "no original asset url found"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
