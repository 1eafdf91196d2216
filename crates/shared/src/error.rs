use thiserror::Error;

use crate::protocol::ErrorBody;

/// A non-2xx outcome from the generation endpoint.
///
/// `Display` is the user-facing message: the server's `detail` string when
/// one was parseable, otherwise the generic status line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ApiFailure {
    pub status: u16,
    pub detail: Option<String>,
}

impl ApiFailure {
    pub fn new(status: u16, detail: Option<String>) -> Self {
        Self { status, detail }
    }

    pub fn from_body(status: u16, body: Option<ErrorBody>) -> Self {
        Self {
            status,
            detail: body.and_then(|b| b.detail),
        }
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => f.write_str(detail),
            None => write!(f, "HTTP error! Status: {}", self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_message_is_shown_verbatim() {
        let failure = ApiFailure::new(400, Some("bad prompt".to_string()));
        assert_eq!(failure.to_string(), "bad prompt");
    }

    #[test]
    fn missing_detail_falls_back_to_status_line() {
        let failure = ApiFailure::new(500, None);
        assert_eq!(failure.to_string(), "HTTP error! Status: 500");
    }

    #[test]
    fn from_body_ignores_body_without_detail() {
        let failure = ApiFailure::from_body(502, Some(ErrorBody::default()));
        assert_eq!(failure.to_string(), "HTTP error! Status: 502");
    }
}
