use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned status {0}")]
    Status(u16),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl FetchError {
    /// Returns `true` for errors worth retrying after a back-off delay:
    /// network-level failures and 5xx responses. Malformed XML is not
    /// retriable — the feed will be just as broken on the next attempt.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            FetchError::Status(code) => *code >= 500,
            FetchError::Xml(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retriable() {
        assert!(FetchError::Status(500).is_retriable());
        assert!(FetchError::Status(503).is_retriable());
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!FetchError::Status(404).is_retriable());
        assert!(!FetchError::Status(403).is_retriable());
    }

}
