//! Classify HTTP status, curl errors and job errors into retry kinds.

use crate::error::PdmError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        408 => ErrorKind::Timeout,
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a job error. Only network failures are ever retried.
pub fn classify(e: &PdmError) -> ErrorKind {
    match e {
        PdmError::HttpStatus { status, .. } => classify_http_status(*status),
        PdmError::Transport { source, .. } => classify_curl_error(source),
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(classify_http_status(500), ErrorKind::Http5xx(500)));
        assert!(matches!(classify_http_status(502), ErrorKind::Http5xx(502)));
    }

    #[test]
    fn http_4xx_other() {
        assert_eq!(classify_http_status(404), ErrorKind::Other);
        assert_eq!(classify_http_status(403), ErrorKind::Other);
        assert_eq!(classify_http_status(408), ErrorKind::Timeout);
    }

    #[test]
    fn filesystem_and_validation_not_retried() {
        let fs = PdmError::fs("mkdir", io::Error::new(io::ErrorKind::Other, "x"));
        assert_eq!(classify(&fs), ErrorKind::Other);
        assert_eq!(classify(&PdmError::Validation("x".into())), ErrorKind::Other);
        let http = PdmError::HttpStatus {
            url: "http://x".into(),
            status: 502,
        };
        assert_eq!(classify(&http), ErrorKind::Http5xx(502));
    }
}
