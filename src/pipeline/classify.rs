use std::io;

use crate::errors::MaskError;
use crate::models::{ErrorCode, JobError};

const NETWORK_ERROR_CODES: &[&str] = &[
    "ECONNREFUSED",
    "ENOTFOUND",
    "EAI_AGAIN",
    "ENETUNREACH",
    "EHOSTUNREACH",
    "ECONNRESET",
];

const TIMEOUT_ERROR_CODES: &[&str] = &["ETIMEDOUT", "ABORT_ERR"];

/// Map a failure from the masking call onto the stable error taxonomy.
///
/// Typed transport information anywhere in the chain wins; otherwise the
/// rendered message is matched against keyword rules in a fixed order.
pub fn classify_error(err: &anyhow::Error) -> JobError {
    let message = format!("{:#}", err);
    let code = typed_code(err).unwrap_or_else(|| message_code(err, &message));
    JobError::new(code, message)
}

fn typed_code(err: &anyhow::Error) -> Option<ErrorCode> {
    for cause in err.chain() {
        if let Some(mask_err) = cause.downcast_ref::<MaskError>() {
            match mask_err {
                MaskError::Transport { code, .. } => {
                    let code = code.to_ascii_uppercase();
                    if NETWORK_ERROR_CODES.contains(&code.as_str()) {
                        return Some(ErrorCode::Network);
                    }
                    if TIMEOUT_ERROR_CODES.contains(&code.as_str()) {
                        return Some(ErrorCode::Timeout);
                    }
                }
                MaskError::Timeout(_) => return Some(ErrorCode::Timeout),
                MaskError::Usage(_) => return Some(ErrorCode::Usage),
                _ => {}
            }
        }
        if let Some(http_err) = cause.downcast_ref::<reqwest::Error>() {
            if http_err.is_timeout() {
                return Some(ErrorCode::Timeout);
            }
            if http_err.is_connect() {
                return Some(ErrorCode::Network);
            }
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if let Some(code) = io_code(io_err.kind()) {
                return Some(code);
            }
        }
        if cause.is::<tokio::time::error::Elapsed>() {
            return Some(ErrorCode::Timeout);
        }
    }
    None
}

fn io_code(kind: io::ErrorKind) -> Option<ErrorCode> {
    match kind {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkUnreachable => Some(ErrorCode::Network),
        io::ErrorKind::TimedOut => Some(ErrorCode::Timeout),
        _ => None,
    }
}

fn message_code(err: &anyhow::Error, message: &str) -> ErrorCode {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        return ErrorCode::Timeout;
    }
    if ["invalid", "required", "missing"]
        .iter()
        .any(|word| lower.contains(word))
    {
        return ErrorCode::Usage;
    }
    if lower.contains("request failed") {
        return ErrorCode::MaskFailed;
    }
    let remote_failure = err
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<MaskError>(), Some(MaskError::Request(_))));
    if remote_failure {
        return ErrorCode::MaskFailed;
    }
    ErrorCode::Internal
}
