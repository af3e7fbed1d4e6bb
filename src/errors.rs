use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    /// The remote completed the exchange but reported a failure.
    #[error("{0}")]
    Request(String),

    /// Low-level transport failure carrying a socket-style code such as `ECONNREFUSED`.
    #[error("{message}")]
    Transport { code: String, message: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MaskError {
    pub fn transport(code: impl Into<String>, message: impl Into<String>) -> Self {
        MaskError::Transport {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for MaskError {
    fn from(err: std::io::Error) -> Self {
        MaskError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for MaskError {
    fn from(err: serde_json::Error) -> Self {
        MaskError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_display() {
        let err = MaskError::Usage("text is required".to_string());
        assert_eq!(err.to_string(), "Usage error: text is required");
    }

    #[test]
    fn test_storage_display() {
        let err = MaskError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_config_display() {
        let err = MaskError::Config("bad json".to_string());
        assert_eq!(err.to_string(), "Config error: bad json");
    }

    #[test]
    fn test_request_display_is_bare_message() {
        let err = MaskError::Request("LLM request failed with status 500: boom".to_string());
        assert_eq!(err.to_string(), "LLM request failed with status 500: boom");
    }

    #[test]
    fn test_transport_display_uses_message() {
        let err = MaskError::transport("ECONNREFUSED", "connect refused");
        assert_eq!(err.to_string(), "connect refused");
        match err {
            MaskError::Transport { code, .. } => assert_eq!(code, "ECONNREFUSED"),
            other => panic!("Expected Transport, got: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_display() {
        let err = MaskError::Timeout("60000ms exceeded".to_string());
        assert_eq!(err.to_string(), "Timeout: 60000ms exceeded");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: MaskError = io_err.into();
        match err {
            MaskError::Storage(msg) => assert!(msg.contains("file missing")),
            other => panic!("Expected Storage, got: {:?}", other),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err: MaskError = json_err.into();
        match err {
            MaskError::Storage(_) => {}
            other => panic!("Expected Storage, got: {:?}", other),
        }
    }
}
