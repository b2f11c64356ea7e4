use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no Slack API token given via --token, SLACK_TOKEN, or slack-backup.toml")]
    MissingToken,

    #[error("unable to authenticate API token")]
    AuthenticationFailed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("invalid message timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("user id {0} is not in the user directory")]
    UnknownUser(String),

    #[error("failed to read file at {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write file at {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialization error: {0}")]
    JsonSerialize(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_missing_token_display() {
        let err = AppError::MissingToken;
        assert!(err.to_string().contains("no Slack API token"));
    }

    #[test]
    fn test_authentication_failed_display() {
        let err = AppError::AuthenticationFailed;
        assert_eq!(err.to_string(), "unable to authenticate API token");
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: AppError = io_err.into();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_slack_api_display() {
        let err = AppError::SlackApi("rate limited".to_string());
        assert_eq!(err.to_string(), "Slack API error: rate limited");
    }

    #[test]
    fn test_invalid_timestamp_display() {
        let err = AppError::InvalidTimestamp("not-a-ts".to_string());
        assert_eq!(err.to_string(), "invalid message timestamp: not-a-ts");
    }

    #[test]
    fn test_unknown_user_display() {
        let err = AppError::UnknownUser("U99999".to_string());
        assert_eq!(err.to_string(), "user id U99999 is not in the user directory");
    }

    #[test]
    fn test_read_file_display_and_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err = AppError::ReadFile {
            path: "/path/to/file.json".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("/path/to/file.json"));
        assert!(err.to_string().contains("failed to read file"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_write_file_display_and_source() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let err = AppError::WriteFile {
            path: "/path/to/output.json".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("/path/to/output.json"));
        assert!(err.to_string().contains("failed to write file"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_json_serialize_display() {
        let err = AppError::JsonSerialize("invalid utf-8".to_string());
        assert_eq!(err.to_string(), "JSON serialization error: invalid utf-8");
    }

    #[test]
    fn test_toml_parse_display() {
        let err = AppError::TomlParse("invalid toml".to_string());
        assert_eq!(err.to_string(), "TOML parse error: invalid toml");
    }

    #[test]
    fn test_error_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AppError>();
    }

    #[test]
    fn test_error_is_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<AppError>();
    }

    #[test]
    fn test_result_type_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
    }
}
