use std::path::PathBuf;

pub type KeeperResult<T> = std::result::Result<T, KeeperError>;

/// Failures raised at the file boundary of the keeper operations.
///
/// The parsing, reconciliation and drift functions never fail; everything here
/// comes from reading or writing `Plugins.txt` and its reference snapshot.
#[derive(Debug, thiserror::Error)]
pub enum KeeperError {
    #[error("configuration is invalid: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("plugins file not found: {}", path.display())]
    MissingLiveFile { path: PathBuf },

    #[error("reference file not found: {}", path.display())]
    MissingReferenceFile { path: PathBuf },

    #[error("{} is not valid UTF-8; re-save it as UTF-8 text", path.display())]
    InvalidEncoding { path: PathBuf },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KeeperError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Short label used by the CLI's JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            KeeperError::InvalidConfiguration { .. } => "invalid_configuration",
            KeeperError::MissingLiveFile { .. } => "missing_live_file",
            KeeperError::MissingReferenceFile { .. } => "missing_reference_file",
            KeeperError::InvalidEncoding { .. } => "invalid_encoding",
            KeeperError::Io { .. } => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = KeeperError::MissingReferenceFile {
            path: PathBuf::from("/tmp/Plugins.reference.txt"),
        };
        assert_eq!(
            err.to_string(),
            "reference file not found: /tmp/Plugins.reference.txt"
        );
        assert_eq!(err.kind(), "missing_reference_file");
    }

    #[test]
    fn io_errors_keep_their_source() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = KeeperError::io("write", "/tmp/Plugins.txt", source);
        assert_eq!(err.to_string(), "write /tmp/Plugins.txt: denied");
        assert!(std::error::Error::source(&err).is_some());
    }
}
