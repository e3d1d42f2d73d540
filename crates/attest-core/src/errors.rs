use std::fmt::Display;

pub type Result<T> = std::result::Result<T, AttestError>;

/// Failures surfaced by core operations.
///
/// Validation (`InvalidInput`) and lookup (`NotFound`) failures are raised
/// before anything is written. `StorageFailure` wraps the underlying SQLite or
/// filesystem error together with the operation that was being attempted.
#[derive(Debug, thiserror::Error)]
pub enum AttestError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure during {op}: {source}")]
    StorageFailure {
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl AttestError {
    pub fn not_found(kind: &'static str, id: impl Display) -> Self {
        AttestError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AttestError::InvalidInput(msg.into())
    }

    pub fn storage(op: &'static str, msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        AttestError::StorageFailure {
            op,
            source: msg.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AttestError::NotFound { .. })
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, AttestError::InvalidInput(_))
    }

    pub fn is_storage_failure(&self) -> bool {
        matches!(self, AttestError::StorageFailure { .. })
    }
}

/// Attaches the failing operation to a lower-level storage error.
pub trait StorageContext<T> {
    fn storage(self, op: &'static str) -> Result<T>;
}

impl<T, E> StorageContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn storage(self, op: &'static str) -> Result<T> {
        self.map_err(|e| AttestError::StorageFailure {
            op,
            source: Box::new(e),
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_context_keeps_operation_and_source() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only volume",
        ));
        let err = io.storage("write evidence blob").unwrap_err();
        assert!(err.is_storage_failure());
        let msg = err.to_string();
        assert!(msg.contains("write evidence blob"));
        assert!(msg.contains("read-only volume"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = AttestError::not_found("control", "A.9.9");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "control not found: A.9.9");
    }
}
