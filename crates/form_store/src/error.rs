use contracts::shared::field_path::{FieldPath, PathError};
use contracts::shared::json_tree::AssignError;
use contracts::shared::metadata::ValidationErrors;
use thiserror::Error;

use crate::transport::TransportError;

fn join_paths(paths: &[FieldPath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ошибки хранилища формы
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid path: {0}")]
    Path(#[from] PathError),

    #[error("Path '{0}' does not exist in the record")]
    UnknownPath(FieldPath),

    #[error("Path '{path}' is not assignable: {source}")]
    Unassignable {
        path: FieldPath,
        #[source]
        source: AssignError,
    },

    #[error("'{0}' is not an array")]
    NotAnArray(FieldPath),

    #[error("Record root must be an object")]
    NotAnObject,

    #[error("Cannot read '{path}' as the requested type: {message}")]
    Decode { path: FieldPath, message: String },

    #[error("Unknown form section '{0}'")]
    UnknownSection(String),

    #[error("No form section is active")]
    NoActiveSection,

    #[error("{} path(s) failed validation", .0.len())]
    Validation(ValidationErrors),

    #[error("A save is already in flight")]
    SaveInFlight,

    #[error("Save ticket {0} is not the save in flight")]
    StaleTicket(u64),

    #[error("Record has no identity to address")]
    MissingIdentity,

    #[error("Cannot build save payload: {0}")]
    Payload(#[from] AssignError),

    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Server rejected the request with status {status}")]
    Rejected { status: u16, errors: ValidationErrors },

    #[error("Server response is missing saved paths: {}", join_paths(.missing))]
    Shape { missing: Vec<FieldPath> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_message_lists_paths() {
        let error = StoreError::Shape {
            missing: vec![
                FieldPath::parse("sectors").unwrap(),
                FieldPath::parse("locations[0].name").unwrap(),
            ],
        };
        assert_eq!(
            error.to_string(),
            "Server response is missing saved paths: sectors, locations[0].name"
        );
    }
}
