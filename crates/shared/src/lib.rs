//! Track My Health Shared Utilities
//!
//! This crate provides common functionality for all Track My Health crates:
//! - Role-based access control against an explicit session
//! - Error taxonomy
//! - Credential hashing
//! - Entity id generation
//! - Pagination and CSV export helpers
//! - Store handle with schema migration and provisioning seed

pub mod db;

// Re-export commonly used items
pub use access::*;
pub use auth::*;
pub use export::*;
pub use ids::*;
pub use types::*;

/// Access control module - role checks against an explicit session
pub mod access {
    use serde::{Deserialize, Serialize};

    use crate::types::HealthError;

    /// Role types for role-based access control
    #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub enum Role {
        Patient,
        Hospital,
        Admin,
    }

    impl Role {
        /// Stable string form used in the `users.role` column.
        pub fn as_str(&self) -> &'static str {
            match self {
                Role::Patient => "patient",
                Role::Hospital => "hospital",
                Role::Admin => "admin",
            }
        }

        pub fn parse(s: &str) -> Result<Self, HealthError> {
            match s {
                "patient" => Ok(Role::Patient),
                "hospital" => Ok(Role::Hospital),
                "admin" => Ok(Role::Admin),
                other => Err(HealthError::Validation(format!("unknown role: {other}"))),
            }
        }
    }

    impl std::fmt::Display for Role {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// An authenticated caller.
    ///
    /// Returned by `authenticate` and passed explicitly into every
    /// role-gated operation; there is no ambient logged-in state.
    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    pub struct Session {
        /// Identity id of the logged-in account
        pub identity_id: String,
        /// Role fixed at registration
        pub role: Role,
        /// Name shown by dashboards
        pub display_name: String,
    }

    /// Check that the session carries the required role.
    pub fn require_role(session: &Session, role: Role) -> Result<(), HealthError> {
        if session.role == role {
            Ok(())
        } else {
            Err(HealthError::Unauthorized(format!("{role} role required")))
        }
    }

    /// Admin gate for destructive and bulk operations.
    pub fn require_admin(session: &Session) -> Result<(), HealthError> {
        require_role(session, Role::Admin)
    }
}

/// Common types module - error taxonomy and pagination
pub mod types {
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    /// Standard error types for consistent error handling.
    ///
    /// Every variant is recoverable by the caller; none is fatal to the
    /// process.
    #[derive(Debug, Error)]
    pub enum HealthError {
        #[error("username already registered: {0}")]
        DuplicateUsername(String),
        #[error("invalid credentials")]
        InvalidCredentials,
        #[error("{entity} not found: {id}")]
        NotFound { entity: &'static str, id: String },
        #[error("invalid status transition: {from} -> {to}")]
        InvalidTransition { from: String, to: String },
        #[error("validation error: {0}")]
        Validation(String),
        #[error("unauthorized: {0}")]
        Unauthorized(String),
        #[error(transparent)]
        Database(#[from] rusqlite::Error),
        #[error("io error: {0}")]
        Io(#[from] std::io::Error),
    }

    pub type HealthResult<T> = Result<T, HealthError>;

    /// Input for paginated queries
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaginationInput {
        pub offset: usize,
        pub limit: usize,
    }

    impl PaginationInput {
        pub const MAX_LIMIT: usize = 100;

        pub fn validate(&self) -> HealthResult<()> {
            if self.limit == 0 {
                return Err(HealthError::Validation(
                    "limit must be greater than 0".to_string(),
                ));
            }
            if self.limit > Self::MAX_LIMIT {
                return Err(HealthError::Validation(format!(
                    "limit cannot exceed {}",
                    Self::MAX_LIMIT
                )));
            }
            Ok(())
        }
    }

    impl Default for PaginationInput {
        fn default() -> Self {
            Self {
                offset: 0,
                limit: 50,
            }
        }
    }

    /// Result wrapper for paginated queries
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaginatedResult<T> {
        pub items: Vec<T>,
        pub total: usize,
        pub offset: usize,
        pub limit: usize,
        pub has_more: bool,
    }

    impl<T> PaginatedResult<T> {
        pub fn new(items: Vec<T>, total: usize, pagination: &PaginationInput) -> Self {
            Self {
                has_more: pagination.offset + items.len() < total,
                items,
                total,
                offset: pagination.offset,
                limit: pagination.limit,
            }
        }
    }
}

/// Credential hashing module
///
/// The store keeps the hex-encoded SHA-256 digest of each password, the
/// format already present in persisted data.
pub mod auth {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    use sha2::{Digest, Sha256};

    /// Length of passwords produced by admin resets.
    pub const GENERATED_PASSWORD_LEN: usize = 12;

    /// Hex-encoded SHA-256 digest of a password.
    pub fn hash_password(password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }

    /// Compare a candidate password against a stored hash.
    pub fn verify_password(password: &str, stored_hash: &str) -> bool {
        hash_password(password) == stored_hash
    }

    /// Random alphanumeric password for admin resets.
    pub fn generate_password() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_PASSWORD_LEN)
            .map(char::from)
            .collect()
    }
}

/// Entity id module
pub mod ids {
    use uuid::Uuid;

    /// Short prefixed entity id, e.g. `APT_1a2b3c`.
    pub fn new_entity_id(prefix: &str) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("{}_{}", prefix, &hex[..6])
    }
}

/// CSV export module - flattens listing projections into flat tables
pub mod export {
    /// A listing row that can be flattened into a CSV table.
    pub trait CsvExport {
        /// Fixed column header for this row type.
        fn csv_header() -> &'static [&'static str];
        /// One table row, in header order.
        fn csv_row(&self) -> Vec<String>;
    }

    /// Serialize a listing to CSV, header line first.
    pub fn to_csv<T: CsvExport>(rows: &[T]) -> String {
        let mut out = String::new();
        push_line(&mut out, T::csv_header().iter().map(|c| c.to_string()));
        for row in rows {
            push_line(&mut out, row.csv_row().into_iter());
        }
        out
    }

    fn push_line(out: &mut String, fields: impl Iterator<Item = String>) {
        let line = fields.map(|f| escape(&f)).collect::<Vec<_>>().join(",");
        out.push_str(&line);
        out.push('\n');
    }

    /// Quote a field containing separators, quotes, or line breaks.
    fn escape(field: &str) -> String {
        if field.contains(&[',', '"', '\n', '\r'][..]) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}
