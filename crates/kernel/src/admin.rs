use async_trait::async_trait;
use thiserror::Error;

use crate::spec::{Principal, UserSpec};

/// Failures reported by an administrative session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// The server could not be reached, selected, or authenticated against.
    #[error("admin database unreachable: {0}")]
    Unreachable(String),

    #[error("user '{username}' already exists")]
    DuplicateUser { username: String },

    /// Any other command failure reported by the server.
    #[error("server rejected command ({code_name}, code {code}): {message}")]
    Rejected {
        code: i32,
        code_name: String,
        message: String,
    },
}

/// Administrative operations the seeder needs from a database server.
///
/// Implementations hold an already-established session on the admin
/// database; connecting is their constructor's job.
#[async_trait]
pub trait AdminClient: Sync + Send {
    /// Create `spec.username()` with a single role scoped to `spec.database()`.
    async fn create_user(&self, spec: &UserSpec) -> Result<(), AdminError>;

    /// Look up an existing principal, returning `None` when it does not exist.
    async fn users_info(&self, username: &str) -> Result<Option<Principal>, AdminError>;
}
