use thiserror::Error;

use crate::admin::{AdminClient, AdminError};
use crate::spec::{RoleGrant, UserSpec};

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("user '{username}' does not exist")]
    Missing { username: String },

    #[error("user '{username}' should hold only {expected} but holds {}", render(.actual))]
    RoleMismatch {
        username: String,
        expected: RoleGrant,
        actual: Vec<RoleGrant>,
    },

    #[error(transparent)]
    Admin(#[from] AdminError),
}

fn render(grants: &[RoleGrant]) -> String {
    if grants.is_empty() {
        return "no roles".to_string();
    }
    grants
        .iter()
        .map(RoleGrant::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check that every spec exists on the server holding exactly its one
/// scoped role. Stops at the first mismatch.
pub async fn verify<C: AdminClient + ?Sized>(
    admin: &C,
    specs: &[UserSpec],
) -> Result<(), VerifyError> {
    for spec in specs {
        let principal = admin
            .users_info(spec.username())
            .await?
            .ok_or_else(|| VerifyError::Missing {
                username: spec.username().to_string(),
            })?;

        let expected = spec.grant();
        if principal.roles != [expected.clone()] {
            return Err(VerifyError::RoleMismatch {
                username: spec.username().to_string(),
                expected,
                actual: principal.roles,
            });
        }

        tracing::info!(username = spec.username(), grant = %expected, "user verified");
    }

    Ok(())
}
