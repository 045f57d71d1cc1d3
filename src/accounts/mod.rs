//! Service accounts of the location-tracking deployment.
//!
//! Used when configuration lists no users. Passwords are never embedded; each
//! account reads its password from an environment variable.

use seed_kernel::settings::UserEntry;

pub const LOCATION_MANAGEMENT_PASSWORD_ENV: &str = "LOCATION_MANAGEMENT_SERVICE_PASSWORD";
pub const LOCATION_HISTORY_MANAGEMENT_PASSWORD_ENV: &str =
    "LOCATION_HISTORY_MANAGEMENT_SERVICE_PASSWORD";

/// Each service gets `readWrite` on its own database and nothing else.
pub fn service_accounts() -> Vec<UserEntry> {
    vec![
        account(
            "location-management-service",
            "location-management-db",
            LOCATION_MANAGEMENT_PASSWORD_ENV,
        ),
        account(
            "location-history-management-service",
            "location-history-management-db",
            LOCATION_HISTORY_MANAGEMENT_PASSWORD_ENV,
        ),
    ]
}

fn account(username: &str, database: &str, password_env: &str) -> UserEntry {
    UserEntry {
        username: username.to_string(),
        database: database.to_string(),
        role: UserEntry::default_role(),
        password: None,
        password_env: Some(password_env.to_string()),
        password_file: None,
    }
}
