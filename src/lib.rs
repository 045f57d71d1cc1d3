//! mongo-seed application library.
//!
//! Resolves the configured service accounts and provisions them on the
//! server's admin database.

pub mod accounts;

use anyhow::Context;
use seed_db::MongoAdmin;
use seed_kernel::{
    resolve_all, verify, AdminClient, ConfigError, SeedError, SeedReport, Seeder, Settings,
    UserSpec,
};

/// Users to provision: the configured list, or the built-in service
/// accounts when none are configured.
pub fn user_specs(settings: &Settings) -> Result<Vec<UserSpec>, ConfigError> {
    if settings.seed.users.is_empty() {
        tracing::info!("no users configured, using built-in service accounts");
        resolve_all(&accounts::service_accounts())
    } else {
        resolve_all(&settings.seed.users)
    }
}

/// Seed `specs` through an already connected admin client, honoring the
/// configured existing-user policy.
pub async fn seed_users<C: AdminClient + ?Sized>(
    admin: &C,
    specs: &[UserSpec],
    settings: &Settings,
) -> Result<SeedReport, SeedError> {
    Seeder::new(admin)
        .on_existing(settings.seed.on_existing)
        .seed(specs)
        .await
}

/// Resolve users, connect, and create them. Configuration errors are raised
/// before the server is contacted.
pub async fn run_seed(settings: &Settings) -> anyhow::Result<SeedReport> {
    let specs = user_specs(settings).context("invalid user configuration")?;

    let admin = MongoAdmin::connect(&settings.mongo)
        .await
        .map_err(SeedError::Connection)?;

    let result = seed_users(&admin, &specs, settings).await;
    admin.shutdown().await;

    Ok(result?)
}

/// Resolve users, connect, and check each one holds exactly its scoped role.
pub async fn run_verify(settings: &Settings) -> anyhow::Result<()> {
    let specs = user_specs(settings).context("invalid user configuration")?;

    let admin = MongoAdmin::connect(&settings.mongo)
        .await
        .map_err(SeedError::Connection)?;

    let result = verify(&admin, &specs).await;
    admin.shutdown().await;

    result.context("verification failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_kernel::memory::MemoryAdmin;
    use seed_kernel::settings::{OnExisting, UserEntry};

    fn entry(username: &str, database: &str) -> UserEntry {
        UserEntry {
            username: username.to_string(),
            database: database.to_string(),
            role: UserEntry::default_role(),
            password: Some(format!("{username}-pw")),
            password_env: None,
            password_file: None,
        }
    }

    /// Serializes tests that read or write process environment variables.
    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn scenario_settings() -> Settings {
        let mut settings = Settings::default();
        settings.seed.users = vec![entry("svcA", "dbA"), entry("svcB", "dbB")];
        settings
    }

    #[test]
    fn configured_users_replace_built_in_accounts() {
        let _env = env_lock();
        let specs = user_specs(&scenario_settings()).unwrap();
        let names: Vec<_> = specs.iter().map(UserSpec::username).collect();
        assert_eq!(names, ["svcA", "svcB"]);
    }

    #[test]
    fn built_in_accounts_read_passwords_from_env() {
        let _env = env_lock();
        std::env::set_var(accounts::LOCATION_MANAGEMENT_PASSWORD_ENV, "lm-pw");
        std::env::set_var(accounts::LOCATION_HISTORY_MANAGEMENT_PASSWORD_ENV, "lhm-pw");

        let specs = user_specs(&Settings::default());
        std::env::remove_var(accounts::LOCATION_MANAGEMENT_PASSWORD_ENV);
        std::env::remove_var(accounts::LOCATION_HISTORY_MANAGEMENT_PASSWORD_ENV);
        let specs = specs.unwrap();

        assert_eq!(specs[0].username(), "location-management-service");
        assert_eq!(specs[0].database(), "location-management-db");
        assert_eq!(specs[0].password().expose(), "lm-pw");
        assert_eq!(specs[1].username(), "location-history-management-service");
        assert_eq!(specs[1].password().expose(), "lhm-pw");
    }

    #[tokio::test]
    async fn seeding_twice_fails_unless_skipping() {
        let admin = MemoryAdmin::new();
        let mut settings = scenario_settings();
        let specs = user_specs(&settings).unwrap();

        let first = seed_users(&admin, &specs, &settings).await.unwrap();
        assert_eq!(first.created, ["svcA", "svcB"]);

        let err = seed_users(&admin, &specs, &settings).await.unwrap_err();
        assert!(matches!(err, SeedError::UserCreation { index: 0, .. }));

        settings.seed.on_existing = OnExisting::Skip;
        let rerun = seed_users(&admin, &specs, &settings).await.unwrap();
        assert!(rerun.created.is_empty());
        assert_eq!(rerun.skipped, ["svcA", "svcB"]);

        verify(&admin, &specs).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_configuration_fails_before_connecting() {
        let mut settings = Settings::default();
        settings.mongo.uri = "mongodb://127.0.0.1:1".to_string();
        let mut missing = entry("svcA", "dbA");
        missing.password = None;
        settings.seed.users = vec![missing];

        let err = run_seed(&settings).await.unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
