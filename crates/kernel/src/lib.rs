//! Core of mongo-seed: settings, user specs, the admin client seam, and the
//! seeding and verification routines built on it.

pub mod admin;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod seeder;
pub mod settings;
pub mod spec;
pub mod verify;

pub use admin::{AdminClient, AdminError};
pub use seeder::{seed, SeedError, SeedReport, SeedState, Seeder};
pub use settings::{OnExisting, Settings};
pub use spec::{resolve_all, ConfigError, Password, Principal, RoleGrant, UserSpec};
pub use verify::{verify, VerifyError};

/// Serializes tests that read or write process environment variables.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
