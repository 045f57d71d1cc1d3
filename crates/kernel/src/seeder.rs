use thiserror::Error;

use crate::admin::{AdminClient, AdminError};
use crate::settings::OnExisting;
use crate::spec::UserSpec;

/// Why a seeding run stopped.
#[derive(Error, Debug)]
pub enum SeedError {
    /// The admin database could not be reached before any user was created.
    #[error("failed to connect to admin database")]
    Connection(#[source] AdminError),

    /// The server refused to create the user at `index`. Users before it
    /// remain created.
    #[error("failed to create user '{username}' (index {index})")]
    UserCreation {
        index: usize,
        username: String,
        #[source]
        source: AdminError,
    },
}

/// Progress of a [`Seeder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedState {
    #[default]
    NotRun,
    Done,
    Aborted {
        at_index: usize,
    },
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

/// Creates users one at a time against an admin session, stopping at the
/// first failure. Nothing is rolled back.
pub struct Seeder<'a, C: AdminClient + ?Sized> {
    admin: &'a C,
    on_existing: OnExisting,
    state: SeedState,
}

impl<'a, C: AdminClient + ?Sized> Seeder<'a, C> {
    pub fn new(admin: &'a C) -> Self {
        Self {
            admin,
            on_existing: OnExisting::default(),
            state: SeedState::NotRun,
        }
    }

    pub fn on_existing(mut self, policy: OnExisting) -> Self {
        self.on_existing = policy;
        self
    }

    pub fn state(&self) -> SeedState {
        self.state
    }

    /// Issue one create-user command per spec, in order.
    pub async fn seed(&mut self, specs: &[UserSpec]) -> Result<SeedReport, SeedError> {
        tracing::info!(
            users = specs.len(),
            on_existing = ?self.on_existing,
            "seeding users"
        );

        let mut report = SeedReport::default();

        for (index, spec) in specs.iter().enumerate() {
            tracing::info!(
                username = spec.username(),
                database = spec.database(),
                role = spec.role(),
                "creating user"
            );

            match self.admin.create_user(spec).await {
                Ok(()) => report.created.push(spec.username().to_string()),
                Err(AdminError::DuplicateUser { .. }) if self.on_existing == OnExisting::Skip => {
                    tracing::warn!(username = spec.username(), "user already exists, skipping");
                    report.skipped.push(spec.username().to_string());
                }
                Err(source) => {
                    tracing::error!(
                        username = spec.username(),
                        index,
                        error = %source,
                        "user creation failed, aborting"
                    );
                    self.state = SeedState::Aborted { at_index: index };
                    return Err(SeedError::UserCreation {
                        index,
                        username: spec.username().to_string(),
                        source,
                    });
                }
            }
        }

        self.state = SeedState::Done;
        tracing::info!(
            created = report.created.len(),
            skipped = report.skipped.len(),
            "seeding complete"
        );

        Ok(report)
    }
}

/// Seed `specs` with the default policy: the first error aborts the run.
pub async fn seed<C: AdminClient + ?Sized>(
    admin: &C,
    specs: &[UserSpec],
) -> Result<SeedReport, SeedError> {
    Seeder::new(admin).seed(specs).await
}
