//! In-memory [`AdminClient`] that behaves like a fresh server.
//!
//! Used by tests across the workspace to exercise seeding and verification
//! without a running database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::admin::{AdminClient, AdminError};
use crate::spec::{Principal, UserSpec};

#[derive(Default)]
struct State {
    users: HashMap<String, Principal>,
    rejections: HashMap<String, AdminError>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct MemoryAdmin {
    state: Mutex<State>,
}

impl MemoryAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `create_user` for `username` fail with `error`.
    pub fn reject(self, username: impl Into<String>, error: AdminError) -> Self {
        self.lock().rejections.insert(username.into(), error);
        self
    }

    /// Store a principal directly, bypassing `create_user`.
    pub fn insert(&self, principal: Principal) {
        self.lock()
            .users
            .insert(principal.username.clone(), principal);
    }

    /// Usernames passed to `create_user`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a test already panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AdminClient for MemoryAdmin {
    async fn create_user(&self, spec: &UserSpec) -> Result<(), AdminError> {
        let mut state = self.lock();
        state.calls.push(spec.username().to_string());

        if let Some(error) = state.rejections.get(spec.username()) {
            return Err(error.clone());
        }
        if state.users.contains_key(spec.username()) {
            return Err(AdminError::DuplicateUser {
                username: spec.username().to_string(),
            });
        }

        state.users.insert(
            spec.username().to_string(),
            Principal {
                username: spec.username().to_string(),
                roles: vec![spec.grant()],
            },
        );
        Ok(())
    }

    async fn users_info(&self, username: &str) -> Result<Option<Principal>, AdminError> {
        Ok(self.lock().users.get(username).cloned())
    }
}
