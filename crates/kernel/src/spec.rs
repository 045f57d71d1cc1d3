//! User specifications and the configuration errors raised while building them.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::UserEntry;

/// Errors raised while turning configuration into [`UserSpec`]s.
///
/// All of these are detected before the admin database is contacted.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("no password configured for user '{username}'")]
    MissingPassword { username: String },

    #[error("password variable '{var}' for user '{username}' is not set")]
    PasswordEnv { username: String, var: String },

    #[error("failed to read password file {} for user '{username}'", .path.display())]
    PasswordFile {
        username: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("username '{0}' is listed more than once")]
    DuplicateUsername(String),
}

/// Secret string whose `Debug` output never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the plaintext. Only the admin client should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// One principal to create: a username/password pair holding a single role
/// scoped to a single database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    username: String,
    password: Password,
    role: String,
    database: String,
}

impl UserSpec {
    /// Build a spec, rejecting empty or whitespace-only fields.
    pub fn new(
        username: impl Into<String>,
        password: Password,
        role: impl Into<String>,
        database: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let spec = Self {
            username: username.into(),
            password,
            role: role.into(),
            database: database.into(),
        };

        for (field, value) in [
            ("username", spec.username.as_str()),
            ("password", spec.password.expose()),
            ("role", spec.role.as_str()),
            ("database", spec.database.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField { field });
            }
        }

        Ok(spec)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// The role grant this spec asks the server for.
    pub fn grant(&self) -> RoleGrant {
        RoleGrant {
            role: self.role.clone(),
            db: self.database.clone(),
        }
    }
}

/// A role scoped to a database, in the shape the server uses on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl fmt::Display for RoleGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.db)
    }
}

/// An existing principal as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub roles: Vec<RoleGrant>,
}

impl UserEntry {
    /// Resolve the password source and validate the entry.
    ///
    /// Sources are tried in order: `password_file`, `password_env`, then the
    /// inline `password`.
    pub fn resolve(&self) -> Result<UserSpec, ConfigError> {
        let password = if let Some(path) = &self.password_file {
            let raw = std::fs::read_to_string(path).map_err(|source| {
                ConfigError::PasswordFile {
                    username: self.username.clone(),
                    path: path.clone(),
                    source,
                }
            })?;
            raw.trim_end_matches(['\r', '\n']).to_string()
        } else if let Some(var) = &self.password_env {
            std::env::var(var).map_err(|_| ConfigError::PasswordEnv {
                username: self.username.clone(),
                var: var.clone(),
            })?
        } else if let Some(inline) = &self.password {
            inline.clone()
        } else {
            return Err(ConfigError::MissingPassword {
                username: self.username.clone(),
            });
        };

        UserSpec::new(
            self.username.clone(),
            Password::new(password),
            self.role.clone(),
            self.database.clone(),
        )
    }
}

/// Resolve every entry, keeping order and rejecting repeated usernames.
pub fn resolve_all(entries: &[UserEntry]) -> Result<Vec<UserSpec>, ConfigError> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(entries.len());

    for entry in entries {
        let spec = entry.resolve()?;
        if !seen.insert(spec.username().to_string()) {
            return Err(ConfigError::DuplicateUsername(spec.username().to_string()));
        }
        specs.push(spec);
    }

    Ok(specs)
}
