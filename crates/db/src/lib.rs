//! MongoDB implementation of the seeder's admin client.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, Document},
    error::{Error as MongoError, ErrorKind},
    options::ClientOptions,
    Client, Database,
};
use serde::Deserialize;

use seed_kernel::settings::MongoSettings;
use seed_kernel::{AdminClient, AdminError, Principal, RoleGrant, UserSpec};

/// `Location51003` on current servers, `DuplicateKey` on older ones.
const DUPLICATE_USER_CODES: &[i32] = &[51003, 11000];

/// An authenticated session on the server's admin database.
pub struct MongoAdmin {
    client: Client,
    admin: Database,
}

impl MongoAdmin {
    /// Connect and ping the admin database so that network and auth failures
    /// surface here, before any user is created.
    pub async fn connect(settings: &MongoSettings) -> Result<Self, AdminError> {
        let mut options = ClientOptions::parse(settings.uri.as_str())
            .await
            .map_err(|err| AdminError::Unreachable(err.to_string()))?;
        options.app_name = Some(settings.app_name.clone());
        options.connect_timeout = Some(Duration::from_millis(settings.connect_timeout_ms));
        options.server_selection_timeout =
            Some(Duration::from_millis(settings.server_selection_timeout_ms));

        let client =
            Client::with_options(options).map_err(|err| AdminError::Unreachable(err.to_string()))?;
        let admin = client.database(&settings.admin_database);

        admin
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|err| AdminError::Unreachable(err.to_string()))?;

        tracing::info!(
            target: "seed-db",
            database = %settings.admin_database,
            "connected to admin database"
        );

        Ok(Self { client, admin })
    }

    /// Close the client's connection pool.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

#[async_trait]
impl AdminClient for MongoAdmin {
    async fn create_user(&self, spec: &UserSpec) -> Result<(), AdminError> {
        self.admin
            .run_command(create_user_command(spec))
            .await
            .map(|_| ())
            .map_err(|err| classify(err, spec.username()))
    }

    async fn users_info(&self, username: &str) -> Result<Option<Principal>, AdminError> {
        let reply = self
            .admin
            .run_command(doc! { "usersInfo": username })
            .await
            .map_err(|err| classify(err, username))?;

        parse_users_info(reply, username)
    }
}

fn create_user_command(spec: &UserSpec) -> Document {
    doc! {
        "createUser": spec.username(),
        "pwd": spec.password().expose(),
        "roles": [
            { "role": spec.role(), "db": spec.database() }
        ],
    }
}

#[derive(Debug, Deserialize)]
struct UsersInfoReply {
    #[serde(default)]
    users: Vec<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: String,
    #[serde(default)]
    roles: Vec<RoleGrant>,
}

fn parse_users_info(reply: Document, username: &str) -> Result<Option<Principal>, AdminError> {
    let reply: UsersInfoReply =
        mongodb::bson::from_document(reply).map_err(|err| AdminError::Rejected {
            code: 0,
            code_name: "MalformedReply".to_string(),
            message: err.to_string(),
        })?;

    Ok(reply
        .users
        .into_iter()
        .find(|info| info.user == username)
        .map(|info| Principal {
            username: info.user,
            roles: info.roles,
        }))
}

fn classify(err: MongoError, username: &str) -> AdminError {
    match err.kind.as_ref() {
        ErrorKind::Command(command) if DUPLICATE_USER_CODES.contains(&command.code) => {
            AdminError::DuplicateUser {
                username: username.to_string(),
            }
        }
        ErrorKind::Command(command) => AdminError::Rejected {
            code: command.code,
            code_name: command.code_name.clone(),
            message: command.message.clone(),
        },
        ErrorKind::Authentication { .. }
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Io(_) => AdminError::Unreachable(err.to_string()),
        _ => AdminError::Rejected {
            code: 0,
            code_name: "ClientError".to_string(),
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::Bson;
    use mongodb::error::CommandError;
    use seed_kernel::Password;

    fn command_error(code: i32, code_name: &str, errmsg: &str) -> MongoError {
        let command: CommandError = mongodb::bson::from_document(doc! {
            "code": code,
            "codeName": code_name,
            "errmsg": errmsg,
        })
        .unwrap();
        MongoError::from(ErrorKind::Command(command))
    }

    #[test]
    fn create_user_command_scopes_single_role() {
        let spec = UserSpec::new(
            "location-management-service",
            Password::new("pw"),
            "readWrite",
            "location-management-db",
        )
        .unwrap();

        let command = create_user_command(&spec);

        assert_eq!(
            command,
            doc! {
                "createUser": "location-management-service",
                "pwd": "pw",
                "roles": [{ "role": "readWrite", "db": "location-management-db" }],
            }
        );
        // The command name must come first.
        assert_eq!(command.keys().next().map(String::as_str), Some("createUser"));
    }

    #[test]
    fn parses_users_info_reply() {
        let reply = doc! {
            "users": [{
                "_id": "admin.svcA",
                "userId": Bson::Null,
                "user": "svcA",
                "db": "admin",
                "roles": [{ "role": "readWrite", "db": "dbA" }],
                "mechanisms": ["SCRAM-SHA-1", "SCRAM-SHA-256"],
            }],
            "ok": 1.0,
        };

        let principal = parse_users_info(reply, "svcA").unwrap().unwrap();
        assert_eq!(principal.username, "svcA");
        assert_eq!(
            principal.roles,
            vec![RoleGrant {
                role: "readWrite".to_string(),
                db: "dbA".to_string()
            }]
        );
    }

    #[test]
    fn empty_users_info_means_missing() {
        let reply = doc! { "users": [], "ok": 1.0 };
        assert_eq!(parse_users_info(reply, "svcA").unwrap(), None);
    }

    #[test]
    fn duplicate_user_codes_map_to_duplicate_user() {
        let current = command_error(51003, "Location51003", "User \"svcA@admin\" already exists");
        assert_eq!(
            classify(current, "svcA"),
            AdminError::DuplicateUser {
                username: "svcA".to_string()
            }
        );

        let legacy = command_error(11000, "DuplicateKey", "E11000 duplicate key error");
        assert_eq!(
            classify(legacy, "svcB"),
            AdminError::DuplicateUser {
                username: "svcB".to_string()
            }
        );
    }

    #[test]
    fn other_command_failures_are_rejections() {
        let err = command_error(31, "RoleNotFound", "Could not find role: readWrite@dbA");
        assert_eq!(
            classify(err, "svcA"),
            AdminError::Rejected {
                code: 31,
                code_name: "RoleNotFound".to_string(),
                message: "Could not find role: readWrite@dbA".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn server_selection_failure_is_unreachable() {
        let mut options = ClientOptions::parse("mongodb://127.0.0.1:1/?directConnection=true")
            .await
            .unwrap();
        options.connect_timeout = Some(Duration::from_millis(200));
        options.server_selection_timeout = Some(Duration::from_millis(300));
        let client = Client::with_options(options).unwrap();

        let err = client
            .database("admin")
            .run_command(create_user_command(
                &UserSpec::new("svcA", Password::new("pA"), "readWrite", "dbA").unwrap(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err.kind.as_ref(), ErrorKind::ServerSelection { .. }));
        assert!(matches!(classify(err, "svcA"), AdminError::Unreachable(_)));
    }

    #[tokio::test]
    async fn unreachable_server_fails_on_connect() {
        let settings = MongoSettings {
            uri: "mongodb://127.0.0.1:1/?directConnection=true".to_string(),
            connect_timeout_ms: 200,
            server_selection_timeout_ms: 300,
            ..MongoSettings::default()
        };

        let err = MongoAdmin::connect(&settings).await.err().unwrap();
        assert!(matches!(err, AdminError::Unreachable(_)));
    }
}
