//! UserAuthentication: users known by a unique username

use crate::fresh_id;
use async_trait::async_trait;
use concord_engine::{record, Concept, ConceptError, ConceptResult, Record, RecordExt, Value};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Users {
    /// (user id, username), in registration order
    entries: Vec<(String, String)>,
}

/// Registration by username only; credentials live elsewhere
#[derive(Debug, Default)]
pub struct UserAuthentication {
    users: RwLock<Users>,
}

impl UserAuthentication {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user registered under `username`
    pub fn user_by_username(&self, username: &str) -> Option<Value> {
        self.users
            .read()
            .entries
            .iter()
            .find(|(_, name)| name == username)
            .map(|(id, _)| Value::id(id.as_str()))
    }
}

#[async_trait]
impl Concept for UserAuthentication {
    fn name(&self) -> &str {
        "UserAuthentication"
    }

    fn actions(&self) -> &[&'static str] {
        &["register"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getUsername", "_getUserByUsername"]
    }

    async fn perform(&self, action: &str, input: &Record) -> ConceptResult<Record> {
        match action {
            "register" => {
                let username = input.require_str("username")?;
                let mut users = self.users.write();
                if users.entries.iter().any(|(_, name)| name == username) {
                    return Ok(record! { "error" => format!("username {username} is taken") });
                }
                let id = fresh_id();
                users.entries.push((id.clone(), username.to_string()));
                Ok(record! { "user" => Value::id(id) })
            }
            other => Err(ConceptError::UnknownAction(other.to_string())),
        }
    }

    async fn query(&self, query: &str, input: &Record) -> ConceptResult<Vec<Record>> {
        let users = self.users.read();
        match query {
            "_getUsername" => {
                let user = input.require_str("user")?;
                Ok(users
                    .entries
                    .iter()
                    .filter(|(id, _)| id == user)
                    .map(|(_, name)| record! { "username" => name.as_str() })
                    .collect())
            }
            "_getUserByUsername" => {
                let username = input.require_str("username")?;
                Ok(users
                    .entries
                    .iter()
                    .filter(|(_, name)| name == username)
                    .map(|(id, _)| record! { "user" => Value::id(id.as_str()) })
                    .collect())
            }
            other => Err(ConceptError::UnknownQuery(other.to_string())),
        }
    }
}
