//! Sessioning: sessions mapped to the user they belong to

use crate::fresh_id;
use async_trait::async_trait;
use concord_engine::{record, Concept, ConceptError, ConceptResult, Record, RecordExt, Value};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Sessioning {
    sessions: RwLock<HashMap<String, Value>>,
}

impl Sessioning {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Concept for Sessioning {
    fn name(&self) -> &str {
        "Sessioning"
    }

    fn actions(&self) -> &[&'static str] {
        &["create", "delete"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getUser"]
    }

    async fn perform(&self, action: &str, input: &Record) -> ConceptResult<Record> {
        match action {
            "create" => {
                let user = input.require("user")?.clone();
                let id = fresh_id();
                self.sessions.write().insert(id.clone(), user);
                Ok(record! { "session" => Value::id(id) })
            }
            "delete" => {
                let id = input.require_str("session")?;
                Ok(match self.sessions.write().remove(id) {
                    Some(_) => record! { "session" => Value::id(id) },
                    None => record! { "error" => format!("no session {id}") },
                })
            }
            other => Err(ConceptError::UnknownAction(other.to_string())),
        }
    }

    async fn query(&self, query: &str, input: &Record) -> ConceptResult<Vec<Record>> {
        match query {
            "_getUser" => {
                // An unknown or non-identifier session simply has no user
                let Some(id) = input.require("session")?.as_str() else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .sessions
                    .read()
                    .get(id)
                    .map(|user| record! { "user" => user.clone() })
                    .into_iter()
                    .collect())
            }
            other => Err(ConceptError::UnknownQuery(other.to_string())),
        }
    }
}
