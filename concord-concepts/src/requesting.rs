//! Requesting: the boundary where outside requests enter and responses leave

use crate::fresh_id;
use async_trait::async_trait;
use concord_engine::{record, Concept, ConceptError, ConceptResult, Record, RecordExt, Value};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Requests {
    inputs: HashMap<String, Record>,
    responses: HashMap<String, Vec<Record>>,
}

/// Records requests and the responses sync rules produce for them
///
/// `request` accepts any fields (a `path` plus its parameters) and hands out
/// a fresh request id. `respond` attaches a response to a known request.
#[derive(Debug, Default)]
pub struct Requesting {
    state: RwLock<Requests>,
}

impl Requesting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Responses recorded for `request`, oldest first
    pub fn responses(&self, request: &Value) -> Vec<Record> {
        let Some(id) = request.as_id() else {
            return Vec::new();
        };
        self.state.read().responses.get(id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Concept for Requesting {
    fn name(&self) -> &str {
        "Requesting"
    }

    fn actions(&self) -> &[&'static str] {
        &["request", "respond"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getRequest"]
    }

    async fn perform(&self, action: &str, input: &Record) -> ConceptResult<Record> {
        match action {
            "request" => {
                let id = fresh_id();
                self.state.write().inputs.insert(id.clone(), input.clone());
                Ok(record! { "request" => Value::id(id) })
            }
            "respond" => {
                let id = input.require_str("request")?;
                let mut state = self.state.write();
                if !state.inputs.contains_key(id) {
                    return Ok(record! { "error" => format!("unknown request {id}") });
                }
                let mut response = input.clone();
                response.remove("request");
                state.responses.entry(id.to_string()).or_default().push(response);
                Ok(record! { "request" => Value::id(id) })
            }
            other => Err(ConceptError::UnknownAction(other.to_string())),
        }
    }

    async fn query(&self, query: &str, input: &Record) -> ConceptResult<Vec<Record>> {
        match query {
            "_getRequest" => {
                let id = input.require_str("request")?;
                Ok(self.state.read().inputs.get(id).cloned().into_iter().collect())
            }
            other => Err(ConceptError::UnknownQuery(other.to_string())),
        }
    }
}
