//! Scenario files: scripted registrations, logins and requests
//!
//! ```yaml
//! steps:
//!   - register: alice
//!   - login: alice
//!   - request:
//!       path: /FileUploading/requestUploadURL
//!       as: alice
//!       fields: { filename: report.pdf }
//!       save: { report: file }
//!   - request:
//!       path: /download
//!       as: alice
//!       fields: { file: $report }
//! ```

use anyhow::{bail, Context, Result};
use concord_engine::{Record, Value};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Register a user by username
    Register(String),
    /// Open a session for a registered user
    Login(String),
    Request(RequestStep),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequestStep {
    pub path: String,

    /// Username whose session becomes the `session` field
    #[serde(rename = "as", default)]
    pub as_user: Option<String>,

    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,

    /// Saved name -> field of the first response
    #[serde(default)]
    pub save: BTreeMap<String, String>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

/// Values remembered between steps
///
/// Saved values keep their concord type, so an identifier saved from one
/// response is passed on as an identifier rather than as text.
#[derive(Debug, Default)]
pub struct Memory {
    sessions: HashMap<String, Value>,
    saved: HashMap<String, Value>,
}

impl Memory {
    pub fn remember_session(&mut self, username: &str, session: Value) {
        self.sessions.insert(username.to_string(), session);
    }

    pub fn save(&mut self, name: &str, value: Value) {
        self.saved.insert(name.to_string(), value);
    }

    /// Request fields for `step`, with `$name` references substituted
    pub fn request_fields(&self, step: &RequestStep) -> Result<Record> {
        let mut fields = Record::new();
        fields.insert("path".to_string(), Value::str(step.path.as_str()));
        if let Some(username) = &step.as_user {
            let Some(session) = self.sessions.get(username) else {
                bail!("`{username}` has not logged in");
            };
            fields.insert("session".to_string(), session.clone());
        }
        for (field, value) in &step.fields {
            fields.insert(field.clone(), self.substitute(value)?);
        }
        Ok(fields)
    }

    fn substitute(&self, value: &serde_json::Value) -> Result<Value> {
        match value.as_str().and_then(|text| text.strip_prefix('$')) {
            Some(name) => match self.saved.get(name) {
                Some(saved) => Ok(saved.clone()),
                None => bail!("nothing saved under `${name}`"),
            },
            None => Ok(Value::from(value.clone())),
        }
    }
}
