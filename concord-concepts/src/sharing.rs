//! Sharing: which users may access which files

use async_trait::async_trait;
use concord_engine::{record, Concept, ConceptError, ConceptResult, Record, RecordExt, Value};
use parking_lot::RwLock;

/// Grants of file access to users
///
/// Sharing and revoking are idempotent: sharing twice keeps one grant and
/// revoking an absent grant leaves nothing to remove. Files and users are
/// keyed by their text, as `FileUploading` keys files, and always reported
/// back as identifiers.
#[derive(Debug, Default)]
pub struct Sharing {
    /// (file, user) grants in the order they were made
    grants: RwLock<Vec<(String, String)>>,
}

impl Sharing {
    pub fn new() -> Self {
        Self::default()
    }

    fn grant_of(input: &Record) -> ConceptResult<(String, String)> {
        Ok((
            input.require_str("file")?.to_string(),
            input.require_str("user")?.to_string(),
        ))
    }
}

#[async_trait]
impl Concept for Sharing {
    fn name(&self) -> &str {
        "Sharing"
    }

    fn actions(&self) -> &[&'static str] {
        &["shareWithUser", "revokeAccess"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getFilesSharedWithUser", "_isSharedWith"]
    }

    async fn perform(&self, action: &str, input: &Record) -> ConceptResult<Record> {
        let grant = match action {
            "shareWithUser" => {
                let grant = Self::grant_of(input)?;
                let mut grants = self.grants.write();
                if !grants.contains(&grant) {
                    grants.push(grant.clone());
                }
                grant
            }
            "revokeAccess" => {
                let grant = Self::grant_of(input)?;
                self.grants.write().retain(|existing| *existing != grant);
                grant
            }
            other => return Err(ConceptError::UnknownAction(other.to_string())),
        };
        let (file, user) = grant;
        Ok(record! { "file" => Value::id(file), "user" => Value::id(user) })
    }

    async fn query(&self, query: &str, input: &Record) -> ConceptResult<Vec<Record>> {
        match query {
            "_getFilesSharedWithUser" => {
                let user = input.require_str("user")?;
                Ok(self
                    .grants
                    .read()
                    .iter()
                    .filter(|(_, grantee)| grantee == user)
                    .map(|(file, _)| record! { "file" => Value::id(file.as_str()) })
                    .collect())
            }
            "_isSharedWith" => {
                let grant = Self::grant_of(input)?;
                let access = self.grants.read().contains(&grant);
                Ok(vec![record! { "access" => access }])
            }
            other => Err(ConceptError::UnknownQuery(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(file: &str, user: &str) -> Record {
        record! { "file" => Value::id(file), "user" => Value::id(user) }
    }

    #[tokio::test]
    async fn test_share_and_revoke() {
        let sharing = Sharing::new();
        sharing.perform("shareWithUser", &grant("f1", "u2")).await.unwrap();
        sharing.perform("shareWithUser", &grant("f1", "u2")).await.unwrap();
        sharing.perform("shareWithUser", &grant("f2", "u2")).await.unwrap();

        let shared = sharing
            .query("_getFilesSharedWithUser", &record! { "user" => Value::id("u2") })
            .await
            .unwrap();
        assert_eq!(
            shared,
            vec![record! { "file" => Value::id("f1") }, record! { "file" => Value::id("f2") }]
        );

        sharing.perform("revokeAccess", &grant("f1", "u2")).await.unwrap();
        let access = sharing.query("_isSharedWith", &grant("f1", "u2")).await.unwrap();
        assert_eq!(access, vec![record! { "access" => false }]);
    }

    #[tokio::test]
    async fn test_text_and_id_name_the_same_grant() {
        let sharing = Sharing::new();
        let by_text = record! { "file" => "f1", "user" => "u2" };
        let out = sharing.perform("shareWithUser", &by_text).await.unwrap();
        assert_eq!(out, grant("f1", "u2"));

        let access = sharing.query("_isSharedWith", &grant("f1", "u2")).await.unwrap();
        assert_eq!(access, vec![record! { "access" => true }]);
        let shared = sharing
            .query("_getFilesSharedWithUser", &record! { "user" => "u2" })
            .await
            .unwrap();
        assert_eq!(shared, vec![record! { "file" => Value::id("f1") }]);

        sharing.perform("revokeAccess", &grant("f1", "u2")).await.unwrap();
        let access = sharing.query("_isSharedWith", &by_text).await.unwrap();
        assert_eq!(access, vec![record! { "access" => false }]);
    }

    #[tokio::test]
    async fn test_is_shared_with_always_answers() {
        let sharing = Sharing::new();
        sharing.perform("shareWithUser", &grant("f1", "u2")).await.unwrap();
        let yes = sharing.query("_isSharedWith", &grant("f1", "u2")).await.unwrap();
        let no = sharing.query("_isSharedWith", &grant("f1", "u3")).await.unwrap();
        assert_eq!(yes, vec![record! { "access" => true }]);
        assert_eq!(no, vec![record! { "access" => false }]);
    }
}
