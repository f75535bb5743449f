//! FileUploading: two-phase uploads with owner and filename metadata

use crate::fresh_id;
use async_trait::async_trait;
use concord_engine::{record, Concept, ConceptError, ConceptResult, Record, RecordExt, Value};
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadStatus {
    Pending,
    Uploaded,
}

#[derive(Debug, Clone)]
struct FileEntry {
    id: String,
    owner: Value,
    filename: String,
    status: UploadStatus,
}

/// Upload slots handed out by `requestUploadURL` and confirmed by
/// `confirmUpload`
///
/// Only confirmed files are listed or downloadable. URLs are derived from
/// the configured storage base URL.
#[derive(Debug)]
pub struct FileUploading {
    base_url: String,
    files: RwLock<Vec<FileEntry>>,
}

impl FileUploading {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            files: RwLock::new(Vec::new()),
        }
    }

    fn url(&self, kind: &str, file: &str) -> String {
        format!("{}/{kind}/{file}", self.base_url)
    }

    fn lookup<T>(&self, input: &Record, read: impl Fn(&FileEntry) -> Option<T>) -> ConceptResult<Option<T>> {
        let file = input.require_str("file")?;
        Ok(self.files.read().iter().find(|entry| entry.id == file).and_then(read))
    }
}

#[async_trait]
impl Concept for FileUploading {
    fn name(&self) -> &str {
        "FileUploading"
    }

    fn actions(&self) -> &[&'static str] {
        &["requestUploadURL", "confirmUpload"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getOwner", "_getFilename", "_getFilesByOwner", "_getDownloadURL"]
    }

    async fn perform(&self, action: &str, input: &Record) -> ConceptResult<Record> {
        match action {
            "requestUploadURL" => {
                let owner = input.require("owner")?.clone();
                let filename = input.require_str("filename")?.to_string();
                let id = fresh_id();
                let upload_url = self.url("upload", &id);
                self.files.write().push(FileEntry {
                    id: id.clone(),
                    owner,
                    filename,
                    status: UploadStatus::Pending,
                });
                Ok(record! { "file" => Value::id(id), "uploadURL" => upload_url })
            }
            "confirmUpload" => {
                let file = input.require_str("file")?;
                let mut files = self.files.write();
                Ok(match files.iter_mut().find(|entry| entry.id == file) {
                    None => record! { "error" => format!("no file {file}") },
                    Some(entry) if entry.status == UploadStatus::Uploaded => {
                        record! { "error" => format!("file {file} is already confirmed") }
                    }
                    Some(entry) => {
                        entry.status = UploadStatus::Uploaded;
                        record! { "file" => Value::id(file) }
                    }
                })
            }
            other => Err(ConceptError::UnknownAction(other.to_string())),
        }
    }

    async fn query(&self, query: &str, input: &Record) -> ConceptResult<Vec<Record>> {
        let row = match query {
            "_getOwner" => self.lookup(input, |entry| Some(record! { "owner" => entry.owner.clone() }))?,
            "_getFilename" => {
                self.lookup(input, |entry| Some(record! { "filename" => entry.filename.as_str() }))?
            }
            "_getDownloadURL" => self.lookup(input, |entry| {
                (entry.status == UploadStatus::Uploaded)
                    .then(|| record! { "downloadURL" => self.url("download", &entry.id) })
            })?,
            "_getFilesByOwner" => {
                let owner = input.require("owner")?;
                return Ok(self
                    .files
                    .read()
                    .iter()
                    .filter(|entry| entry.status == UploadStatus::Uploaded && entry.owner == *owner)
                    .map(|entry| {
                        record! { "file" => Value::id(entry.id.as_str()), "filename" => entry.filename.as_str() }
                    })
                    .collect());
            }
            other => return Err(ConceptError::UnknownQuery(other.to_string())),
        };
        Ok(row.into_iter().collect())
    }
}
