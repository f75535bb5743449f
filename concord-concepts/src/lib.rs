//! Reference concepts for concord
//!
//! In-memory implementations of the five concepts behind a small
//! file-sharing service, the sync rules connecting them, and an [`App`]
//! façade running both on a [`concord_engine::SyncEngine`].
//!
//! | Concept              | Actions                               | Queries |
//! |----------------------|---------------------------------------|---------|
//! | `Requesting`         | `request`, `respond`                  | `_getRequest` |
//! | `Sessioning`         | `create`, `delete`                    | `_getUser` |
//! | `UserAuthentication` | `register`                            | `_getUsername`, `_getUserByUsername` |
//! | `FileUploading`      | `requestUploadURL`, `confirmUpload`   | `_getOwner`, `_getFilename`, `_getFilesByOwner`, `_getDownloadURL` |
//! | `Sharing`            | `shareWithUser`, `revokeAccess`       | `_getFilesSharedWithUser`, `_isSharedWith` |
//!
//! State lives in memory behind `parking_lot::RwLock`s, so queries may run
//! concurrently.

pub mod app;
pub mod config;
pub mod file_uploading;
pub mod requesting;
pub mod sessioning;
pub mod sharing;
pub mod syncs;
pub mod user_authentication;

pub use app::{App, AppError, AppResult, Response};
pub use config::{AppConfig, StorageConfig};
pub use file_uploading::FileUploading;
pub use requesting::Requesting;
pub use sessioning::Sessioning;
pub use sharing::Sharing;
pub use user_authentication::UserAuthentication;

/// A new opaque identifier
pub(crate) fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
