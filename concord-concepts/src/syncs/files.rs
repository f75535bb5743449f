//! Uploading, listing and downloading files

use super::{request_on, respond};
use concord_engine::{lit, var, ActionInvocation, ActionPattern, Predicate, Result, SyncRule, Value};

const UPLOAD_PATH: &str = "/FileUploading/requestUploadURL";
const CONFIRM_PATH: &str = "/FileUploading/confirmUpload";

pub fn rules() -> Result<Vec<SyncRule>> {
    Ok(vec![
        request_upload_url()?,
        request_upload_url_response()?,
        confirm_upload_request()?,
        confirm_upload_response_success()?,
        confirm_upload_response_error()?,
        list_my_files_request()?,
        list_shared_files_request()?,
        download_file_request()?,
    ])
}

fn request_upload_url() -> Result<SyncRule> {
    SyncRule::builder("RequestUploadURL")
        .when(
            request_on(UPLOAD_PATH)
                .input("session", var("session"))
                .input("filename", var("filename")),
        )
        .query("Sessioning", "_getUser", [("session", var("session"))], [("user", "user")])
        .then(
            ActionInvocation::new("FileUploading", "requestUploadURL")
                .arg("owner", var("user"))
                .arg("filename", var("filename")),
        )
        .build()
}

fn request_upload_url_response() -> Result<SyncRule> {
    SyncRule::builder("RequestUploadURLResponse")
        .when(request_on(UPLOAD_PATH))
        .when(
            ActionPattern::new("FileUploading", "requestUploadURL")
                .output("file", var("file"))
                .output("uploadURL", var("uploadURL")),
        )
        .then(
            respond()
                .arg("file", var("file"))
                .arg("uploadURL", var("uploadURL")),
        )
        .build()
}

fn confirm_upload_request() -> Result<SyncRule> {
    SyncRule::builder("ConfirmUploadRequest")
        .when(
            request_on(CONFIRM_PATH)
                .input("session", var("session"))
                .input("file", var("file")),
        )
        .query("Sessioning", "_getUser", [("session", var("session"))], [("user", "user")])
        .query("FileUploading", "_getOwner", [("file", var("file"))], [("owner", "owner")])
        .filter(Predicate::equal("user", "owner"))
        .then(ActionInvocation::new("FileUploading", "confirmUpload").arg("file", var("file")))
        .build()
}

fn confirm_upload_response_success() -> Result<SyncRule> {
    SyncRule::builder("ConfirmUploadResponseSuccess")
        .when(request_on(CONFIRM_PATH))
        .when(ActionPattern::new("FileUploading", "confirmUpload").output("file", var("file")))
        .then(respond().arg("status", lit("confirmed")))
        .build()
}

fn confirm_upload_response_error() -> Result<SyncRule> {
    SyncRule::builder("ConfirmUploadResponseError")
        .when(request_on(CONFIRM_PATH))
        .when(ActionPattern::new("FileUploading", "confirmUpload").output("error", var("error")))
        .then(respond().arg("error", var("error")))
        .build()
}

/// Owned files; no session or no files both answer with an empty list
fn list_my_files_request() -> Result<SyncRule> {
    SyncRule::builder("ListMyFilesRequest")
        .when(request_on("/my-files").input("session", var("session")))
        .query("Sessioning", "_getUser", [("session", var("session"))], [("user", "user")])
        .query(
            "FileUploading",
            "_getFilesByOwner",
            [("owner", var("user"))],
            [("file", "file"), ("filename", "filename")],
        )
        .or_else([("results", Value::List(Vec::new()))])
        .collect_as(["file", "filename"], "results")
        .then(respond().arg("results", var("results")))
        .build()
}

/// Files shared with the caller, with their owners' usernames
fn list_shared_files_request() -> Result<SyncRule> {
    SyncRule::builder("ListSharedFilesRequest")
        .when(request_on("/my-shares").input("session", var("session")))
        .query("Sessioning", "_getUser", [("session", var("session"))], [("user", "user")])
        .or_else([("results", Value::List(Vec::new()))])
        .query("Sharing", "_getFilesSharedWithUser", [("user", var("user"))], [("file", "file")])
        .or_else([("results", Value::List(Vec::new()))])
        .query("FileUploading", "_getFilename", [("file", var("file"))], [("filename", "filename")])
        .query("FileUploading", "_getOwner", [("file", var("file"))], [("owner", "owner")])
        .query(
            "UserAuthentication",
            "_getUsername",
            [("user", var("owner"))],
            [("username", "ownerUsername")],
        )
        // `owner` is collected too so that one response lists every owner's files
        .collect_as(["file", "filename", "owner", "ownerUsername"], "results")
        .then(respond().arg("results", var("results")))
        .build()
}

/// Owners and users the file is shared with get a download URL
fn download_file_request() -> Result<SyncRule> {
    SyncRule::builder("DownloadFileRequest")
        .when(
            request_on("/download")
                .input("session", var("session"))
                .input("file", var("file")),
        )
        .query("Sessioning", "_getUser", [("session", var("session"))], [("user", "user")])
        .query("FileUploading", "_getOwner", [("file", var("file"))], [("owner", "owner")])
        .query(
            "Sharing",
            "_isSharedWith",
            [("file", var("file")), ("user", var("user"))],
            [("access", "isShared")],
        )
        .filter(Predicate::any(vec![
            Predicate::equal("user", "owner"),
            Predicate::is_true("isShared"),
        ]))
        .query(
            "FileUploading",
            "_getDownloadURL",
            [("file", var("file"))],
            [("downloadURL", "downloadURL")],
        )
        .then(respond().arg("downloadURL", var("downloadURL")))
        .build()
}
