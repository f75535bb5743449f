//! Sharing files with other users and revoking access

use super::{request_on, respond};
use concord_engine::{lit, var, ActionInvocation, ActionPattern, Predicate, Result, SyncRule};

pub fn rules() -> Result<Vec<SyncRule>> {
    Ok(vec![
        share_file_request()?,
        share_file_response()?,
        revoke_access_request()?,
        revoke_access_response()?,
    ])
}

/// Only the owner may grant access; the grantee is named by username
fn share_file_request() -> Result<SyncRule> {
    SyncRule::builder("ShareFileRequest")
        .when(
            request_on("/share")
                .input("session", var("session"))
                .input("file", var("file"))
                .input("shareWithUsername", var("shareWithUsername")),
        )
        .query("Sessioning", "_getUser", [("session", var("session"))], [("user", "requester")])
        .query("FileUploading", "_getOwner", [("file", var("file"))], [("owner", "owner")])
        .filter(Predicate::equal("requester", "owner"))
        .query(
            "UserAuthentication",
            "_getUserByUsername",
            [("username", var("shareWithUsername"))],
            [("user", "targetUser")],
        )
        .then(
            ActionInvocation::new("Sharing", "shareWithUser")
                .arg("file", var("file"))
                .arg("user", var("targetUser")),
        )
        .build()
}

fn share_file_response() -> Result<SyncRule> {
    SyncRule::builder("ShareFileResponse")
        .when(request_on("/share"))
        .when(ActionPattern::new("Sharing", "shareWithUser"))
        .then(respond().arg("status", lit("shared")))
        .build()
}

fn revoke_access_request() -> Result<SyncRule> {
    SyncRule::builder("RevokeAccessRequest")
        .when(
            request_on("/revoke")
                .input("session", var("session"))
                .input("file", var("file"))
                .input("revokeForUsername", var("revokeForUsername")),
        )
        .query("Sessioning", "_getUser", [("session", var("session"))], [("user", "requester")])
        .query("FileUploading", "_getOwner", [("file", var("file"))], [("owner", "owner")])
        .filter(Predicate::equal("requester", "owner"))
        .query(
            "UserAuthentication",
            "_getUserByUsername",
            [("username", var("revokeForUsername"))],
            [("user", "targetUser")],
        )
        .then(
            ActionInvocation::new("Sharing", "revokeAccess")
                .arg("file", var("file"))
                .arg("user", var("targetUser")),
        )
        .build()
}

fn revoke_access_response() -> Result<SyncRule> {
    SyncRule::builder("RevokeAccessResponse")
        .when(request_on("/revoke"))
        .when(ActionPattern::new("Sharing", "revokeAccess"))
        .then(respond().arg("status", lit("revoked")))
        .build()
}
