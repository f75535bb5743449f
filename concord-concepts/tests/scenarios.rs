//! End-to-end request flows through the file-sharing rules

use concord_concepts::{App, AppConfig, AppError, Response};
use concord_engine::{record, Record, Value};

fn app() -> App {
    App::new(AppConfig::default()).unwrap()
}

async fn upload(app: &App, session: &Value, filename: &str) -> Value {
    let response = app
        .request(record! {
            "path" => "/FileUploading/requestUploadURL",
            "session" => session.clone(),
            "filename" => filename,
        })
        .await
        .unwrap();
    assert_eq!(response.responses.len(), 1, "{response:?}");
    response.responses[0]["file"].clone()
}

async fn confirm(app: &App, session: &Value, file: &Value) -> Response {
    app.request(record! {
        "path" => "/FileUploading/confirmUpload",
        "session" => session.clone(),
        "file" => file.clone(),
    })
    .await
    .unwrap()
}

async fn uploaded(app: &App, session: &Value, filename: &str) -> Value {
    let file = upload(app, session, filename).await;
    let response = confirm(app, session, &file).await;
    assert_eq!(response.responses, vec![record! { "status" => "confirmed" }]);
    file
}

async fn download(app: &App, session: &Value, file: &Value) -> Response {
    app.request(record! {
        "path" => "/download",
        "session" => session.clone(),
        "file" => file.clone(),
    })
    .await
    .unwrap()
}

fn only(response: &Response) -> &Record {
    assert_eq!(response.responses.len(), 1, "expected exactly one response: {response:?}");
    &response.responses[0]
}

fn results(response: &Response) -> Vec<Record> {
    only(response)["results"]
        .as_list()
        .unwrap()
        .iter()
        .map(|item| item.as_record().unwrap().clone())
        .collect()
}

#[tokio::test]
async fn test_upload_url_answers_once() {
    let app = app();
    app.register("alice").await.unwrap();
    let session = app.login("alice").await.unwrap();

    let response = app
        .request(record! {
            "path" => "/FileUploading/requestUploadURL",
            "session" => session,
            "filename" => "report.pdf",
        })
        .await
        .unwrap();

    let answer = only(&response);
    let file = answer["file"].as_id().unwrap();
    assert_eq!(
        answer["uploadURL"],
        Value::str(format!("https://storage.local/upload/{file}"))
    );
}

#[tokio::test]
async fn test_upload_without_session_gets_no_answer() {
    let app = app();
    let response = app
        .request(record! {
            "path" => "/FileUploading/requestUploadURL",
            "session" => Value::id("nope"),
            "filename" => "report.pdf",
        })
        .await
        .unwrap();
    assert!(response.responses.is_empty());
}

#[tokio::test]
async fn test_confirm_twice_reports_error() {
    let app = app();
    app.register("alice").await.unwrap();
    let session = app.login("alice").await.unwrap();
    let file = uploaded(&app, &session, "a.txt").await;

    let again = confirm(&app, &session, &file).await;
    let answer = only(&again);
    assert!(!answer.contains_key("status"));
    assert!(answer["error"].as_str().unwrap().contains("already confirmed"));
}

#[tokio::test]
async fn test_only_owner_confirms() {
    let app = app();
    app.register("alice").await.unwrap();
    app.register("bob").await.unwrap();
    let alice = app.login("alice").await.unwrap();
    let bob = app.login("bob").await.unwrap();
    let file = upload(&app, &alice, "a.txt").await;

    let response = confirm(&app, &bob, &file).await;
    assert!(response.responses.is_empty());
}

#[tokio::test]
async fn test_my_files_without_session_is_empty_list() {
    let app = app();
    let response = app
        .request(record! { "path" => "/my-files", "session" => Value::id("missing") })
        .await
        .unwrap();
    assert_eq!(only(&response)["results"], Value::List(Vec::new()));
}

#[tokio::test]
async fn test_my_files_with_nothing_uploaded_is_empty_list() {
    let app = app();
    app.register("alice").await.unwrap();
    let session = app.login("alice").await.unwrap();
    // pending uploads are not listed
    upload(&app, &session, "draft.txt").await;

    let response = app
        .request(record! { "path" => "/my-files", "session" => session })
        .await
        .unwrap();
    assert!(results(&response).is_empty());
}

#[tokio::test]
async fn test_my_files_lists_in_upload_order() {
    let app = app();
    app.register("alice").await.unwrap();
    let session = app.login("alice").await.unwrap();
    let first = uploaded(&app, &session, "a.txt").await;
    let second = uploaded(&app, &session, "b.txt").await;

    let response = app
        .request(record! { "path" => "/my-files", "session" => session })
        .await
        .unwrap();
    assert_eq!(
        results(&response),
        vec![
            record! { "file" => first, "filename" => "a.txt" },
            record! { "file" => second, "filename" => "b.txt" },
        ]
    );
}

#[tokio::test]
async fn test_download_requires_ownership_or_share() {
    let app = app();
    app.register("alice").await.unwrap();
    app.register("bob").await.unwrap();
    let alice = app.login("alice").await.unwrap();
    let bob = app.login("bob").await.unwrap();
    let file = uploaded(&app, &alice, "a.txt").await;

    let by_owner = download(&app, &alice, &file).await;
    let url = format!("https://storage.local/download/{}", file.as_id().unwrap());
    assert_eq!(only(&by_owner)["downloadURL"], Value::str(url.clone()));

    let by_stranger = download(&app, &bob, &file).await;
    assert!(by_stranger.responses.is_empty());

    let share = app
        .request(record! {
            "path" => "/share",
            "session" => alice.clone(),
            "file" => file.clone(),
            "shareWithUsername" => "bob",
        })
        .await
        .unwrap();
    assert_eq!(only(&share)["status"], Value::str("shared"));

    let by_grantee = download(&app, &bob, &file).await;
    assert_eq!(only(&by_grantee)["downloadURL"], Value::str(url));

    let revoke = app
        .request(record! {
            "path" => "/revoke",
            "session" => alice.clone(),
            "file" => file.clone(),
            "revokeForUsername" => "bob",
        })
        .await
        .unwrap();
    assert_eq!(only(&revoke)["status"], Value::str("revoked"));

    let after_revoke = download(&app, &bob, &file).await;
    assert!(after_revoke.responses.is_empty());
}

#[tokio::test]
async fn test_only_owner_shares() {
    let app = app();
    for name in ["alice", "bob", "carol"] {
        app.register(name).await.unwrap();
    }
    let alice = app.login("alice").await.unwrap();
    let bob = app.login("bob").await.unwrap();
    let file = uploaded(&app, &alice, "a.txt").await;

    let response = app
        .request(record! {
            "path" => "/share",
            "session" => bob,
            "file" => file,
            "shareWithUsername" => "carol",
        })
        .await
        .unwrap();
    assert!(response.responses.is_empty());
}

#[tokio::test]
async fn test_my_shares_lists_owner_usernames() {
    let app = app();
    for name in ["alice", "bob", "carol"] {
        app.register(name).await.unwrap();
    }
    let alice = app.login("alice").await.unwrap();
    let bob = app.login("bob").await.unwrap();
    let carol = app.login("carol").await.unwrap();
    let from_alice = uploaded(&app, &alice, "a.txt").await;
    let from_bob = uploaded(&app, &bob, "b.txt").await;

    for (session, file) in [(&alice, &from_alice), (&bob, &from_bob)] {
        app.request(record! {
            "path" => "/share",
            "session" => session.clone(),
            "file" => file.clone(),
            "shareWithUsername" => "carol",
        })
        .await
        .unwrap();
    }

    let response = app
        .request(record! { "path" => "/my-shares", "session" => carol })
        .await
        .unwrap();
    let listed = results(&response);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["file"], from_alice);
    assert_eq!(listed[0]["ownerUsername"], Value::str("alice"));
    assert_eq!(listed[1]["file"], from_bob);
    assert_eq!(listed[1]["ownerUsername"], Value::str("bob"));
}

#[tokio::test]
async fn test_my_shares_empty_without_shares() {
    let app = app();
    app.register("alice").await.unwrap();
    let session = app.login("alice").await.unwrap();
    let response = app
        .request(record! { "path" => "/my-shares", "session" => session })
        .await
        .unwrap();
    assert!(results(&response).is_empty());
}

#[tokio::test]
async fn test_login_unknown_user() {
    let app = app();
    let err = app.login("nobody").await.unwrap_err();
    assert!(matches!(err, AppError::UnknownUser(name) if name == "nobody"));
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let app = app();
    app.register("alice").await.unwrap();
    let err = app.register("alice").await.unwrap_err();
    assert!(
        matches!(&err, AppError::Rejected { action, error } if action == "register" && error.contains("taken")),
        "{err}"
    );
}

#[tokio::test]
async fn test_each_request_gets_its_own_flow() {
    let app = app();
    let first = app
        .request(record! { "path" => "/my-files", "session" => Value::id("x") })
        .await
        .unwrap();
    let second = app
        .request(record! { "path" => "/my-files", "session" => Value::id("x") })
        .await
        .unwrap();
    assert_ne!(first.flow, second.flow);
    // request + fallback respond
    assert_eq!(app.engine().flow(&first.flow).len(), 2);
}

#[tokio::test]
async fn test_share_by_text_then_download_by_id() {
    let app = app();
    app.register("alice").await.unwrap();
    app.register("bob").await.unwrap();
    let alice = app.login("alice").await.unwrap();
    let bob = app.login("bob").await.unwrap();
    let file = uploaded(&app, &alice, "a.txt").await;
    let as_text = Value::str(file.as_id().unwrap());

    let share = app
        .request(record! {
            "path" => "/share",
            "session" => alice,
            "file" => as_text.clone(),
            "shareWithUsername" => "bob",
        })
        .await
        .unwrap();
    assert_eq!(only(&share)["status"], Value::str("shared"));

    let url = Value::str(format!("https://storage.local/download/{}", file.as_id().unwrap()));
    assert_eq!(only(&download(&app, &bob, &file).await)["downloadURL"], url);
    assert_eq!(only(&download(&app, &bob, &as_text).await)["downloadURL"], url);

    let shares = app
        .request(record! { "path" => "/my-shares", "session" => bob })
        .await
        .unwrap();
    let listed = results(&shares);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["file"], file);
}
