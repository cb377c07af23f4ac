use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use huddle_api::{auth, router};
use huddle_api::session::verify_token;
use huddle_api::state::AppStateInner;
use huddle_db::Database;

const SECRET: &str = "integration-secret";

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    router::build(Arc::new(AppStateInner::new(db, SECRET)))
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str, email: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "email": email, "password": password })),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

#[tokio::test]
async fn register_login_post_and_read_back() {
    let app = app();

    let (status, body) = register(&app, "alice", "alice@x.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@x.com");
    assert!(body["user"].get("password").is_none());

    let (status, body) = login(&app, "alice@x.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(verify_token(SECRET, &token).unwrap().username, "alice");

    let (status, posted) = call(
        &app,
        Method::POST,
        "/api/groups/1/messages",
        Some(&token),
        Some(json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(posted["id"].as_i64().is_some());
    assert!(posted["timestamp"].as_str().is_some());

    let (status, history) = call(&app, Method::GET, "/api/groups/1/messages", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let last = history.as_array().unwrap().last().unwrap();
    assert_eq!(last["message"], "hi");
    assert_eq!(last["username"], "alice");
    assert_eq!(last["id"], posted["id"]);
}

#[tokio::test]
async fn duplicate_registration_conflicts_either_way() {
    let app = app();

    assert_eq!(register(&app, "bob", "bob@x.com", "secret1").await.0, StatusCode::OK);

    let (status, body) = register(&app, "bobby", "bob@x.com", "secret1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");

    let (status, body) = register(&app, "bob", "other@x.com", "secret1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");

    // Uniqueness is case-sensitive.
    assert_eq!(register(&app, "Bob", "Bob@x.com", "secret1").await.0, StatusCode::OK);
}

#[tokio::test]
async fn registration_validation() {
    let app = app();
    for (username, email, password) in [
        ("al", "al@x.com", "secret1"),
        ("alice", "nope", "secret1"),
        ("alice", "alice@x.com", "short"),
    ] {
        let (status, body) = register(&app, username, email, password).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some());
    }

    let (status, body) = call(&app, Method::POST, "/api/auth/register", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn bad_login_does_not_reveal_which_part_failed() {
    let app = app();
    register(&app, "carol", "carol@x.com", "secret1").await;

    let wrong_password = login(&app, "carol@x.com", "wrong-password").await;
    let unknown_email = login(&app, "nobody@x.com", "secret1").await;

    assert_eq!(wrong_password.0, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.1["error"], "Invalid credentials");

    let (status, _) = login(&app, "carol@x.com", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn author_comes_from_the_token_not_the_body() {
    let app = app();
    let (_, alice) = register(&app, "alice", "alice@x.com", "secret1").await;
    register(&app, "mallory", "mallory@x.com", "secret1").await;
    let token = alice["token"].as_str().unwrap();

    let (status, posted) = call(
        &app,
        Method::POST,
        "/api/groups/1/messages",
        Some(token),
        Some(json!({ "message": "it was me", "username": "mallory", "user_id": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted["username"], "alice");
    assert_eq!(posted["user_id"], alice["user"]["id"]);
}

#[tokio::test]
async fn protected_endpoints_fail_closed() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/groups/1/messages",
        None,
        Some(json!({ "message": "anon" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().is_some());

    let (status, _) = call(&app, Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, history) = call(&app, Method::GET, "/api/groups/1/messages", None, None).await;
    assert_eq!(history.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn blank_message_is_rejected_and_not_stored() {
    let app = app();
    let (_, alice) = register(&app, "alice", "alice@x.com", "secret1").await;
    let token = alice["token"].as_str().unwrap();

    for blank in ["", "   ", "\n\t"] {
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/groups/1/messages",
            Some(token),
            Some(json!({ "message": blank })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");
    }

    let (_, history) = call(&app, Method::GET, "/api/groups/1/messages", None, None).await;
    assert_eq!(history.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn me_returns_the_token_owner() {
    let app = app();
    let (_, alice) = register(&app, "alice", "alice@x.com", "secret1").await;
    let token = alice["token"].as_str().unwrap();

    let (status, me) = call(&app, Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me, alice["user"]);
}

#[tokio::test]
async fn unknown_group_reads_as_empty() {
    let app = app();

    let (status, history) = call(&app, Method::GET, "/api/groups/999/messages", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history, json!([]));

    let (status, group) = call(&app, Method::GET, "/api/groups/999", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(group, Value::Null);
}

#[tokio::test]
async fn groups_are_listed_and_fetched() {
    let app = app();

    let (status, groups) = call(&app, Method::GET, "/api/groups", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groups[0]["name"], "Fun Friday Group");

    let (status, group) = call(&app, Method::GET, "/api/groups/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(group["description"], "A group for fun discussions");
}

#[tokio::test]
async fn seeded_history_is_in_time_order() {
    let app = app();
    let (_, history) = call(&app, Method::GET, "/api/groups/1/messages", None, None).await;
    let stamps: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["timestamp"].as_str().unwrap())
        .collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);
    assert_eq!(history[5]["username"], "Kirtidan Gadhvi");
    assert_eq!(history[0]["user_id"], Value::Null);
}

#[tokio::test]
async fn posting_to_unknown_group_is_rejected() {
    let app = app();
    let (_, alice) = register(&app, "alice", "alice@x.com", "secret1").await;
    let token = alice["token"].as_str().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/groups/999/messages",
        Some(token),
        Some(json!({ "message": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Group not found");
}

#[tokio::test]
async fn international_addresses_can_register_and_log_in() {
    let app = app();

    let (status, body) = register(&app, "klaus", "a@bücher.de", "secret1").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, _) = register(&app, "ivan", "user@example.xn--p1ai", "secret1").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = login(&app, "a@bücher.de", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "klaus");
}

#[tokio::test]
async fn unknown_email_login_still_pays_for_a_hash() {
    let app = app();
    auth::prime_login_timing();
    register(&app, "alice", "alice@x.com", "secret1").await;

    let mut wrong_password = Duration::MAX;
    let mut unknown_email = Duration::MAX;
    for _ in 0..3 {
        let start = Instant::now();
        let (status, _) = login(&app, "alice@x.com", "wrong-password").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        wrong_password = wrong_password.min(start.elapsed());

        let start = Instant::now();
        let (status, _) = login(&app, "nobody@x.com", "wrong-password").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        unknown_email = unknown_email.min(start.elapsed());
    }

    // Loose bound: both paths run one Argon2 verify, so neither is an order
    // of magnitude faster than the other.
    assert!(
        unknown_email * 4 >= wrong_password,
        "unknown email {unknown_email:?} vs wrong password {wrong_password:?}"
    );
}

#[tokio::test]
async fn slow_store_call_times_out_as_server_error() {
    let mut inner = AppStateInner::new(Database::open_in_memory().unwrap(), SECRET);
    inner.store_timeout = Duration::from_millis(50);
    let state = Arc::new(inner);
    let app = router::build(state.clone());

    // Hold the connection well past the store timeout.
    let (locked_tx, locked_rx) = mpsc::channel();
    let holder = {
        let state = state.clone();
        std::thread::spawn(move || {
            state.db.with_conn(|_| {
                locked_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(500));
                Ok(())
            })
        })
    };
    locked_rx.recv().unwrap();

    let (status, body) = call(&app, Method::GET, "/api/groups", None, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Server error" }));

    holder.join().unwrap().unwrap();
    let (status, _) = call(&app, Method::GET, "/api/groups", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
