use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use crate::{
    app::build_router,
    middleware::auth::cookie::SessionCookie,
    repos::pool,
    services::auth::{PasswordHasher, TokenService},
    state::AppState,
};

async fn test_app() -> (Router, AppState) {
    let (app, state, _) = test_app_with_pool().await;
    (app, state)
}

async fn test_app_with_pool() -> (Router, AppState, SqlitePool) {
    let db = pool::memory().await;
    let state = AppState::new(
        db.clone(),
        Arc::new(TokenService::new(b"test-secret")),
        PasswordHasher::new(4),
        SessionCookie::new(30, false),
    );
    (build_router(state.clone()), state, db)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

fn location(res: &Response<Body>) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn set_cookie(res: &Response<Body>) -> &str {
    res.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn json(res: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, username: &str, password: &str) -> Response<Body> {
    send(
        app,
        post(
            "/register",
            &format!("username={username}&password={password}"),
            None,
        ),
    )
    .await
}

async fn login(app: &Router, username: &str, password: &str) -> Response<Body> {
    send(
        app,
        post(
            "/login",
            &format!("username={username}&password={password}"),
            None,
        ),
    )
    .await
}

/// Registers, logs in and returns the `Cookie` header value to send back.
async fn session_for(app: &Router, username: &str, password: &str) -> String {
    let res = register(app, username, password).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = login(app, username, password).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    set_cookie(&res)
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn list(app: &Router, cookie: &str, filter: &str) -> Value {
    let res = send(app, get(&format!("/?filter={filter}"), Some(cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    json(res).await
}

async fn add(app: &Router, cookie: &str, title: &str) {
    let res = send(app, post("/add_todo", &format!("title={title}"), Some(cookie))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

fn ids(listing: &Value) -> Vec<i64> {
    listing["todos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect()
}

fn counts(listing: &Value) -> (i64, i64, i64) {
    (
        listing["total_count"].as_i64().unwrap(),
        listing["pending_count"].as_i64().unwrap(),
        listing["completed_count"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = test_app().await;

    let res = send(&app, get("/health", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json(res).await["status"], "healthy");
}

#[tokio::test]
async fn anonymous_requests_are_redirected_to_login() {
    let (app, _) = test_app().await;

    for req in [
        get("/", None),
        get("/change-password", None),
        post("/add_todo", "title=x", None),
        post("/toggle_todo/1", "", None),
        post("/delete_todo/1", "", None),
        post("/delete_all_completed", "", None),
        get("/", Some("access_token=not-a-jwt")),
    ] {
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");
    }
}

#[tokio::test]
async fn token_signed_elsewhere_is_anonymous() {
    let (app, _) = test_app().await;
    session_for(&app, "alice", "secret1").await;

    let forged = TokenService::new(b"another-secret")
        .issue("alice", 30)
        .unwrap();
    let res = send(&app, get("/", Some(&format!("access_token={forged}")))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn register_validates_input() {
    let (app, _) = test_app().await;

    let res = register(&app, "al", "secret1").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(res).await["error"]["code"], "VALIDATION_ERROR");

    let res = register(&app, "alice", "12345").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = register(&app, "alice", "secret1").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");

    let res = register(&app, "alice", "different1").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(res).await["error"]["code"], "USERNAME_TAKEN");
}

#[tokio::test]
async fn login_failures_look_the_same() {
    let (app, _) = test_app().await;
    register(&app, "alice", "secret1").await;

    let unknown = login(&app, "nobody", "secret1").await;
    let wrong = login(&app, "alice", "wrong-password").await;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(unknown.headers().get(header::SET_COOKIE).is_none());
    assert!(wrong.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(json(unknown).await, json(wrong).await);
}

#[tokio::test]
async fn login_sets_a_locked_down_cookie() {
    let (app, _) = test_app().await;
    register(&app, "alice", "secret1").await;

    let res = login(&app, "alice", "secret1").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let cookie = set_cookie(&res);
    assert!(cookie.starts_with("access_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=1800"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let (app, _) = test_app().await;

    let res = send(&app, get("/logout", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    assert!(set_cookie(&res).starts_with("access_token=;"));
    assert!(set_cookie(&res).contains("Max-Age=0"));
}

#[tokio::test]
async fn buy_milk_scenario() {
    let (app, _) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;

    let res = send(
        &app,
        post(
            "/add_todo",
            "title=Buy+milk&description=2+litres",
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/?filter=pending");

    let listing = list(&app, &alice, "all").await;
    let id = ids(&listing)[0];

    let res = send(&app, post(&format!("/toggle_todo/{id}"), "", Some(&alice))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let listing = list(&app, &alice, "all").await;
    assert_eq!(listing["user"], "alice");
    assert_eq!(listing["filter"], "all");
    let todos = listing["todos"].as_array().unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0]["title"], "Buy milk");
    assert_eq!(todos[0]["description"], "2 litres");
    assert_eq!(todos[0]["completed"], true);
    assert_eq!(counts(&listing), (1, 0, 1));
}

#[tokio::test]
async fn filters_keep_counts_stable() {
    let (app, _) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;

    for title in ["one", "two", "three", "four", "five"] {
        add(&app, &alice, title).await;
    }
    let all = ids(&list(&app, &alice, "all").await);
    for id in &all[..2] {
        send(&app, post(&format!("/toggle_todo/{id}"), "", Some(&alice))).await;
    }

    let pending = list(&app, &alice, "pending").await;
    assert_eq!(ids(&pending).len(), 3);
    let completed = list(&app, &alice, "completed").await;
    assert_eq!(ids(&completed).len(), 2);

    for listing in [&pending, &completed, &list(&app, &alice, "all").await] {
        assert_eq!(counts(listing), (5, 3, 2));
    }

    let res = send(&app, get("/", Some(&alice))).await;
    assert_eq!(json(res).await["filter"], "all");

    let res = send(&app, get("/?filter=bogus", Some(&alice))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_users_todos_are_not_found() {
    let (app, _) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;
    let bob = session_for(&app, "bob", "secret2").await;

    add(&app, &alice, "private").await;
    let id = ids(&list(&app, &alice, "all").await)[0];

    assert!(ids(&list(&app, &bob, "all").await).is_empty());

    for uri in [
        format!("/toggle_todo/{id}"),
        format!("/delete_todo/{id}"),
        format!("/toggle_todo/{}", id + 1000),
    ] {
        let res = send(&app, post(&uri, "", Some(&bob))).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
    }
    let res = send(
        &app,
        post(&format!("/edit_todo/{id}"), "title=mine", Some(&bob)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // bob's clear-completed never reaches alice's rows
    send(&app, post(&format!("/toggle_todo/{id}"), "", Some(&alice))).await;
    send(&app, post("/delete_all_completed", "", Some(&bob))).await;

    let listing = list(&app, &alice, "all").await;
    assert_eq!(listing["todos"][0]["title"], "private");
    assert_eq!(counts(&listing), (1, 0, 1));
}

#[tokio::test]
async fn empty_title_is_rejected_without_insert() {
    let (app, _) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;

    let res = send(&app, post("/add_todo", "title=+++", Some(&alice))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");
    assert_eq!(counts(&list(&app, &alice, "all").await), (0, 0, 0));
}

#[tokio::test]
async fn mutations_return_to_the_referrer() {
    let (app, _) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;
    add(&app, &alice, "a").await;
    add(&app, &alice, "b").await;
    let ids = ids(&list(&app, &alice, "all").await);

    let mut req = post(&format!("/toggle_todo/{}", ids[0]), "", Some(&alice));
    req.headers_mut().insert(
        header::REFERER,
        "http://localhost:3000/?filter=completed".parse().unwrap(),
    );
    let res = send(&app, req).await;
    assert_eq!(location(&res), "/?filter=completed");

    let mut req = post(
        &format!("/edit_todo/{}", ids[1]),
        "title=renamed",
        Some(&alice),
    );
    req.headers_mut()
        .insert(header::REFERER, "/?filter=pending".parse().unwrap());
    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/?filter=pending");

    let res = send(
        &app,
        post(&format!("/delete_todo/{}", ids[1]), "", Some(&alice)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let res = send(&app, post("/delete_all_completed", "", Some(&alice))).await;
    assert_eq!(location(&res), "/");
    assert_eq!(counts(&list(&app, &alice, "all").await), (0, 0, 0));
}

#[tokio::test]
async fn edit_rejects_blank_title() {
    let (app, _) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;
    add(&app, &alice, "keep").await;
    let id = ids(&list(&app, &alice, "all").await)[0];

    let res = send(
        &app,
        post(&format!("/edit_todo/{id}"), "title=", Some(&alice)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(list(&app, &alice, "all").await["todos"][0]["title"], "keep");
}

#[tokio::test]
async fn change_password_flow() {
    let (app, _) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;

    let res = send(&app, get("/change-password", Some(&alice))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json(res).await["user"], "alice");

    for body in [
        "old_password=nope123&new_password=secret2&confirm_password=secret2",
        "old_password=secret1&new_password=short&confirm_password=short",
        "old_password=secret1&new_password=secret2&confirm_password=secret3",
        "old_password=secret1&new_password=secret1&confirm_password=secret1",
    ] {
        let res = send(&app, post("/change-password", body, Some(&alice))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    let res = send(
        &app,
        post(
            "/change-password",
            "old_password=secret1&new_password=secret2&confirm_password=secret2",
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/change-password");

    assert_eq!(
        login(&app, "alice", "secret1").await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&app, "alice", "secret2").await.status(),
        StatusCode::SEE_OTHER
    );
}

#[tokio::test]
async fn deleted_user_session_stops_resolving() {
    let (app, state) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;
    add(&app, &alice, "a").await;

    let user = state.users.find_by_username("alice").await.unwrap().unwrap();
    assert!(state.users.delete(user.id).await.unwrap());

    let res = send(&app, get("/", Some(&alice))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let (app, _) = test_app().await;

    let res = send(&app, get("/health", None)).await;
    let headers = res.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "same-origin");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn form_pages_are_public() {
    let (app, _) = test_app().await;

    for (path, form) in [("/register", "register"), ("/login", "login")] {
        let res = send(&app, get(path, None)).await;
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        let body = json(res).await;
        assert_eq!(body["form"], form);
        assert_eq!(body["fields"], serde_json::json!(["username", "password"]));
    }
}

#[tokio::test]
async fn store_outage_is_retryable_not_anonymous() {
    let (app, _, db) = test_app_with_pool().await;
    let alice = session_for(&app, "alice", "secret1").await;

    db.close().await;

    let res = send(&app, get("/", Some(&alice))).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(res.headers().get(header::LOCATION).is_none());
    assert_eq!(json(res).await["error"]["code"], "STORE_UNAVAILABLE");
}

#[tokio::test]
async fn stale_empty_cookie_does_not_mask_the_session() {
    let (app, _) = test_app().await;
    let alice = session_for(&app, "alice", "secret1").await;

    let res = send(&app, get("/", Some(&format!("access_token=; {alice}")))).await;
    assert_eq!(res.status(), StatusCode::OK);
}
