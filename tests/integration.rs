//! Integration tests for the meru API.
//!
//! These tests require a running Redis instance (default: redis://127.0.0.1:6379).
//! Set REDIS_URL env var to override.

use meru::models::{
    StoredTransaction, TransactionKind, TransactionStatus, DEFAULT_TRANSACTION_DESCRIPTION,
};
use meru::{auth::middleware::AppState, config::Config, middleware::security_headers, routes};
use std::sync::Arc;

/// Helper to get Redis URL from environment or use default.
fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Spin up a test server and return its base URL.
async fn spawn_test_server() -> (String, redis::aio::MultiplexedConnection) {
    let redis_client = redis::Client::open(redis_url()).expect("Failed to open Redis");
    let con = redis_client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis");

    let config = Config {
        redis_url: redis_url(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        session_ttl_secs: 900,
        // reqwest won't send Secure cookies over plain http
        cookie_secure: false,
        // minimum cost keeps the suite fast
        bcrypt_cost: 4,
        allowed_origins: vec![],
        rate_limit_auth_per_min: 1000,
    };

    let state = AppState {
        redis: redis_client,
        config: Arc::new(config),
    };

    let app = routes::api_router()
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let base_url = format!("http://{}", addr);
    (base_url, con)
}

/// Client with a cookie store, as a browser would behave.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap()
}

/// Unique-per-run registration payload.
fn test_account(name: &str, role: Option<&str>) -> serde_json::Value {
    let tag = nanoid::nanoid!(8);
    let mut account = serde_json::json!({
        "name": name,
        "email": format!("{}_{}@test.example", name.to_lowercase(), tag),
        "password": "pw123",
        "phone": format!("07{}", tag),
    });
    if let Some(role) = role {
        account["role"] = serde_json::json!(role);
    }
    account
}

/// Helper: register an account, asserting success.
async fn register(client: &reqwest::Client, base_url: &str, account: &serde_json::Value) {
    let resp = client
        .post(format!("{}/api/register", base_url))
        .json(account)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
}

/// Helper: log in with email/password.
async fn login(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/login", base_url))
        .json(&serde_json::json!({"email": email, "password": password}))
        .send()
        .await
        .unwrap()
}

// ============================================================================
// Register / Login / Profile Tests
// ============================================================================

#[tokio::test]
async fn test_register_login_user_data_round_trip() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    // Register with a mixed-case email
    let mut account = test_account("Amy", Some("Rider"));
    let email = account["email"].as_str().unwrap().to_string();
    account["email"] = serde_json::json!(email.to_uppercase());
    register(&client, &base_url, &account).await;

    // Login with the lowercase form succeeds (comparison is case-insensitive)
    let resp = login(&client, &base_url, &email, "pw123").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    // Profile reflects what was registered
    let resp = client
        .get(format!("{}/api/user-data", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let raw = resp.text().await.unwrap();
    let body: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["name"], "Amy");
    assert_eq!(body["user"]["role"], "Rider");
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["balance"], 0.0);

    // No password under any key, and no hash material anywhere in the body
    let user = body["user"].as_object().unwrap();
    for key in user.keys() {
        assert!(!key.to_lowercase().contains("password"));
    }
    assert!(!raw.contains("$2"));
}

#[tokio::test]
async fn test_login_sets_httponly_cookie() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    let account = test_account("Cookie", None);
    let email = account["email"].as_str().unwrap();
    register(&client, &base_url, &account).await;

    let resp = login(&client, &base_url, email, "pw123").await;
    assert_eq!(resp.status(), 200);

    let set_cookie = resp
        .headers()
        .get("set-cookie")
        .expect("login must set a session cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("meru_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=None"));
    assert!(set_cookie.contains("Path=/"));
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    let account = test_account("Dup", None);
    register(&client, &base_url, &account).await;

    // Same email again, different case
    let mut second = account.clone();
    let email = account["email"].as_str().unwrap().to_uppercase();
    second["email"] = serde_json::json!(email);

    let resp = client
        .post(format!("{}/api/register", base_url))
        .json(&second)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "DUPLICATE_EMAIL");
}

#[tokio::test]
async fn test_concurrent_duplicate_registration() {
    let (base_url, _con) = spawn_test_server().await;

    let account = test_account("Race", None);
    let send = |account: serde_json::Value| {
        let base_url = base_url.clone();
        async move {
            client()
                .post(format!("{}/api/register", base_url))
                .json(&account)
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        }
    };

    // Exactly one of two simultaneous registrations may win
    let (a, b) = tokio::join!(send(account.clone()), send(account.clone()));
    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [201, 400]);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    let resp = client
        .post(format!("{}/api/register", base_url))
        .json(&serde_json::json!({"name": "NoEmail", "password": "pw123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "MISSING_FIELDS");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("email"));
    assert!(message.contains("phone"));
}

#[tokio::test]
async fn test_register_unknown_role_falls_back_to_customer() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    let account = test_account("Stranger", Some("Admin"));
    let email = account["email"].as_str().unwrap();
    register(&client, &base_url, &account).await;

    let resp = login(&client, &base_url, email, "pw123").await;
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/user-data", base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["role"], "Customer");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    let account = test_account("Enum", None);
    let email = account["email"].as_str().unwrap();
    register(&client, &base_url, &account).await;

    // Wrong password for an existing account
    let wrong_pw = login(&client, &base_url, email, "wrong").await;
    let wrong_pw_status = wrong_pw.status();
    let wrong_pw_body: serde_json::Value = wrong_pw.json().await.unwrap();

    // Account that does not exist
    let no_user = login(&client, &base_url, "nobody@test.example", "wrong").await;
    let no_user_status = no_user.status();
    let no_user_body: serde_json::Value = no_user.json().await.unwrap();

    // Identical observable outcome in both branches
    assert_eq!(wrong_pw_status, 401);
    assert_eq!(no_user_status, 401);
    assert_eq!(wrong_pw_body, no_user_body);
    assert_eq!(wrong_pw_body["error"]["code"], "INVALID_CREDENTIALS");
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_user_data_requires_session() {
    let (base_url, _con) = spawn_test_server().await;

    // No cookie at all
    let resp = reqwest::get(format!("{}/api/user-data", base_url))
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_garbage_session_token_rejected() {
    let (base_url, _con) = spawn_test_server().await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/user-data", base_url))
        .header("cookie", "meru_session=not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_logout_destroys_session() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    let account = test_account("Bye", None);
    let email = account["email"].as_str().unwrap();
    register(&client, &base_url, &account).await;

    let resp = login(&client, &base_url, email, "pw123").await;
    assert_eq!(resp.status(), 200);

    // Session works
    let resp = client
        .get(format!("{}/api/user-data", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Logout clears the cookie
    let resp = client
        .post(format!("{}/api/logout", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let set_cookie = resp
        .headers()
        .get("set-cookie")
        .expect("logout must clear the session cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    // Session no longer resolves
    let resp = client
        .get(format!("{}/api/user-data", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Logging out again is still a success (idempotent)
    let resp = client
        .post(format!("{}/api/logout", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

// ============================================================================
// Password Reset Tests
// ============================================================================

#[tokio::test]
async fn test_direct_reset_replaces_password() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    let account = test_account("Reset", None);
    let email = account["email"].as_str().unwrap();
    let phone = account["phone"].as_str().unwrap();
    register(&client, &base_url, &account).await;

    let resp = client
        .patch(format!("{}/api/auth/direct-reset", base_url))
        .json(&serde_json::json!({"phone": phone, "newPassword": "newpw456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    // The old password no longer authenticates
    let resp = login(&client, &base_url, email, "pw123").await;
    assert_eq!(resp.status(), 401);

    // The new one does
    let resp = login(&client, &base_url, email, "newpw456").await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_direct_reset_revokes_sessions() {
    let (base_url, _con) = spawn_test_server().await;
    let client = client();

    let account = test_account("Revoked", None);
    let email = account["email"].as_str().unwrap();
    let phone = account["phone"].as_str().unwrap();
    register(&client, &base_url, &account).await;

    let resp = login(&client, &base_url, email, "pw123").await;
    assert_eq!(resp.status(), 200);

    // Reset from a different client (no session required)
    let resp = reqwest::Client::new()
        .patch(format!("{}/api/auth/direct-reset", base_url))
        .json(&serde_json::json!({"phone": phone, "newPassword": "newpw456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The pre-reset session is gone
    let resp = client
        .get(format!("{}/api/user-data", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_direct_reset_unknown_phone() {
    let (base_url, _con) = spawn_test_server().await;

    let resp = reqwest::Client::new()
        .patch(format!("{}/api/auth/direct-reset", base_url))
        .json(&serde_json::json!({"phone": "0000000000", "newPassword": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_direct_reset_missing_fields() {
    let (base_url, _con) = spawn_test_server().await;

    let resp = reqwest::Client::new()
        .patch(format!("{}/api/auth/direct-reset", base_url))
        .json(&serde_json::json!({"phone": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "MISSING_FIELDS");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("phone"));
    assert!(message.contains("newPassword"));
}

// ============================================================================
// Transaction Storage Tests
// ============================================================================

fn test_transaction(user_id: &str, receipt: Option<&str>) -> StoredTransaction {
    StoredTransaction {
        id: nanoid::nanoid!(12),
        user_id: user_id.to_string(),
        kind: TransactionKind::Deposit,
        amount: 250.0,
        status: TransactionStatus::default(),
        receipt: receipt.map(|r| r.to_string()),
        description: DEFAULT_TRANSACTION_DESCRIPTION.to_string(),
        created_at: 0,
    }
}

#[tokio::test]
async fn test_transaction_receipt_is_sparse_unique() {
    let (_base_url, mut con) = spawn_test_server().await;

    let user_id = format!("txuser_{}", nanoid::nanoid!(8));
    let receipt = format!("RLE{}", nanoid::nanoid!(6));

    // First claim of the receipt number wins
    let tx = test_transaction(&user_id, Some(&receipt));
    let created = meru::storage::transaction::create_transaction(&mut con, &tx)
        .await
        .unwrap();
    assert!(created);

    // Second transaction with the same receipt is refused
    let dup = test_transaction(&user_id, Some(&receipt));
    let created = meru::storage::transaction::create_transaction(&mut con, &dup)
        .await
        .unwrap();
    assert!(!created);

    // The refused record left nothing behind
    let fetched = meru::storage::transaction::get_transaction(&mut con, &dup.id)
        .await
        .unwrap();
    assert!(fetched.is_none());

    // Receipt-less records are unconstrained
    for _ in 0..2 {
        let tx = test_transaction(&user_id, None);
        let created = meru::storage::transaction::create_transaction(&mut con, &tx)
            .await
            .unwrap();
        assert!(created);
    }

    let txs = meru::storage::transaction::list_user_transactions(&mut con, &user_id)
        .await
        .unwrap();
    assert_eq!(txs.len(), 3);
    assert_eq!(
        txs.iter().filter(|t| t.receipt.is_some()).count(),
        1,
        "only the first receipt-bearing transaction may exist"
    );
}

// ============================================================================
// Security Header Tests
// ============================================================================

#[tokio::test]
async fn test_security_headers_on_api() {
    let (base_url, _con) = spawn_test_server().await;

    let resp = reqwest::get(format!("{}/api/user-data", base_url))
        .await
        .unwrap();

    let headers = resp.headers();
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_some());
}
