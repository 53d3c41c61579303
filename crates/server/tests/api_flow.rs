use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use configs::AppConfig;
use server::AppState;
use service::storage::DocumentStore;

const ADMIN_EMAIL: &str = "boss@360ev.com";

fn build_app(dir: &std::path::Path) -> Router {
    let mut cfg = AppConfig::default();
    cfg.store.data_file = dir.join("data/data.json");
    cfg.uploads.upload_dir = dir.join("uploads");
    cfg.auth.secret_key = "test-secret".into();
    cfg.auth.super_admin_emails = vec![ADMIN_EMAIL.into()];
    let store = DocumentStore::from_config(&cfg.store).unwrap();
    server::app(AppState::new(store, cfg))
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(b) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn sign_up(app: &Router, email: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"email": email, "name": "Ayşe Kaya", "password": "gizli123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) =
        call(app, Method::POST, "/auth/login", None, Some(json!({"email": email, "password": "gizli123"}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

fn listing() -> Value {
    json!({
        "title": "Denizli Merkezefendi 3+1 Satılık Daire",
        "description": "Çarşıya yürüme mesafesinde, güney cepheli, doğalgazlı ve asansörlü binada geniş 3+1 daire.",
        "category": "residential",
        "listing_type": "sale",
        "price": 2450000,
        "city": "Denizli",
        "district": "Merkezefendi",
        "address": "Sırakapılar Mah. 1520 Sk. No: 4",
        "area": 145,
        "rooms": "3+1"
    })
}

#[tokio::test]
async fn listing_lifecycle_through_the_api() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());

    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let token = sign_up(&app, "ayse@360ev.com").await;

    let (status, body) = call(&app, Method::POST, "/api/properties", Some(&token), Some(listing())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["property"]["status"], "draft");
    let id = body["property"]["id"].as_str().unwrap().to_string();

    // Drafts stay out of search.
    let (_, body) = call(&app, Method::GET, "/api/search?city=Denizli", None, None).await;
    assert_eq!(body["total"], 0);

    let (status, body) = call(&app, Method::POST, &format!("/api/properties/{id}/publish"), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "publishing needs a scene: {body}");

    let scene = json!({"name": "Salon", "filename": "salon.jpg", "width": 4096, "height": 2048});
    let (status, body) =
        call(&app, Method::POST, &format!("/api/properties/{id}/scenes"), Some(&token), Some(scene)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["scene"]["name"], "Salon");

    let (status, body) = call(&app, Method::POST, &format!("/api/properties/{id}/publish"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["property"]["status"], "active");

    let (status, body) = call(&app, Method::GET, "/api/search?city=Denizli&with_tour=on&sort=price_asc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], id.as_str());

    // Anonymous views count, the owner's do not.
    let (_, body) = call(&app, Method::GET, &format!("/api/properties/{id}"), None, None).await;
    assert_eq!(body["property"]["views"], 1);
    assert_eq!(body["owner"]["email"], "ayse@360ev.com");
    let (_, body) = call(&app, Method::GET, &format!("/api/properties/{id}"), Some(&token), None).await;
    assert_eq!(body["property"]["views"], 1);

    let (_, body) = call(&app, Method::POST, &format!("/api/favorite/{id}"), Some(&token), None).await;
    assert_eq!(body["favorited"], true);
    let (_, body) = call(&app, Method::GET, "/api/favorites", Some(&token), None).await;
    assert_eq!(body["properties"].as_array().unwrap().len(), 1);

    let (_, body) = call(&app, Method::GET, "/api/me", Some(&token), None).await;
    assert_eq!(body["stats"]["total"], 1);
    assert_eq!(body["stats"]["with_tour"], 1);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/properties/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, &format!("/api/properties/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_users_cannot_edit_a_listing() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());
    let owner = sign_up(&app, "owner@360ev.com").await;
    let stranger = sign_up(&app, "stranger@360ev.com").await;

    let (_, body) = call(&app, Method::POST, "/api/properties", Some(&owner), Some(listing())).await;
    let id = body["property"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, Method::PUT, &format!("/api/properties/{id}"), Some(&stranger), Some(listing())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // A draft is invisible to anyone but its owner.
    let (status, _) = call(&app, Method::GET, &format!("/api/properties/{id}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auth_and_admin_gates() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());

    let (status, body) = call(&app, Method::POST, "/api/properties", None, Some(listing())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(&app, Method::GET, "/api/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = sign_up(&app, "user@360ev.com").await;
    let (status, _) = call(&app, Method::GET, "/admin/stats", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::GET, "/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = sign_up(&app, ADMIN_EMAIL).await;
    let (status, body) = call(&app, Method::GET, "/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["stats"]["total_users"], 2);

    let (status, body) = call(&app, Method::POST, "/auth/register", None,
        Some(json!({"email": "USER@360ev.com", "name": "Başka Biri", "password": "gizli123"}))).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (_, body) = call(&app, Method::GET, "/admin/users", Some(&admin), None).await;
    let user_id = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "user@360ev.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = call(&app, Method::POST, &format!("/admin/users/{user_id}/role"), Some(&admin),
        Some(json!({"role": "agent"}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["role"], "agent");
    let (status, _) = call(&app, Method::POST, &format!("/admin/users/{user_id}/role"), Some(&admin),
        Some(json!({"role": "emperor"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, Method::POST, &format!("/admin/users/{user_id}/toggle-status"), Some(&admin), None).await;
    assert_eq!(body["is_active"], false);
    let (status, _) = call(&app, Method::GET, "/api/me", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "disabled accounts lose access");
}

#[tokio::test]
async fn site_content_is_public_and_admin_editable() {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_app(tmp.path());
    let admin = sign_up(&app, ADMIN_EMAIL).await;

    let (status, _) = call(&app, Method::GET, "/api/pages/about", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::PUT, "/admin/pages/about", Some(&admin),
        Some(json!({"title": "Hakkımızda", "content": "360 derece sanal turlu ilanlar."}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, body) = call(&app, Method::GET, "/api/pages/about", None, None).await;
    assert_eq!(body["page"]["title"], "Hakkımızda");

    let (_, body) = call(&app, Method::PUT, "/admin/settings", Some(&admin), Some(json!({"site_name": "360 Emlak"}))).await;
    assert_eq!(body["settings"]["site_name"], "360 Emlak");
    let (_, body) = call(&app, Method::GET, "/api/settings", None, None).await;
    assert_eq!(body["settings"]["site_name"], "360 Emlak");

    let (_, body) = call(&app, Method::GET, "/admin/backups", Some(&admin), None).await;
    let backups = body["backups"].as_array().unwrap().clone();
    assert!(!backups.is_empty());
    let (status, _) = call(&app, Method::POST, "/admin/backups/restore", Some(&admin),
        Some(json!({"name": "../data.json"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
