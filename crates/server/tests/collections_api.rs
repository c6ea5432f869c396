use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use configs::AppConfig;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

const ADMIN_KEY: &str = "test-admin-key";

struct TestApp {
    base_url: String,
    root: PathBuf,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn start_server(require_key: bool) -> anyhow::Result<TestApp> {
    // Use isolated temp directories per test run
    let root = std::env::temp_dir().join(format!("cms_e2e_{}", Uuid::new_v4()));
    let path = |p: &str| root.join(p).to_string_lossy().into_owned();

    let mut cfg = AppConfig::default();
    cfg.static_dir = path("public");
    cfg.storage.data_dir = path("data");
    cfg.storage.local_dir = path("data/local");
    cfg.auth.api_keys_file = path("data/auth/api_keys.json");
    cfg.auth.require_api_key_for_writes = require_key;
    cfg.auth.bootstrap_key = Some(ADMIN_KEY.into());
    cfg.normalize_and_validate()?;

    tokio::fs::create_dir_all(root.join("public")).await?;
    tokio::fs::write(root.join("public/index.html"), "<h1>results</h1>").await?;

    let app = server::startup::build_app(&cfg).await?;
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url, root })
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn e2e_health_and_static_site() -> anyhow::Result<()> {
    let app = start_server(true).await?;
    let res = client().get(app.url("/health")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "Operational");

    let res = client().get(app.url("/index.html")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert!(res.text().await?.contains("results"));
    Ok(())
}

#[tokio::test]
async fn e2e_document_round_trip_and_overwrite() -> anyhow::Result<()> {
    let app = start_server(true).await?;
    let c = client();

    // never written
    let res = c.get(app.url("/collections/results")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!([]));

    let res = c
        .post(app.url("/collections/results"))
        .header("X-API-Key", ADMIN_KEY)
        .json(&json!([{"a": 1}]))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap_or_default().contains("results"));

    let got = c.get(app.url("/collections/results")).send().await?.json::<Value>().await?;
    assert_eq!(got, json!([{"a": 1}]));

    // stored pretty-printed as the whole file
    let text = tokio::fs::read_to_string(app.root.join("data/results.json")).await?;
    assert_eq!(text, "[\n  {\n    \"a\": 1\n  }\n]");

    c.post(app.url("/collections/results"))
        .query(&[("api_key", ADMIN_KEY)])
        .json(&json!([]))
        .send()
        .await?
        .error_for_status()?;
    let got = c.get(app.url("/collections/results")).send().await?.json::<Value>().await?;
    assert_eq!(got, json!([]));
    Ok(())
}

#[tokio::test]
async fn e2e_corrupt_document_is_500_not_empty() -> anyhow::Result<()> {
    let app = start_server(true).await?;
    tokio::fs::write(app.root.join("data/broken.json"), "[{\"cut\":").await?;

    let res = client().get(app.url("/collections/broken")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json::<Value>().await?;
    assert_eq!(body, json!({"success": false, "message": "Retrieval failure."}));
    Ok(())
}

#[tokio::test]
async fn e2e_legacy_endpoints_and_public_files() -> anyhow::Result<()> {
    let app = start_server(true).await?;
    let c = client();

    let res = c.get(app.url("/data/military-results.json")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    let got = c.get(app.url("/api/get-json")).send().await?.json::<Value>().await?;
    assert_eq!(got, json!([]));

    let military = json!({"exams": [{"results": [{"reg": "M-1"}]}]});
    c.post(app.url("/api/save-json"))
        .header("X-API-Key", ADMIN_KEY)
        .json(&military)
        .send()
        .await?
        .error_for_status()?;
    assert_eq!(c.get(app.url("/api/get-json")).send().await?.json::<Value>().await?, military);
    assert_eq!(c.get(app.url("/collections/military-results")).send().await?.json::<Value>().await?, military);

    let published = json!({"exams": [{"results": [{"reg": "P-9", "total": 512}]}]});
    let res = c
        .post(app.url("/api/upload"))
        .header("X-API-Key", ADMIN_KEY)
        .json(&published)
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let res = c.get(app.url("/data/published-results.json")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.headers().get("cache-control").and_then(|v| v.to_str().ok()), Some("no-store"));
    assert_eq!(res.json::<Value>().await?, published);

    // the key file lives outside the document namespace
    let res = c.get(app.url("/data/api_keys.json")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn e2e_open_writes_when_configured() -> anyhow::Result<()> {
    let app = start_server(false).await?;
    let res = client()
        .post(app.url("/collections/news"))
        .json(&json!({"items": []}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn e2e_bookings_lifecycle() -> anyhow::Result<()> {
    let app = start_server(true).await?;
    let c = client();

    let res = c.post(app.url("/api/bookings")).json(&json!({"name": "nobody"})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);

    let mut ids = Vec::new();
    for name in ["Asha", "Ravi"] {
        let res = c
            .post(app.url("/api/bookings"))
            .header("X-API-Key", ADMIN_KEY)
            .json(&json!({"name": name, "subject": "Maths"}))
            .send()
            .await?;
        assert_eq!(res.status(), HttpStatusCode::CREATED);
        let saved = res.json::<Value>().await?;
        assert!(saved["createdAt"].is_string());
        ids.push(saved["id"].as_str().unwrap_or_default().to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let list = c.get(app.url("/api/bookings")).send().await?.json::<Vec<Value>>().await?;
    let names: Vec<_> = list.iter().map(|b| b["name"].as_str().unwrap_or_default()).collect();
    assert_eq!(names, vec!["Ravi", "Asha"]);

    let stats = c.get(app.url("/api/bookings/stats")).send().await?.json::<Value>().await?;
    assert_eq!(stats, json!({"total": 2, "recent": 2}));

    let res = c
        .delete(app.url(&format!("/api/bookings/{}", ids[0])))
        .header("X-API-Key", ADMIN_KEY)
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);
    let res = c
        .delete(app.url(&format!("/api/bookings/{}", ids[0])))
        .header("X-API-Key", ADMIN_KEY)
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);

    let stats = c.get(app.url("/api/bookings/stats")).send().await?.json::<Value>().await?;
    assert_eq!(stats["total"], 1);

    // bookings persist in the local directory under the prefixed key
    assert!(tokio::fs::metadata(app.root.join("data/local/mhm_cms_bookings.json")).await?.is_file());
    Ok(())
}

#[tokio::test]
async fn e2e_admin_key_management() -> anyhow::Result<()> {
    let app = start_server(true).await?;
    let c = client();

    let res = c.get(app.url("/admin/api-keys")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);

    let list = c
        .get(app.url("/admin/api-keys"))
        .header("X-API-Key", ADMIN_KEY)
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(list, json!([{"user": "admin", "api_key": "****-key"}]));

    let res = c
        .post(app.url("/admin/api-keys"))
        .header("X-API-Key", ADMIN_KEY)
        .json(&json!({"user": "editor", "api_key": "editor-key"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    // the new key can write
    let res = c
        .post(app.url("/collections/results"))
        .header("X-API-Key", "editor-key")
        .json(&json!([]))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let res = c
        .delete(app.url("/admin/api-keys/editor"))
        .header("X-API-Key", ADMIN_KEY)
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);

    let res = c
        .post(app.url("/collections/results"))
        .header("X-API-Key", "editor-key")
        .json(&json!([]))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);
    Ok(())
}
