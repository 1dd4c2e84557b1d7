//! End-to-end tests: the full application against the simulated portal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use twocold_core::{LegacySessionNavigator, MockPortal, MockPortalBuilder, PortalSettings};
use twocold_service::{AppState, Config, Controller, SecurityConfig, SetStatePolicy, app};
use twocold_store::{DeviceRegistry, default_records};
use twocold_types::{DeviceEdit, DeviceRecord, Floor};

struct Harness {
    dir: TempDir,
    portal: Arc<MockPortal>,
    state: Arc<AppState>,
}

impl Harness {
    fn new(policy: SetStatePolicy) -> Self {
        Self::with_config(policy, Config::default())
    }

    fn with_config(policy: SetStatePolicy, config: Config) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let portal = Arc::new(MockPortalBuilder::new().records(&default_records()).build());
        let navigator = LegacySessionNavigator::new(portal.clone(), PortalSettings::default());
        let registry = DeviceRegistry::open(dir.path().join("devices.json"));
        let controller = Controller::new(navigator, registry, policy);
        Self {
            dir,
            portal,
            state: AppState::new(controller, config),
        }
    }

    fn app(&self) -> Router {
        app(self.state.clone())
    }

    fn store_path(&self) -> std::path::PathBuf {
        self.dir.path().join("devices.json")
    }

    async fn call(&self, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, String) {
        call(self.app(), method, uri, body, None).await
    }
}

async fn call(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&str>,
    api_key: Option<&str>,
) -> (StatusCode, String) {
    let mut request = Request::builder().method(method).uri(uri);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    if let Some(key) = api_key {
        request = request.header("X-API-Key", key);
    }
    let request = request
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn enabled_of(body: &str, id: u32) -> bool {
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    json.as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"] == id)
        .unwrap()["enabled"]
        .as_bool()
        .unwrap()
}

#[tokio::test]
async fn test_first_list_seeds_registry_and_logs_in() {
    let h = Harness::new(SetStatePolicy::default());
    assert!(!h.store_path().exists());

    let (status, body) = h.call("GET", "/api/ac/list/8", None).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 14);
    assert!(h.store_path().exists());

    // Login page, then room selection, then the device list
    assert_eq!(h.portal.gets(), 1);
    assert_eq!(h.portal.logins(), 1);
    assert_eq!(h.portal.room_selections(), 1);

    let (_, body) = h.call("GET", "/api/ac/list/5", None).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 4);
    assert_eq!(h.portal.logins(), 1);
}

#[tokio::test]
async fn test_toggle_twice_restores_state() {
    let h = Harness::new(SetStatePolicy::default());
    let (_, before) = h.call("GET", "/api/ac/list/8", None).await;

    let (status, once) = h.call("POST", "/api/ac/toggle/8/10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(enabled_of(&once, 10), enabled_of(&before, 10));

    let (status, twice) = h.call("POST", "/api/ac/toggle/8/10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&twice).unwrap(),
        serde_json::from_str::<serde_json::Value>(&before).unwrap()
    );
    assert_eq!(h.portal.commands(), 2);
}

#[tokio::test]
async fn test_enable_when_already_on() {
    let skip = Harness::new(SetStatePolicy::SkipIfSatisfied);
    skip.portal.set_level(Floor::Fifth, 48, true);
    let (status, body) = skip.call("POST", "/api/ac/enable/5/10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(enabled_of(&body, 10));
    assert_eq!(skip.portal.commands(), 0);

    let always = Harness::new(SetStatePolicy::AlwaysPost);
    always.portal.set_level(Floor::Fifth, 48, true);
    let (status, body) = always.call("POST", "/api/ac/enable/5/10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(enabled_of(&body, 10));
    assert_eq!(always.portal.commands(), 1);
}

#[tokio::test]
async fn test_edit_persists_across_registries() {
    let h = Harness::new(SetStatePolicy::default());

    let (status, _) = h
        .call(
            "PATCH",
            "/api/ac/edit/5/14",
            Some(r#"{"name": "Stepan", "place": "Map room"}"#),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let mut fresh = DeviceRegistry::open(h.store_path());
    let record = fresh.get(Floor::Fifth, 14).unwrap();
    assert_eq!(record.name, "Stepan");
    assert_eq!(record.place, "Map room");
    assert_eq!(record.command_index, 72);
    assert_eq!(fresh.load().unwrap().len(), default_records().len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edit_and_list() {
    let h = Harness::new(SetStatePolicy::default());
    let expected = default_records().len();

    // Seed the file so readers have something to look at from the start
    h.state
        .controller
        .edit(Floor::Eighth, 3, &DeviceEdit::new("Kirill", "D&R"))
        .await
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let path = h.store_path();
        let done = done.clone();
        tokio::task::spawn_blocking(move || {
            let mut reads = 0;
            while !done.load(Ordering::Acquire) || reads == 0 {
                let bytes = std::fs::read(&path).unwrap();
                let stored: Vec<DeviceRecord> = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(stored.len(), expected);
                reads += 1;
            }
            reads
        })
    };

    let mut edits = Vec::new();
    for i in 0..20 {
        let state = h.state.clone();
        edits.push(tokio::spawn(async move {
            state
                .controller
                .edit(Floor::Eighth, 3, &DeviceEdit::new(format!("Kirill {i}"), "D&R"))
                .await
                .unwrap();
        }));
    }
    let lists = {
        let state = h.state.clone();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..5 {
                seen.push(state.controller.list(Floor::Eighth).await.unwrap());
            }
            seen
        })
    };

    for edit in edits {
        edit.await.unwrap();
    }
    let seen = lists.await.unwrap();
    done.store(true, Ordering::Release);
    assert!(reader.await.unwrap() > 0);

    for views in seen {
        assert_eq!(views.len(), 14);
        let kirill = views.iter().find(|v| v.id() == 3).unwrap();
        assert!(kirill.record.name.starts_with("Kirill"));
    }

    let content = std::fs::read_to_string(h.store_path()).unwrap();
    let stored: Vec<DeviceRecord> = serde_json::from_str(&content).unwrap();
    assert_eq!(stored.len(), expected);
    assert!(
        stored
            .iter()
            .find(|r| r.matches(Floor::Eighth, 3))
            .unwrap()
            .name
            .starts_with("Kirill ")
    );
}

#[tokio::test]
async fn test_concurrent_commands_share_one_session() {
    let h = Harness::new(SetStatePolicy::default());

    let mut handles = Vec::new();
    for id in [2, 3, 4, 5] {
        let state = h.state.clone();
        handles.push(tokio::spawn(async move {
            state.controller.enable(Floor::Eighth, id).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for command_index in [0, 6, 12, 18] {
        assert_eq!(h.portal.level(Floor::Eighth, command_index), Some(true));
    }
    assert_eq!(h.portal.logins(), 1);
}

#[tokio::test]
async fn test_portal_recovers_after_error_page() {
    let h = Harness::new(SetStatePolicy::default());
    h.call("GET", "/api/ac/list/8", None).await;

    h.portal.error_page_next(1);
    let (status, _) = h.call("GET", "/api/ac/list/8", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = h.call("POST", "/api/ac/enable/8/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.portal.level(Floor::Eighth, 0), Some(true));
}

#[tokio::test]
async fn test_api_key_required_when_enabled() {
    let mut config = Config::default();
    config.security = SecurityConfig {
        api_key_enabled: true,
        api_key: Some("0123456789abcdef".to_string()),
    };
    let h = Harness::with_config(SetStatePolicy::default(), config);

    let (status, _) = call(h.app(), "GET", "/api/ac/list/8", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.portal.gets(), 0);

    let (status, _) = call(h.app(), "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        h.app(),
        "GET",
        "/api/ac/list/8",
        None,
        Some("0123456789abcdef"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
