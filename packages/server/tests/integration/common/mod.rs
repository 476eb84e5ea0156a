use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use journal_common::storage::filesystem::FilesystemPhotoStore;
use reqwest::Client;
use reqwest::header::HeaderMap;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Notify;

use journal_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, PolishConfig, RateLimitConfig,
    ServerConfig, StorageConfig,
};
use journal_server::polish::{PolishError, Polisher};
use journal_server::rate_limit::RateLimiter;
use journal_server::state::AppState;
use journal_server::utils::jwt::{self, JwtVerifier};

pub const TEST_SECRET: &str = "test-secret-for-integration-tests";

pub mod routes {
    pub const ENTRIES: &str = "/api/entries";
    pub const HEALTH: &str = "/health";

    pub fn entry(id: &str) -> String {
        format!("/api/entries/{id}")
    }

    pub fn polish(id: &str) -> String {
        format!("/api/entries/{id}/polish")
    }

    pub fn photos(id: &str) -> String {
        format!("/api/entries/{id}/photos")
    }

    pub fn photo_file(storage_path: &str) -> String {
        format!("/photos/{storage_path}")
    }

    pub fn page(limit: u64, cursor: Option<&str>, cursor_id: Option<&str>) -> String {
        let mut path = format!("/api/entries?limit={limit}");
        if let Some(cursor) = cursor {
            path.push_str(&format!("&cursor={cursor}"));
        }
        if let Some(cursor_id) = cursor_id {
            path.push_str(&format!("&cursor_id={cursor_id}"));
        }
        path
    }
}

/// What the stand-in polishing service does on each call.
#[derive(Clone)]
pub enum PolishMode {
    /// Wrap the raw text in `<p>`.
    Echo,
    /// Fail like an upstream 500.
    Fail,
    /// Never answer.
    Hang,
    /// Wait for the gate, then behave like `Echo`.
    Gated(Arc<Notify>),
}

pub struct ScriptedPolisher {
    mode: Mutex<PolishMode>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedPolisher {
    fn new() -> Self {
        Self {
            mode: Mutex::new(PolishMode::Echo),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: PolishMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Polisher for ScriptedPolisher {
    async fn polish(&self, raw_text: &str) -> Result<String, PolishError> {
        self.seen.lock().unwrap().push(raw_text.to_string());
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            PolishMode::Echo => Ok(format!("<p>{raw_text}</p>")),
            PolishMode::Fail => Err(PolishError::Status {
                status: 500,
                body: "upstream exploded".into(),
            }),
            PolishMode::Hang => std::future::pending().await,
            PolishMode::Gated(gate) => {
                gate.notified().await;
                Ok(format!("<p>{raw_text}</p>"))
            }
        }
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub polisher: Arc<ScriptedPolisher>,
    pub photo_root: PathBuf,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

fn test_config(dir: &TempDir) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: format!(
                "sqlite://{}?mode=rwc",
                dir.path().join("journal.db").display()
            ),
            max_connections: 1,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            audience: None,
        },
        polish: PolishConfig {
            api_key: "unused".to_string(),
            model: "test-model".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 10,
        },
        storage: StorageConfig {
            root: dir.path().join("photos").display().to_string(),
            max_photo_size: 64 * 1024,
        },
        rate_limit: RateLimitConfig {
            max_requests: 0,
            window_secs: 60,
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with configuration tweaks applied on top of the test defaults.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = test_config(&dir);
        configure(&mut config);

        let db = journal_server::database::init_db(&config.database)
            .await
            .expect("Failed to initialize test database");
        journal_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let photo_root = PathBuf::from(&config.storage.root);
        let photo_store =
            FilesystemPhotoStore::new(photo_root.clone(), config.storage.max_photo_size)
                .await
                .expect("Failed to create photo store");

        let polisher = Arc::new(ScriptedPolisher::new());

        let state = AppState {
            db: db.clone(),
            verifier: Arc::new(JwtVerifier::new(&config.auth)),
            polisher: polisher.clone(),
            photo_store: Arc::new(photo_store),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            config: Arc::new(config),
        };

        let app = journal_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            polisher,
            photo_root,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// A valid bearer token for `user_id`.
    pub fn token(&self, user_id: &str) -> String {
        jwt::sign(TEST_SECRET, user_id, None, chrono::Duration::hours(1))
            .expect("Failed to sign test token")
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_header(&self, path: &str, authorization: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", authorization)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_with_token(
        &self,
        path: &str,
        file_name: &str,
        mime: &str,
        file_bytes: Vec<u8>,
        token: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Create an entry via the API and return its `id`.
    pub async fn create_entry(&self, token: &str, raw_text: &str, date: Option<&str>) -> String {
        let mut body = serde_json::json!({ "raw_text": raw_text });
        if let Some(date) = date {
            body["date"] = Value::String(date.to_string());
        }
        let res = self.post_with_token(routes::ENTRIES, &body, token).await;
        assert_eq!(res.status, 201, "create_entry failed: {}", res.text);
        res.id()
    }

    /// Walk every page with the given size, returning entry ids in order.
    pub async fn collect_all_pages(&self, token: &str, limit: u64) -> Vec<String> {
        let mut ids = Vec::new();
        let mut cursor: Option<(String, String)> = None;
        for _ in 0..100 {
            let path = match &cursor {
                Some((date, id)) => routes::page(limit, Some(date), Some(id)),
                None => routes::page(limit, None, None),
            };
            let res = self.get_with_token(&path, token).await;
            assert_eq!(res.status, 200, "list failed: {}", res.text);
            let entries = res.entries();
            if entries.is_empty() {
                assert!(res.body["nextCursor"].is_null());
                return ids;
            }
            ids.extend(entries.iter().map(|e| e["id"].as_str().unwrap().to_string()));
            cursor = Some((
                res.body["nextCursor"].as_str().unwrap().to_string(),
                res.body["nextCursorId"].as_str().unwrap().to_string(),
            ));
        }
        panic!("pagination did not terminate");
    }

    /// Poll until the polisher has been called `n` times.
    pub async fn wait_for_polish_calls(&self, n: usize) {
        for _ in 0..500 {
            if self.polisher.calls() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("polisher was not called {n} times");
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain 'id'")
            .to_string()
    }

    pub fn entries(&self) -> Vec<Value> {
        self.body["entries"]
            .as_array()
            .expect("response body should contain 'entries'")
            .clone()
    }

    pub fn entry_texts(&self) -> Vec<String> {
        self.entries()
            .iter()
            .map(|e| e["raw_text"].as_str().unwrap().to_string())
            .collect()
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}
