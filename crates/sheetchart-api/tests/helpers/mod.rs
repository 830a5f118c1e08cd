//! Test helpers: build AppState and router for integration tests.
//!
//! Records live in `MemoryStore` and uploads in a `LocalStorage` rooted in a
//! temporary directory, so no database is needed.
#![allow(dead_code)]

pub mod auth;
pub mod fixtures;

use axum::Router;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use sheetchart_api::setup::routes;
use sheetchart_api::state::AppState;
use sheetchart_core::AppConfig;
use sheetchart_db::MemoryStore;
use sheetchart_storage::{LocalStorage, Storage};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

use auth::{TestUser, TEST_JWT_SECRET};

/// Upload limit used by the test app (bytes).
pub const TEST_MAX_FILE_SIZE: usize = 256 * 1024;

pub struct TestApp {
    pub server: TestServer,
    /// The same router, for tests that need a real socket.
    pub router: Router,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of objects currently in the upload directory.
    pub fn stored_object_count(&self) -> usize {
        std::fs::read_dir(self._temp_dir.path())
            .expect("read upload dir")
            .count()
    }

    pub async fn upload(&self, user: &TestUser, name: &str, mime: &str, data: Vec<u8>) -> TestResponse {
        let form = MultipartForm::new()
            .add_part("excel", Part::bytes(data).file_name(name).mime_type(mime));
        self.server
            .post("/files/upload")
            .add_header("Authorization", user.bearer())
            .multipart(form)
            .await
    }

    pub async fn get(&self, user: &TestUser, path: &str) -> TestResponse {
        self.server
            .get(path)
            .add_header("Authorization", user.bearer())
            .await
    }

    pub async fn post(&self, user: &TestUser, path: &str) -> TestResponse {
        self.server
            .post(path)
            .add_header("Authorization", user.bearer())
            .await
    }
}

/// Setup test app with in-memory records and temp-dir storage.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let mut env = HashMap::new();
    env.insert("JWT_SECRET", TEST_JWT_SECRET.to_string());
    env.insert("UPLOAD_DIR", temp_dir.path().display().to_string());
    env.insert("MAX_FILE_SIZE", TEST_MAX_FILE_SIZE.to_string());
    let config =
        AppConfig::from_lookup(|key| env.get(key).cloned()).expect("Failed to build test config");

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path())
            .await
            .expect("Failed to create local storage"),
    );
    let store = MemoryStore::new();
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(store.clone()),
        Arc::new(store),
        storage,
    ));

    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(router.clone()).expect("Failed to start test server");

    TestApp {
        server,
        router,
        state,
        _temp_dir: temp_dir,
    }
}
