//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p backdrop-api --test images_test`.

pub mod fixtures;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use axum_test::TestServer;
use backdrop_api::setup::{routes, services, validation};
use backdrop_api::state::AppState;
use backdrop_core::{BaseConfig, Config, ImageLimits, LogFormat, PhotoConfig, RemoteSourceConfig};
use tempfile::TempDir;

/// Test application: server, state and the photo directory it serves from.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub photos: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Drop a photo into the managed directory.
    pub fn add_photo(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.photos.path().join(name), bytes).expect("write photo");
    }
}

pub fn test_config(photos_dir: &Path) -> Config {
    Config {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            log_format: LogFormat::Pretty,
            http_concurrency_limit: 64,
        },
        photos: PhotoConfig {
            photos_dir: photos_dir.to_path_buf(),
            default_photo: "default.jpg".to_string(),
            catalog_enabled: true,
            manifest_path: None,
            download_url_template: "http://127.0.0.1:1/{id}".to_string(),
            download_concurrency: 1,
            gallery_title: "Telescope Background Gallery".to_string(),
        },
        remote: RemoteSourceConfig {
            enabled: true,
            allowlist: None,
            // Remote origins in tests listen on 127.0.0.1
            allow_private_ips: true,
            fetch_timeout: Duration::from_secs(5),
        },
        limits: ImageLimits {
            max_width: 2000,
            max_height: 3000,
            max_source_bytes: 10 * 1024 * 1024,
        },
    }
}

/// Setup a test app whose catalog holds only `default.jpg`.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup a test app after adjusting the default test configuration.
pub async fn setup_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let photos = tempfile::tempdir().expect("create photo dir");
    std::fs::write(
        photos.path().join("default.jpg"),
        fixtures::sample_jpeg(800, 533),
    )
    .expect("write default photo");

    let mut config = test_config(photos.path());
    customize(&mut config);

    validation::validate_config(&config)
        .await
        .expect("valid test config");
    let (state, _refresh) = services::initialize_services(&config)
        .await
        .expect("Failed to initialize services");
    let app = routes::setup_routes(&config, state.clone()).expect("Failed to build router");

    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        photos,
    }
}

/// Start a real HTTP server standing in for a remote image origin.
///
/// Returns its base URL, e.g. `http://127.0.0.1:49152`.
pub async fn spawn_origin(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind origin");
    let addr = listener.local_addr().expect("origin addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("origin server");
    });
    format!("http://{}", addr)
}

/// Origin serving `bytes` at `/photo.jpg`.
pub async fn spawn_photo_origin(bytes: Vec<u8>) -> String {
    let router = Router::new().route(
        "/photo.jpg",
        get(move || {
            let bytes = bytes.clone();
            async move { bytes }
        }),
    );
    spawn_origin(router).await
}
