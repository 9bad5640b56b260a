use push_relay::config::{AppConfig, FcmConfig, ServerConfig};
use push_relay::services::{MockPushProvider, PushProvider};
use push_relay::startup::Application;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_provider(Arc::new(MockPushProvider::new(true))).await
    }

    pub async fn spawn_with_provider(provider: Arc<dyn PushProvider>) -> Self {
        // Use random port for testing (port 0)
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            fcm: FcmConfig {
                project_id: "test-project".to_string(),
                credentials_path: "unused.json".to_string(),
                enabled: false, // Use mock
            },
        };

        let app = Application::build_with_provider(config, provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp { address, port }
    }
}
