mod common;

use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Level;

#[tokio::test]
async fn test_main_server_startup() {
    let _ = tracing_subscriber::fmt().with_max_level(Level::INFO).try_init();

    let test_app = common::test_app().await;
    let app = test_app.router();
    // Port 0: let the OS pick a free port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_task: JoinHandle<()> = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::new();
    let health = client.get(format!("http://{}/health", addr)).send().await;
    let articles = client.get(format!("http://{}/articles", addr)).send().await;

    server_task.abort();

    let health = health.expect("server did not respond");
    assert!(health.status().is_success());
    let articles: serde_json::Value = articles.expect("server did not respond").json().await.unwrap();
    assert_eq!(articles, serde_json::json!([]));
}
