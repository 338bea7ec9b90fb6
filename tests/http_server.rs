//! HTTP server entrypoint under a runner.

use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::get;
use axum::{Extension, Router};
use entrypoint_runner::http::http_server;
use entrypoint_runner::lifecycle::{Runner, ShutdownTrigger};
use entrypoint_runner::options;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn start(router: Router) -> (SocketAddr, ShutdownTrigger, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let trigger = ShutdownTrigger::new();

    let runner = Runner::new(
        vec![http_server("api", listener, router)],
        [
            options::interruption_listener(trigger.clone()),
            options::shutdown_timeout(Duration::from_secs(5)),
        ],
    );
    let running = tokio::spawn(async move {
        runner.run().await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, trigger, running)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_serves_until_shutdown() {
    let router = Router::new().route("/", get(|| async { "ok" }));
    let (addr, trigger, running) = start(router).await;

    let res = client().get(format!("http://{}/", addr)).send().await.expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    trigger.trigger("test finished");
    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("runner did not finish")
        .unwrap();

    assert!(client().get(format!("http://{}/", addr)).send().await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_in_flight_request_drains_before_stop_returns() {
    let router = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            "done"
        }),
    );
    let (addr, trigger, running) = start(router).await;

    let request = tokio::spawn(async move {
        client()
            .get(format!("http://{}/slow", addr))
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    trigger.trigger("drain");

    let res = request.await.unwrap().expect("in-flight request was dropped");
    assert_eq!(res.text().await.unwrap(), "done");

    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("runner did not finish")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handlers_see_run_context() {
    let router = Router::new().route(
        "/context",
        get(|Extension(token): Extension<CancellationToken>| async move {
            if token.is_cancelled() {
                "cancelled"
            } else {
                "active"
            }
        }),
    );
    let (addr, trigger, running) = start(router).await;

    let res = client().get(format!("http://{}/context", addr)).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "active");

    trigger.trigger("done");
    running.await.unwrap();
}
