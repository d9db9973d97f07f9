//! Readiness probing and service lifecycle

use axum::{http::StatusCode, routing::get, Router};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use flowcheck_core::config::{LayoutConfig, RuntimeConfig};
use flowcheck_core::lifecycle::ReadinessProbe;
use flowcheck_core::{run_runtime, ActionTable, Error, RuntimeOptions, Workspace};

async fn serve_status(status: StatusCode) -> String {
    let app = Router::new().route("/health", get(move || async move { status }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn fast_probe(base_url: &str, timeout: Duration) -> ReadinessProbe {
    ReadinessProbe {
        probe_timeout: Duration::from_millis(500),
        interval: Duration::from_millis(100),
        ..ReadinessProbe::new(base_url, "/health", timeout)
    }
}

#[tokio::test]
async fn service_unavailable_times_out() {
    let base = serve_status(StatusCode::SERVICE_UNAVAILABLE).await;
    let err = fast_probe(&base, Duration::from_millis(600))
        .wait(Instant::now())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReadinessTimeout { .. }));
}

#[tokio::test]
async fn client_error_counts_as_ready() {
    let base = serve_status(StatusCode::from_u16(499).unwrap()).await;
    let elapsed = fast_probe(&base, Duration::from_secs(5))
        .wait(Instant::now())
        .await
        .unwrap();
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn bad_gateway_times_out() {
    let base = serve_status(StatusCode::BAD_GATEWAY).await;
    let started = Instant::now();
    let err = fast_probe(&base, Duration::from_millis(600))
        .wait(started)
        .await
        .unwrap_err();

    assert!(started.elapsed() >= Duration::from_millis(600));
    match err {
        Error::ReadinessTimeout { url, .. } => assert_eq!(url, format!("{}/health", base)),
        other => panic!("expected readiness timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn not_found_counts_as_ready() {
    let base = serve_status(StatusCode::NOT_FOUND).await;
    assert!(fast_probe(&base, Duration::from_secs(5))
        .wait(Instant::now())
        .await
        .is_ok());
}

#[cfg(unix)]
#[tokio::test]
async fn readiness_timeout_aborts_runtime_run() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("spec/starter-spec-v1.0.0/flows")).unwrap();
    std::fs::write(root.path().join("spec/VERSION"), "1.0.0").unwrap();
    std::fs::write(
        root.path().join("spec/starter-spec-v1.0.0/flows/health.yaml"),
        "steps:\n  - action: health_check\n",
    )
    .unwrap();

    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let runtime = RuntimeConfig {
        poll_interval_ms: 100,
        probe_timeout_ms: 200,
        shutdown_grace_ms: 1_000,
        ..Default::default()
    };
    let options = RuntimeOptions {
        base_url: format!("http://127.0.0.1:{}", port),
        start_cmd: Some("sleep 30".to_string()),
        wait_path: "/health".to_string(),
        wait_timeout: Duration::from_millis(500),
    };

    let started = Instant::now();
    let err = run_runtime(
        &Workspace::new(root.path(), LayoutConfig::default()),
        &ActionTable::canonical(),
        &runtime,
        &options,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::ReadinessTimeout { .. }));
    // The spawned `sleep 30` was stopped rather than waited out
    assert!(started.elapsed() < Duration::from_secs(10));
}

/// Running means present in /proc and not a zombie
#[cfg(target_os = "linux")]
fn is_running(pid: &str) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .map(|stat| {
            stat.rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn started_service_feeds_startup_slo_and_is_released() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("spec/starter-spec-v1.0.0/flows")).unwrap();
    std::fs::write(root.path().join("spec/VERSION"), "1.0.0").unwrap();
    std::fs::write(
        root.path().join("spec/starter-spec-v1.0.0/flows/health.yaml"),
        "steps:\n  - action: health_check\n    expect_status: 200\nslo:\n  max_startup_ms: 0.001\n",
    )
    .unwrap();

    // Ready only once the started command has recorded its pid
    let pid_file = root.path().join("service.pid");
    let marker = pid_file.clone();
    let app = Router::new().route(
        "/health",
        get(move || {
            let ready = marker.exists();
            async move {
                if ready {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let runtime = RuntimeConfig {
        poll_interval_ms: 100,
        shutdown_grace_ms: 1_000,
        ..Default::default()
    };
    let options = RuntimeOptions {
        base_url: format!("http://{}", addr),
        start_cmd: Some("echo $$ > service.pid.tmp && mv service.pid.tmp service.pid; exec sleep 30".to_string()),
        wait_path: "/health".to_string(),
        wait_timeout: Duration::from_secs(5),
    };

    let result = run_runtime(
        &Workspace::new(root.path(), LayoutConfig::default()),
        &ActionTable::canonical(),
        &runtime,
        &options,
    )
    .await
    .unwrap();

    assert!(result.startup_ms.is_some());
    assert_eq!(result.total_steps, 1);
    assert_eq!(result.failed_steps, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("health: startup "), "{}", result.errors[0]);
    assert!(result.errors[0].ends_with("exceeds max_startup_ms=0.001"));

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    assert!(!is_running(pid.trim()), "service {} still running", pid.trim());
}
