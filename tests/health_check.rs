//! Health loop behaviour against live and dead backends.

use std::sync::Arc;
use std::time::Duration;

use downstream_balancer::{DownstreamServer, LoadBalancer};

mod common;

fn spawn_health_loop(balancer: &Arc<LoadBalancer>) -> tokio::task::JoinHandle<()> {
    let balancer = Arc::clone(balancer);
    tokio::spawn(async move {
        balancer.start_health_loop().await.unwrap();
    })
}

fn balancer(address: &str, endpoint: &str) -> Arc<LoadBalancer> {
    let servers = vec![Arc::new(DownstreamServer::new(address, endpoint))];
    Arc::new(LoadBalancer::new(servers, common::settings(Duration::from_millis(100))).unwrap())
}

#[tokio::test]
async fn invalid_server_becomes_unhealthy() {
    let lb = balancer("invalid", "/");
    let running = spawn_health_loop(&lb);

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(!lb.servers()[0].is_healthy());

    lb.stop_health_loop().await;
    running.await.unwrap();
}

#[tokio::test]
async fn reachable_server_flips_with_reachability() {
    let backend = common::start_mock_backend("ok").await;
    let lb = balancer(&backend.url(), "/");
    lb.servers()[0].mark_unhealthy();
    let running = spawn_health_loop(&lb);

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(lb.servers()[0].is_healthy(), "reachable server should recover");

    // Becoming unavailable
    backend.stop().await;
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(!lb.servers()[0].is_healthy(), "stopped server should be unhealthy");

    lb.stop_health_loop().await;
    running.await.unwrap();
}

#[tokio::test]
async fn error_status_still_counts_as_reachable() {
    let backend = common::start_programmable_backend(|| async { (500, "broken".to_string()) }).await;
    let lb = balancer(&backend.url(), "/");
    lb.servers()[0].mark_unhealthy();
    let running = spawn_health_loop(&lb);

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(lb.servers()[0].is_healthy());

    lb.stop_health_loop().await;
    running.await.unwrap();
}

#[tokio::test]
async fn probes_target_the_endpoint_suffix() {
    let (backend, seen) = common::start_recording_backend().await;
    let lb = balancer(&backend.url(), "/health/check");
    let running = spawn_health_loop(&lb);

    tokio::time::sleep(Duration::from_millis(250)).await;
    lb.stop_health_loop().await;
    running.await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty(), "at least one probe should have fired");
    assert!(seen.iter().all(|path| path == "/health/check"));
}

#[tokio::test]
async fn no_flag_changes_after_stop() {
    let backend = common::start_mock_backend("ok").await;
    let lb = balancer(&backend.url(), "/");
    let running = spawn_health_loop(&lb);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(lb.servers()[0].is_healthy());

    lb.stop_health_loop().await;
    running.await.unwrap();
    assert!(!lb.is_health_loop_running());

    backend.stop().await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(lb.servers()[0].is_healthy(), "no probe may run after the stop handshake");
}

#[tokio::test]
async fn probes_run_concurrently() {
    // A silent server must not delay the verdict on a dead one.
    let silent = common::start_silent_backend().await;
    let dead = common::closed_addr().await;

    let servers = DownstreamServer::from_addresses([silent.url(), format!("http://{}", dead)], "/");
    let settings = downstream_balancer::load_balancer::BalancerSettings {
        health_check_timeout: Duration::from_secs(5),
        ..common::settings(Duration::from_millis(100))
    };
    let lb = Arc::new(LoadBalancer::new(servers, settings).unwrap());
    let running = spawn_health_loop(&lb);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!lb.servers()[1].is_healthy());
    assert!(lb.servers()[0].is_healthy(), "silent probe has not timed out yet");

    lb.stop_health_loop().await;
    running.await.unwrap();
}
