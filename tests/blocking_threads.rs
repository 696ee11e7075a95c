//! Blocking calls from several threads sharing one client
//!
//! The mock server runs on its own multi-thread runtime, so it keeps serving
//! while the calling threads block.

use armkit::arm::{ArmClient, ClientConfig, StaticTokenCredential};
use armkit::resource::Gettable;
use serde_json::json;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RG_PATH: &str = "/subscriptions/sub1/resourceGroups/rg1";

fn start_server(runtime: &tokio::runtime::Runtime) -> MockServer {
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RG_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": RG_PATH,
                "name": "rg1",
                "location": "westus2"
            })))
            .mount(&server)
            .await;
        server
    })
}

fn shared_client(server: &MockServer) -> Arc<ArmClient> {
    let config = ClientConfig::builder()
        .endpoint(&server.uri())
        .unwrap()
        .credential(Arc::new(StaticTokenCredential::new("test-token")))
        .build()
        .unwrap();
    Arc::new(ArmClient::new(config))
}

fn get_rg1(client: &ArmClient) -> bool {
    client
        .resource_group("sub1", "rg1")
        .and_then(|rg| rg.get_blocking())
        .and_then(|response| response.into_value())
        .map(|group| group.data().name == "rg1")
        .unwrap_or(false)
}

/// A thread that made a call and then idles must not stall another thread's call
#[test]
fn test_second_thread_not_stalled_by_idle_first_thread() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = start_server(&runtime);
    let client = shared_client(&server);

    let (first_done_tx, first_done_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let first = {
        let client = client.clone();
        thread::spawn(move || {
            first_done_tx.send(get_rg1(&client)).unwrap();
            // Stay alive with an idle runtime until the second call finished
            let _ = release_rx.recv();
        })
    };
    assert!(first_done_rx.recv_timeout(Duration::from_secs(10)).unwrap());

    let (second_done_tx, second_done_rx) = mpsc::channel();
    let second = {
        let client = client.clone();
        thread::spawn(move || {
            second_done_tx.send(get_rg1(&client)).unwrap();
        })
    };
    let second_ok = second_done_rx.recv_timeout(Duration::from_secs(10));

    release_tx.send(()).unwrap();
    first.join().unwrap();
    assert_eq!(second_ok, Ok(true), "second thread's blocking call did not complete");
    second.join().unwrap();
}

/// Repeated blocking calls on many threads all complete
#[test]
fn test_concurrent_blocking_calls() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = start_server(&runtime);
    let client = shared_client(&server);

    let (tx, rx) = mpsc::channel();
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                for _ in 0..3 {
                    tx.send(get_rg1(&client)).unwrap();
                }
            })
        })
        .collect();
    drop(tx);

    for _ in 0..12 {
        assert!(rx.recv_timeout(Duration::from_secs(10)).unwrap());
    }
    for worker in workers {
        worker.join().unwrap();
    }
}
