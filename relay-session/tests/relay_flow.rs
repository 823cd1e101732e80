//! End-to-end session flows through the orchestrator.

use async_trait::async_trait;
use relay_session::{
    Endpoint, Generate, GenerateOutcome, InferenceClient, InferenceOptions, Orchestrator, Persona,
    Speaker, TurnRecord,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stub client: first reply is "hey!", then "reply N". Counts calls.
#[derive(Default)]
struct ScriptedClient {
    calls: AtomicUsize,
}

#[async_trait]
impl Generate for ScriptedClient {
    async fn generate(&self, _endpoint: &Endpoint, _prompt: &str) -> GenerateOutcome {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            GenerateOutcome::Success("hey!".into())
        } else {
            GenerateOutcome::Success(format!("reply {n}"))
        }
    }
}

/// Stub client that flags overlapping calls.
#[derive(Default)]
struct OverlapDetector {
    in_flight: AtomicBool,
    overlapped: AtomicBool,
}

#[async_trait]
impl Generate for OverlapDetector {
    async fn generate(&self, _endpoint: &Endpoint, prompt: &str) -> GenerateOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.store(false, Ordering::SeqCst);
        GenerateOutcome::Success(format!("echo {}", prompt.len()))
    }
}

/// Stub client that only returns once two calls are waiting at once.
struct Rendezvous {
    barrier: Barrier,
}

#[async_trait]
impl Generate for Rendezvous {
    async fn generate(&self, _endpoint: &Endpoint, _prompt: &str) -> GenerateOutcome {
        self.barrier.wait().await;
        GenerateOutcome::Success("together".into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bind_chat_and_eviction() {
    let orch = Orchestrator::new(ScriptedClient::default(), Persona::default());

    orch.bind("paa", Some("https://abc.test")).await;
    assert!(orch.status("paa").await.contains("https://abc.test"));

    assert_eq!(orch.on_message("paa", "hello").await, "hey!");
    let snap = orch.sessions().snapshot("paa").await.unwrap();
    assert_eq!(snap.history.len(), 2);

    for i in 1..=11 {
        orch.on_message("paa", &format!("message {i}")).await;
    }
    assert_eq!(orch.client().calls.load(Ordering::SeqCst), 12);

    let snap = orch.sessions().snapshot("paa").await.unwrap();
    assert_eq!(snap.history.len(), 20);

    // 24 records appended, the first two exchanges evicted.
    let oldest = snap.history.iter().next().unwrap();
    assert_eq!(oldest, &TurnRecord::user("message 2"));

    let window = snap.history.window(6);
    assert_eq!(
        window,
        vec![
            TurnRecord::user("message 9"),
            TurnRecord::assistant("reply 9"),
            TurnRecord::user("message 10"),
            TurnRecord::assistant("reply 10"),
            TurnRecord::user("message 11"),
            TurnRecord::assistant("reply 11"),
        ]
    );
}

#[tokio::test]
async fn test_unbound_user_gets_guidance() {
    let orch = Orchestrator::new(ScriptedClient::default(), Persona::default());

    let reply = orch.on_message("fresh", "hello").await;

    assert_eq!(reply, orch.persona().replies.not_bound);
    assert_eq!(orch.client().calls.load(Ordering::SeqCst), 0);
    let snap = orch.sessions().snapshot("fresh").await.unwrap();
    assert!(snap.history.is_empty());
}

#[tokio::test]
async fn test_real_client_against_stub_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "hey!" })))
        .expect(2)
        .mount(&server)
        .await;

    let client =
        InferenceClient::new(InferenceOptions::default()).with_timeout(Duration::from_secs(5));
    let orch = Orchestrator::new(client, Persona::default());

    // Trailing slash is dropped before the API path is appended.
    orch.bind("paa", Some(&format!("{}/", server.uri()))).await;
    assert_eq!(orch.on_message("paa", "hello").await, "hey!");
    assert_eq!(orch.on_message("paa", "again").await, "hey!");

    let requests = server.received_requests().await.unwrap();
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let prompt = second["prompt"].as_str().unwrap();
    assert!(prompt.contains("Akhil (Paa): hello\n\nAdvi (You): hey!\n\nAkhil (Paa): again\nAdvi (You): "));
}

#[tokio::test]
async fn test_server_error_reply_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let orch = Orchestrator::new(
        InferenceClient::new(InferenceOptions::default()),
        Persona::default(),
    );
    orch.bind("paa", Some(&server.uri())).await;

    let reply = orch.on_message("paa", "hello").await;
    assert_eq!(reply, orch.persona().replies.server_error);

    let snap = orch.sessions().snapshot("paa").await.unwrap();
    let speakers: Vec<Speaker> = snap.history.iter().map(|t| t.speaker).collect();
    assert_eq!(speakers, vec![Speaker::User, Speaker::Assistant]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_turns_never_overlap() {
    let orch = Arc::new(Orchestrator::new(
        OverlapDetector::default(),
        Persona::default(),
    ));
    orch.bind("paa", Some("https://abc.test")).await;

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let orch = orch.clone();
            tokio::spawn(async move { orch.on_message("paa", &format!("m{i}")).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(!orch.client().overlapped.load(Ordering::SeqCst));

    let snap = orch.sessions().snapshot("paa").await.unwrap();
    assert_eq!(snap.history.len(), 10);
    for (i, turn) in snap.history.iter().enumerate() {
        let expected = if i % 2 == 0 {
            Speaker::User
        } else {
            Speaker::Assistant
        };
        assert_eq!(turn.speaker, expected);
    }
}

#[tokio::test]
async fn test_different_users_progress_concurrently() {
    let orch = Arc::new(Orchestrator::new(
        Rendezvous {
            barrier: Barrier::new(2),
        },
        Persona::default(),
    ));
    orch.bind("alice", Some("https://a.test")).await;
    orch.bind("bob", Some("https://b.test")).await;

    let a = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.on_message("alice", "hi").await })
    };
    let b = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.on_message("bob", "hi").await })
    };

    // Would hang if one user's call blocked the other.
    let (a, b) = tokio::time::timeout(Duration::from_secs(5), async {
        (a.await.unwrap(), b.await.unwrap())
    })
    .await
    .expect("users were serialised against each other");

    assert_eq!(a, "together");
    assert_eq!(b, "together");
}
