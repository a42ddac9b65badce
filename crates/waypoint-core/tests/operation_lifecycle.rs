//! Pause / resume / cancel scenarios against the real substrate.

mod common;

use std::sync::Arc;

use common::{Gate, MemoryEngine, Named, chain_of, config, memory_stores};
use serde_json::{Value, json};
use waypoint_core::Engine;
use waypoint_core::chain;
use waypoint_core::operation::memory::InMemoryOperationRepository;
use waypoint_core::operation::service::{MSG_CANCEL_REQUIRES_PAUSE, MSG_NOT_PAUSED};
use waypoint_core::operation::steps::completion;
use waypoint_core::operation::PayloadStore;
use waypoint_types::chain::{Chain, StepSignature};
use waypoint_types::error::RepositoryError;
use waypoint_types::operation::{Operation, OperationId, OperationStatus};

async fn operation(engine: &MemoryEngine, id: OperationId) -> Operation {
    engine.service().get(id).await.unwrap().unwrap()
}

async fn persisted_chain(engine: &MemoryEngine, op: &Operation) -> Chain {
    let location = op.pending_workflow_location.as_deref().unwrap();
    let value = engine.service().payloads().load(location).await.unwrap();
    chain::deserialize(value, engine.service().registry()).unwrap()
}

#[tokio::test]
async fn two_step_chain_without_pause_completes() {
    let (repo, payloads) = memory_stores();
    let engine = Engine::builder(repo, payloads).config(config(1)).start();

    let id = engine
        .service()
        .start(
            "alice",
            |id| {
                Chain::default()
                    .then(StepSignature::new("add").arg(1))
                    .then(StepSignature::new("mult").arg(2))
                    .then(completion(id))
            },
            json!(5),
        )
        .await
        .unwrap();
    engine.wait_idle().await;

    let op = operation(&engine, id).await;
    assert_eq!(op.status, OperationStatus::Completed);
    assert_eq!(op.result, Some(json!(12)));
    assert!(op.pending_workflow_location.is_none());
    engine.shutdown().await;
}

#[tokio::test]
async fn pause_requested_before_start_stops_at_first_checkpoint() {
    let gate = Gate::new();
    let (repo, payloads) = memory_stores();
    let engine = Engine::builder(repo, payloads)
        .config(config(2))
        .step(Named::gated("step1", &gate))
        .step(Named::new("step2"))
        .step(Named::new("step3"))
        .step(Named::new("step4"))
        .start();

    let id = engine
        .service()
        .start("alice", |_| chain_of(&["step1", "step2", "step3", "step4"]), Value::Null)
        .await
        .unwrap();
    let outcome = engine.service().pause(&id.encode()).await.unwrap();
    assert!(outcome.success);
    gate.release(1);
    engine.wait_idle().await;

    let op = operation(&engine, id).await;
    assert_eq!(op.status, OperationStatus::Paused);
    assert_eq!(op.result, Some(json!(["step1", "step2"])));
    let remaining = persisted_chain(&engine, &op).await;
    assert_eq!(remaining.step_names(), vec!["step3", "step4"]);
    engine.shutdown().await;
}

#[tokio::test]
async fn resume_continues_from_the_persisted_state() {
    let gate = Gate::new();
    let (repo, payloads) = memory_stores();
    let engine = Engine::builder(repo, payloads)
        .config(config(1))
        .step(Named::gated("step1", &gate))
        .step(Named::new("step2"))
        .start();

    let id = engine
        .service()
        .start("alice", |id| chain_of(&["step1", "step2"]).then(completion(id)), Value::Null)
        .await
        .unwrap();
    engine.service().pause(&id.encode()).await.unwrap();
    gate.release(1);
    engine.wait_idle().await;
    assert_eq!(operation(&engine, id).await.status, OperationStatus::Paused);

    let outcome = engine.service().resume(&id.encode()).await.unwrap();
    assert!(outcome.success, "{outcome:?}");
    engine.wait_idle().await;

    let op = operation(&engine, id).await;
    assert_eq!(op.status, OperationStatus::Completed);
    assert_eq!(op.result, Some(json!(["step1", "step2"])));
    engine.shutdown().await;
}

#[tokio::test]
async fn repeated_resume_and_pause_shrinks_remaining_chain_to_completion() {
    let gate = Gate::new();
    let names = ["s1", "s2", "s3", "s4", "s5", "s6"];
    let (repo, payloads) = memory_stores();
    let mut builder = Engine::builder(repo, payloads).config(config(1));
    for name in names {
        builder = builder.step(Named::gated(name, &gate));
    }
    let engine = builder.start();

    let id = engine
        .service()
        .start("alice", |id| chain_of(&names).then(completion(id)), Value::Null)
        .await
        .unwrap();
    let encoded = id.encode();
    engine.service().pause(&encoded).await.unwrap();
    gate.release(1);
    engine.wait_idle().await;

    let mut previous = usize::MAX;
    loop {
        let op = operation(&engine, id).await;
        if op.status == OperationStatus::Completed {
            break;
        }
        assert_eq!(op.status, OperationStatus::Paused);
        let remaining = persisted_chain(&engine, &op).await.without_checkpoints().len();
        assert!(remaining < previous, "remaining chain did not shrink");
        assert!(remaining > 0);
        previous = remaining;

        assert!(engine.service().resume(&encoded).await.unwrap().success);
        assert!(engine.service().pause(&encoded).await.unwrap().success);
        gate.release(1);
        engine.wait_idle().await;
    }

    assert_eq!(previous, 1, "last pause should leave only the completion step");
    let op = operation(&engine, id).await;
    assert_eq!(op.result, Some(json!(names)));
    engine.shutdown().await;
}

#[tokio::test]
async fn pause_after_last_checkpoint_completes_instead() {
    let gate = Gate::new();
    let (repo, payloads) = memory_stores();
    let engine = Engine::builder(repo, payloads)
        .config(config(2))
        .step(Named::new("s1"))
        .step(Named::new("s2"))
        .step(Named::gated("s3", &gate))
        .start();

    // Only marker sits after s2; completion is last.
    let id = engine
        .service()
        .start("alice", |id| chain_of(&["s1", "s2", "s3"]).then(completion(id)), Value::Null)
        .await
        .unwrap();
    gate.entered().await;
    assert!(engine.service().pause(&id.encode()).await.unwrap().success);
    gate.release(1);
    engine.wait_idle().await;

    let op = operation(&engine, id).await;
    assert_eq!(op.status, OperationStatus::Completed);
    assert_eq!(op.result, Some(json!(["s1", "s2", "s3"])));
    engine.shutdown().await;
}

#[tokio::test]
async fn interval_at_least_chain_length_never_pauses() {
    let gate = Gate::new();
    let (repo, payloads) = memory_stores();
    let engine = Engine::builder(repo, payloads)
        .config(config(10))
        .step(Named::gated("s1", &gate))
        .step(Named::new("s2"))
        .start();

    let id = engine
        .service()
        .start("alice", |id| chain_of(&["s1", "s2"]).then(completion(id)), Value::Null)
        .await
        .unwrap();
    engine.service().pause(&id.encode()).await.unwrap();
    gate.release(1);
    engine.wait_idle().await;

    assert_eq!(operation(&engine, id).await.status, OperationStatus::Completed);
    engine.shutdown().await;
}

#[tokio::test]
async fn cancel_only_from_paused() {
    let gate = Gate::new();
    let (repo, payloads) = memory_stores();
    let engine = Engine::builder(repo, payloads)
        .config(config(1))
        .step(Named::gated("s1", &gate))
        .step(Named::new("s2"))
        .start();

    let id = engine
        .service()
        .start("alice", |id| chain_of(&["s1", "s2"]).then(completion(id)), Value::Null)
        .await
        .unwrap();
    let encoded = id.encode();

    let early = engine.service().cancel(&encoded).await.unwrap();
    assert!(!early.success);
    assert_eq!(early.message.as_deref(), Some(MSG_CANCEL_REQUIRES_PAUSE));

    engine.service().pause(&encoded).await.unwrap();
    gate.release(1);
    engine.wait_idle().await;

    assert!(engine.service().cancel(&encoded).await.unwrap().success);
    assert_eq!(operation(&engine, id).await.status, OperationStatus::Cancelled);

    let resume = engine.service().resume(&encoded).await.unwrap();
    assert_eq!(resume.message.as_deref(), Some(MSG_NOT_PAUSED));
    engine.shutdown().await;
}

#[tokio::test]
async fn corrupt_workflow_rejects_resume_and_stays_paused() {
    let gate = Gate::new();
    let (repo, payloads) = memory_stores();
    let engine = Engine::builder(repo, Arc::clone(&payloads))
        .config(config(1))
        .step(Named::gated("s1", &gate))
        .step(Named::new("s2"))
        .start();

    let id = engine
        .service()
        .start("alice", |id| chain_of(&["s1", "s2"]).then(completion(id)), Value::Null)
        .await
        .unwrap();
    let encoded = id.encode();
    engine.service().pause(&encoded).await.unwrap();
    gate.release(1);
    engine.wait_idle().await;

    let op = operation(&engine, id).await;
    let location = op.pending_workflow_location.clone().unwrap();
    let good = payloads.load(&location).await.unwrap();
    payloads.replace(&location, json!([{"step_name": "no_such_step"}]));

    let outcome = engine.service().resume(&encoded).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.message.unwrap().contains("corrupt"));
    assert_eq!(operation(&engine, id).await.status, OperationStatus::Paused);

    // Retry once the payload is fixed.
    payloads.replace(&location, good);
    assert!(engine.service().resume(&encoded).await.unwrap().success);
    engine.wait_idle().await;
    assert_eq!(operation(&engine, id).await.status, OperationStatus::Completed);
    engine.shutdown().await;
}

/// Payload store whose running-value writes always fail.
#[derive(Default)]
struct BrokenResults {
    inner: waypoint_core::operation::memory::InMemoryPayloadStore,
}

impl PayloadStore for BrokenResults {
    async fn save_workflow(&self, id: OperationId, workflow: &Value) -> Result<String, RepositoryError> {
        self.inner.save_workflow(id, workflow).await
    }

    async fn save_result(&self, _id: OperationId, _result: &Value) -> Result<String, RepositoryError> {
        Err(RepositoryError::Storage("disk full".to_string()))
    }

    async fn load(&self, location: &str) -> Result<Value, RepositoryError> {
        self.inner.load(location).await
    }
}

#[tokio::test]
async fn failed_pause_write_leaves_operation_requesting_pause() {
    let gate = Gate::new();
    let repo = Arc::new(InMemoryOperationRepository::new());
    let engine = Engine::builder(Arc::clone(&repo), Arc::new(BrokenResults::default()))
        .config(config(1))
        .step(Named::gated("s1", &gate))
        .step(Named::new("s2"))
        .start();

    let id = engine
        .service()
        .start("alice", |_| chain_of(&["s1", "s2"]), Value::Null)
        .await
        .unwrap();
    let encoded = id.encode();
    engine.service().pause(&encoded).await.unwrap();
    gate.release(1);
    engine.wait_idle().await;

    let op = engine.service().get(id).await.unwrap().unwrap();
    assert_eq!(op.status, OperationStatus::RequestingPause);
    assert!(op.pending_workflow_location.is_none());

    let resume = engine.service().resume(&encoded).await.unwrap();
    assert_eq!(resume.message.as_deref(), Some(MSG_NOT_PAUSED));
    engine.shutdown().await;
}
