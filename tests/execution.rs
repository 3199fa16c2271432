//! Execution trigger: validate-then-submit and answer extraction.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{rag_workflow, MockExecutionBackend};
use flowforge::calls::{AuthContext, CallError, CallExecutor, CallPolicy};
use flowforge::execution::{ExecutionError, ExecutionTrigger};
use flowforge::graphs::Graph;
use flowforge::types::{NodeKind, Position, WorkflowId};
use serde_json::json;

fn trigger(backend: Arc<MockExecutionBackend>) -> ExecutionTrigger {
    let executor = CallExecutor::new(
        CallPolicy {
            timeout: Duration::from_millis(200),
            max_retries: 1,
            backoff_base: Duration::from_millis(1),
        },
        Arc::new(AuthContext::new()),
    );
    ExecutionTrigger::new(backend, executor)
}

#[tokio::test]
async fn valid_workflow_executes_and_extracts_the_answer() {
    let backend = Arc::new(MockExecutionBackend::with_payload(
        json!({"response": "the answer"}),
    ));
    let trigger = trigger(Arc::clone(&backend));

    let outcome = trigger
        .execute(&rag_workflow(), &WorkflowId::from("wf-1"), "question")
        .await
        .unwrap()
        .expect("not superseded");

    assert_eq!(outcome.answer, "the answer");
    assert_eq!(outcome.record.execution_id.as_deref(), Some("exec-42"));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn llm_response_is_the_fallback_answer_field() {
    let backend = Arc::new(MockExecutionBackend::with_payload(
        json!({"llm_response": "fallback answer"}),
    ));
    let trigger = trigger(backend);

    let outcome = trigger
        .execute(&rag_workflow(), &WorkflowId::from("wf-1"), "question")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.answer, "fallback answer");
}

#[tokio::test]
async fn inexecutable_workflow_never_reaches_the_backend() {
    let backend = Arc::new(MockExecutionBackend::new());
    let trigger = trigger(Arc::clone(&backend));

    // An engine with no path to any sink.
    let mut g = Graph::new();
    let q = g.add_node(NodeKind::QuerySource, Position::default());
    let l = g.add_node(NodeKind::ReasoningEngine, Position::default());
    let _o = g.add_node(NodeKind::ResultSink, Position::default());
    g.add_edge(&q, "out", &l, "in").unwrap();

    let err = trigger
        .execute(&g, &WorkflowId::from("wf-1"), "question")
        .await
        .unwrap_err();

    match err {
        ExecutionError::Validation { report } => {
            assert!(!report.valid);
            assert!(!report.reasons.is_empty());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(backend.call_count(), 0, "no network traffic on rejection");
}

#[tokio::test]
async fn terminal_backend_failure_surfaces_as_call_error() {
    let backend = Arc::new(MockExecutionBackend::new());
    backend.fail_with(CallError::Provider {
        status: 502,
        message: "bad gateway".into(),
    });
    backend.fail_with(CallError::Provider {
        status: 502,
        message: "bad gateway".into(),
    });
    let trigger = trigger(Arc::clone(&backend));

    let err = trigger
        .execute(&rag_workflow(), &WorkflowId::from("wf-1"), "question")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExecutionError::Call(CallError::Provider { status: 502, .. })
    ));
    assert_eq!(backend.call_count(), 2, "one retry before surfacing");
}
