//! Non-Streaming Fallback Integration Tests
//!
//! Turns served by the query endpoint, either because streaming is disabled
//! or because the agent does not offer it.

use doc_chat::{AppError, AttachedDocument, ChatConfig, SessionStatus, TurnOutcome};
use doc_chat_agent::{AgentError, QueryResponse};

use super::support::*;

fn contract_response() -> QueryResponse {
    QueryResponse {
        success: true,
        answer: "Net 30".to_string(),
        citations: vec![citation("contract.pdf", "Payment due in 30 days", Some(0.9))],
        session_id: Some("s1".to_string()),
        processing_time_ms: Some(1200.0),
        error: None,
    }
}

#[tokio::test]
async fn test_streaming_disabled_uses_query_endpoint() {
    let agent = ScriptedAgent::new();
    agent.push_response(Ok(contract_response()));
    let config = ChatConfig {
        streaming_enabled: false,
        ..config()
    };
    let controller = controller_with(&agent, config);
    controller
        .open_single(AttachedDocument::new("contract.pdf"))
        .await;

    let outcome = controller
        .send("payment terms?", None)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let message = match outcome {
        TurnOutcome::Completed(message) => message,
        other => panic!("Expected Completed, got {:?}", other),
    };
    assert_eq!(message.content, "Net 30");
    let metadata = message.metadata.unwrap();
    assert_eq!(metadata.confidence_score, 0.9);
    assert_eq!(metadata.processing_time_seconds, Some(1.2));

    assert!(agent.stream_requests().is_empty());
    assert_eq!(agent.query_requests().len(), 1);
    assert_eq!(controller.session_id().await.as_deref(), Some("s1"));
}

#[tokio::test]
async fn test_streaming_unavailable_falls_back() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Fail(AgentError::StreamingUnavailable {
        message: "HTTP 404: Not Found".to_string(),
    }));
    agent.push_response(Ok(contract_response()));
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf"))
        .await;

    let outcome = controller
        .send("payment terms?", None)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(outcome.is_completed());
    assert_eq!(agent.stream_requests().len(), 1);

    let queries = agent.query_requests();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].query, "payment terms?");
    assert_eq!(controller.history().await.len(), 1);
}

#[tokio::test]
async fn test_unsuccessful_query_response_fails_turn() {
    let agent = ScriptedAgent::new();
    agent.push_response(Ok(QueryResponse {
        success: false,
        answer: String::new(),
        citations: vec![],
        session_id: None,
        processing_time_ms: None,
        error: Some("organization index missing".to_string()),
    }));
    let config = ChatConfig {
        streaming_enabled: false,
        ..config()
    };
    let controller = controller_with(&agent, config);
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    let outcome = controller.send("q", None).await.unwrap().wait().await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed(AppError::Protocol(_))));
    assert_eq!(controller.status().await, SessionStatus::Error);
    assert_eq!(
        controller.messages().await[1].content,
        "Error: organization index missing"
    );
}

#[tokio::test]
async fn test_query_transport_failure() {
    let agent = ScriptedAgent::new();
    agent.push_response(Err(AgentError::ServerError {
        message: "HTTP 503: unavailable".to_string(),
        status: Some(503),
    }));
    let config = ChatConfig {
        streaming_enabled: false,
        ..config()
    };
    let controller = controller_with(&agent, config);
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    let outcome = controller.send("q", None).await.unwrap().wait().await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed(AppError::Transport(_))));
    // Hard failure before any event never enters Streaming
    assert_eq!(controller.status().await, SessionStatus::Error);
}
