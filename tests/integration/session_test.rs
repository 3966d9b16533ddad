//! Session Controller Integration Tests
//!
//! Full turns against a scripted agent: the contract scenario, retry,
//! session continuity, busy rejection, failures and cancellation.

use std::sync::Arc;

use doc_chat::services::session::CANCELLED_NOTICE;
use doc_chat::{
    AppError, AttachedDocument, ChatConfig, FileFilter, MessageRole, ScopeFilter, SessionController,
    SessionStatus, SessionUpdate, TurnOutcome,
};
use doc_chat_agent::AgentError;
use doc_chat_core::AgentStreamEvent;
use tokio::sync::Notify;

use super::support::*;

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_contract_scenario() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(vec![
        AgentStreamEvent::ToolStart {
            tool_name: "search_documents".to_string(),
        },
        AgentStreamEvent::ToolEnd {
            tool_name: "search_documents".to_string(),
        },
        token("Net "),
        token("30"),
        AgentStreamEvent::Citations {
            citations: vec![citation("contract.pdf", "Payment due in 30 days", Some(0.9))],
        },
        done("s1"),
    ]));
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf"))
        .await;

    let handle = controller
        .send("What are the payment terms?", None)
        .await
        .unwrap();
    let outcome = handle.wait().await.unwrap();

    let message = match outcome {
        TurnOutcome::Completed(message) => message,
        other => panic!("Expected Completed, got {:?}", other),
    };
    assert_eq!(message.content, "Net 30");
    assert_eq!(message.citations.len(), 1);
    assert!(!message.in_flight);
    let metadata = message.metadata.unwrap();
    assert_eq!(metadata.confidence_score, 0.9);
    assert_eq!(metadata.sources_count, 1);
    assert_eq!(metadata.processing_time_seconds, Some(0.5));
    assert_eq!(metadata.search_strategy, "hybrid");

    assert_eq!(controller.session_id().await.as_deref(), Some("s1"));
    assert_eq!(controller.status().await, SessionStatus::Idle);
    assert_eq!(controller.progress().await, None);

    let messages = controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].content, "What are the payment terms?");
    assert_eq!(messages[1].content, "Net 30");

    let requests = agent.stream_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].organization_name, "acme");
    assert_eq!(
        requests[0].file_filter,
        Some(FileFilter::Single("contract.pdf".to_string()))
    );
    assert_eq!(requests[0].folder_filter, None);
    assert_eq!(requests[0].session_id, None);
}

#[tokio::test]
async fn test_two_documents_org_scope() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(answer("Both mention Net 30", "s1")));
    let controller = controller(&agent);
    controller
        .open_multi(vec![
            AttachedDocument::new("a.pdf").with_folder_name("Legal"),
            AttachedDocument::new("b.pdf").with_folder_name("Finance"),
        ])
        .await;

    controller
        .send("compare", None)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let request = &agent.stream_requests()[0];
    assert_eq!(
        request.file_filter,
        Some(FileFilter::Multiple(vec![
            "a.pdf".to_string(),
            "b.pdf".to_string()
        ]))
    );
    assert_eq!(request.folder_filter, None);
    assert_eq!(controller.cache_hint().await, None);
}

#[tokio::test]
async fn test_single_document_folder_hint_from_directory() {
    let agent = ScriptedAgent::new();
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf").with_folder_id("f-legal"))
        .await;
    assert_eq!(controller.cache_hint().await.as_deref(), Some("Legal"));
}

#[tokio::test]
async fn test_scope_override_applies_to_one_query() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(answer("first", "s1")));
    agent.push_stream(Script::Events(answer("second", "s1")));
    let controller = controller(&agent);
    controller.open_multi(vec![]).await;

    controller
        .send("q1", Some(ScopeFilter::folder("Legal", 3)))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    controller
        .send("q2", None)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let requests = agent.stream_requests();
    assert_eq!(requests[0].folder_filter.as_deref(), Some("Legal"));
    assert_eq!(requests[0].max_sources, 3);
    assert_eq!(requests[1].folder_filter, None);
    assert_eq!(requests[1].max_sources, 10);
}

// ============================================================================
// Session Continuity
// ============================================================================

#[tokio::test]
async fn test_session_id_persists_until_clear() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(answer("one", "s1")));
    agent.push_stream(Script::Events(vec![
        token("two"),
        AgentStreamEvent::Done {
            session_id: None,
            processing_time_ms: None,
        },
    ]));
    agent.push_stream(Script::Events(answer("three", "s2")));
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf"))
        .await;

    assert_eq!(controller.session_id().await, None);
    controller.send("q1", None).await.unwrap().wait().await.unwrap();
    assert_eq!(controller.session_id().await.as_deref(), Some("s1"));

    controller.send("q2", None).await.unwrap().wait().await.unwrap();
    assert_eq!(controller.session_id().await.as_deref(), Some("s1"));

    controller.clear().await;
    assert_eq!(controller.session_id().await, None);
    assert!(controller.messages().await.is_empty());
    assert!(controller.is_open().await);

    controller.send("q3", None).await.unwrap().wait().await.unwrap();

    let requests = agent.stream_requests();
    assert_eq!(requests[0].session_id, None);
    assert_eq!(requests[1].session_id.as_deref(), Some("s1"));
    assert_eq!(requests[2].session_id, None);
}

#[tokio::test]
async fn test_open_resets_session() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(answer("one", "s1")));
    let controller = controller(&agent);
    controller.open_single(AttachedDocument::new("a.pdf")).await;
    controller.send("q1", None).await.unwrap().wait().await.unwrap();

    controller.open_single(AttachedDocument::new("b.pdf")).await;
    assert_eq!(controller.session_id().await, None);
    assert!(controller.messages().await.is_empty());
    assert!(matches!(
        controller.retry().await,
        Err(AppError::NoPriorQuery)
    ));
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_retry_without_prior_query() {
    let agent = ScriptedAgent::new();
    let controller = controller(&agent);
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    let result = controller.retry().await;
    assert!(matches!(result, Err(AppError::NoPriorQuery)));
    assert!(controller.messages().await.is_empty());
    assert!(agent.stream_requests().is_empty());
}

#[tokio::test]
async fn test_retry_before_any_open() {
    let agent = ScriptedAgent::new();
    let controller = controller(&agent);

    assert!(matches!(controller.retry().await, Err(AppError::NoPriorQuery)));
    assert!(agent.stream_requests().is_empty());
}

#[tokio::test]
async fn test_retry_after_success_replaces_answer() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(answer("Net 30", "s1")));
    agent.push_stream(Script::Events(answer("Net 30 days", "s1")));
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf"))
        .await;

    let scope = ScopeFilter::documents(vec!["contract.pdf".to_string()], 4);
    controller
        .send("payment terms?", Some(scope))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    let before = controller.messages().await;
    assert_eq!(before.len(), 2);

    controller.retry().await.unwrap().wait().await.unwrap();

    let after = controller.messages().await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].id, before[0].id);
    assert_ne!(after[1].id, before[1].id);
    assert_eq!(after[1].content, "Net 30 days");

    let requests = agent.stream_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].query, requests[1].query);
    assert_eq!(requests[0].file_filter, requests[1].file_filter);
    assert_eq!(requests[0].max_sources, requests[1].max_sources);
    // The retried turn continues the agent session
    assert_eq!(requests[1].session_id.as_deref(), Some("s1"));
}

#[tokio::test]
async fn test_retry_after_failure() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Fail(AgentError::network("connection refused")));
    agent.push_stream(Script::Events(answer("Net 30", "s1")));
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
    assert!(matches!(outcome, TurnOutcome::Failed(AppError::Transport(_))));
    assert_eq!(controller.status().await, SessionStatus::Error);

    let messages = controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert!(messages[1].is_error);
    assert_eq!(
        messages[1].content,
        "Error: Network error: connection refused"
    );

    let outcome = controller.retry().await.unwrap().wait().await.unwrap();
    assert!(outcome.is_completed());
    let messages = controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Net 30");
    assert_eq!(controller.status().await, SessionStatus::Idle);
}

// ============================================================================
// Busy Rejection & Cancellation
// ============================================================================

#[tokio::test]
async fn test_send_while_streaming_is_rejected() {
    let agent = ScriptedAgent::new();
    let gate = Arc::new(Notify::new());
    agent.push_stream(Script::Gated {
        before: vec![AgentStreamEvent::Status {
            message: "Thinking".to_string(),
        }],
        gate: gate.clone(),
        after: answer("Net 30", "s1"),
    });
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf"))
        .await;

    let handle = controller.send("first", None).await.unwrap();
    wait_for_status(&controller, SessionStatus::Streaming).await;
    assert_eq!(controller.progress().await.as_deref(), Some("Thinking"));

    let log_before = controller.messages().await;
    let second = controller.send("second", None).await;
    assert!(matches!(second, Err(AppError::SessionBusy)));
    assert!(matches!(controller.retry().await, Err(AppError::SessionBusy)));
    assert_eq!(controller.messages().await, log_before);
    assert_eq!(agent.stream_requests().len(), 1);

    gate.notify_one();
    assert!(handle.wait().await.unwrap().is_completed());
    assert_eq!(controller.status().await, SessionStatus::Idle);
}

#[tokio::test]
async fn test_cancel_in_flight_turn() {
    let agent = ScriptedAgent::new();
    let gate = Arc::new(Notify::new());
    agent.push_stream(Script::Gated {
        before: vec![token("Net")],
        gate,
        after: answer("Net 30", "s1"),
    });
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf"))
        .await;

    let handle = controller.send("payment terms?", None).await.unwrap();
    let message_id = handle.message_id().to_string();
    wait_for_status(&controller, SessionStatus::Streaming).await;

    assert!(controller.cancel().await);
    assert!(matches!(handle.wait().await.unwrap(), TurnOutcome::Cancelled));

    let messages = controller.messages().await;
    let placeholder = messages.iter().find(|m| m.id == message_id).unwrap();
    assert_eq!(placeholder.content, CANCELLED_NOTICE);
    assert!(!placeholder.in_flight);
    assert_eq!(controller.status().await, SessionStatus::Idle);
    assert_eq!(controller.session_id().await, None);
    assert!(!controller.cancel().await);
}

#[tokio::test]
async fn test_close_keeps_log_and_blocks_sends() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(answer("Net 30", "s1")));
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf").with_folder_name("Legal"))
        .await;
    controller.send("q", None).await.unwrap().wait().await.unwrap();

    controller.close().await;
    assert!(!controller.is_open().await);
    assert_eq!(controller.cache_hint().await, None);
    assert_eq!(controller.messages().await.len(), 2);
    assert!(matches!(
        controller.send("again", None).await,
        Err(AppError::SessionClosed)
    ));
}

#[tokio::test]
async fn test_close_mid_stream_drops_late_events() {
    let agent = ScriptedAgent::new();
    let gate = Arc::new(Notify::new());
    agent.push_stream(Script::Gated {
        before: vec![token("Net")],
        gate: gate.clone(),
        after: answer("Net 30", "s1"),
    });
    let controller = controller(&agent);
    controller
        .open_single(AttachedDocument::new("contract.pdf"))
        .await;

    let handle = controller.send("q", None).await.unwrap();
    wait_for_status(&controller, SessionStatus::Streaming).await;

    controller.close().await;
    gate.notify_one();
    assert!(matches!(handle.wait().await.unwrap(), TurnOutcome::Cancelled));

    let contents: Vec<String> = controller
        .messages()
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["q".to_string(), CANCELLED_NOTICE.to_string()]);
    assert_eq!(controller.session_id().await, None);
    assert_eq!(controller.status().await, SessionStatus::Idle);
    assert!(controller.history().await.is_empty());
}

#[tokio::test]
async fn test_close_after_failure_keeps_error_status() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Fail(AgentError::network("connection refused")));
    let controller = controller(&agent);
    controller.open_single(AttachedDocument::new("a.pdf")).await;
    controller.send("q", None).await.unwrap().wait().await.unwrap();
    assert_eq!(controller.status().await, SessionStatus::Error);

    let mut updates = controller.subscribe();
    controller.close().await;

    while let Ok(update) = updates.try_recv() {
        assert!(
            !matches!(update, SessionUpdate::StatusChanged(_)),
            "unexpected {:?}",
            update
        );
    }
    assert_eq!(controller.status().await, SessionStatus::Error);
}

// ============================================================================
// Errors Before Dispatch
// ============================================================================

#[tokio::test]
async fn test_missing_organization_is_config_error() {
    let agent = ScriptedAgent::new();
    let controller = controller_with(&agent, ChatConfig::default());
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    let result = controller.send("q", None).await;
    assert!(matches!(result, Err(AppError::Config(_))));
    assert!(controller.messages().await.is_empty());
    assert!(agent.stream_requests().is_empty());
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let config = ChatConfig {
        default_max_sources: 0,
        ..config()
    };

    let result = SessionController::connect(config, directory());
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_unknown_organization_is_config_error() {
    let agent = ScriptedAgent::new();
    let config = ChatConfig {
        organization_id: Some("org-404".to_string()),
        ..Default::default()
    };
    let controller = controller_with(&agent, config);
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    assert!(matches!(
        controller.send("q", None).await,
        Err(AppError::Config(_))
    ));
}

#[tokio::test]
async fn test_invalid_scope_is_rejected() {
    let agent = ScriptedAgent::new();
    let controller = controller(&agent);
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    let result = controller
        .send("q", Some(ScopeFilter::documents(vec![], 5)))
        .await;
    assert!(matches!(result, Err(AppError::Scope(_))));
    assert!(controller.messages().await.is_empty());
    assert!(agent.stream_requests().is_empty());

    assert!(controller.set_scope(ScopeFilter::organization(0)).await.is_err());
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let agent = ScriptedAgent::new();
    let controller = controller(&agent);
    controller.open_single(AttachedDocument::new("a.pdf")).await;
    assert!(matches!(
        controller.send("   ", None).await,
        Err(AppError::Validation(_))
    ));
}

// ============================================================================
// Protocol Failures
// ============================================================================

#[tokio::test]
async fn test_error_event_fails_turn() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(vec![
        token("partial"),
        AgentStreamEvent::Error {
            error: "index offline".to_string(),
        },
        token("ignored"),
    ]));
    let controller = controller(&agent);
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    let outcome = controller.send("q", None).await.unwrap().wait().await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed(AppError::Protocol(_))));

    let messages = controller.messages().await;
    assert_eq!(messages[1].content, "Error: index offline");
    assert!(messages[1].citations.is_empty());
    assert_eq!(controller.status().await, SessionStatus::Error);
    assert_eq!(controller.session_id().await, None);
    assert!(controller.history().await.is_empty());
}

#[tokio::test]
async fn test_stream_without_done_is_protocol_error() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(vec![token("Net 30")]));
    let controller = controller(&agent);
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    let outcome = controller.send("q", None).await.unwrap().wait().await.unwrap();
    match outcome {
        TurnOutcome::Failed(AppError::Protocol(msg)) => {
            assert_eq!(msg, "stream ended before completion")
        }
        other => panic!("Expected protocol failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_health_check_delegates_to_agent() {
    let agent = ScriptedAgent::new();
    let controller = controller(&agent);
    assert!(controller.health_check().await.is_ok());

    agent.set_unreachable();
    assert!(matches!(
        controller.health_check().await,
        Err(AppError::Transport(_))
    ));
}

// ============================================================================
// Observers
// ============================================================================

#[tokio::test]
async fn test_subscribers_see_turn_lifecycle() {
    let agent = ScriptedAgent::new();
    agent.push_stream(Script::Events(answer("Net 30", "s1")));
    let controller = controller(&agent);
    controller.open_single(AttachedDocument::new("a.pdf")).await;

    let mut updates = controller.subscribe();
    let handle = controller.send("q", None).await.unwrap();
    let message_id = handle.message_id().to_string();
    handle.wait().await.unwrap();

    let mut statuses = Vec::new();
    let mut finished = None;
    while let Ok(update) = updates.try_recv() {
        match update {
            SessionUpdate::StatusChanged(status) => statuses.push(status),
            SessionUpdate::TurnFinished { message_id, status } => {
                finished = Some((message_id, status))
            }
            _ => {}
        }
    }
    assert_eq!(
        statuses,
        vec![
            SessionStatus::Sending,
            SessionStatus::Streaming,
            SessionStatus::Idle
        ]
    );
    assert_eq!(finished, Some((message_id, SessionStatus::Idle)));
}
