mod common;

use codegen_agents::{SharedSession, TurnEvent, TurnRunner, FALLBACK_MESSAGE};
use codegen_llm_sdk::error::LlmError;
use codegen_llm_sdk::tools::ToolCall;
use codegen_llm_sdk::types::Role;
use common::{call, done, response, test_session, text, MockLlmClient, Step};
use futures_util::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

fn shared(client: &Arc<MockLlmClient>) -> SharedSession {
    Arc::new(Mutex::new(test_session("user-1", Arc::clone(client))))
}

async fn collect(
    session: &SharedSession,
    input: &str,
    cancel: CancellationToken,
) -> Vec<TurnEvent> {
    TurnRunner::new()
        .streaming(Arc::clone(session), input, cancel)
        .await
        .collect()
        .await
}

#[tokio::test]
async fn test_streaming_events_follow_arrival_order() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![
        text("Setting up "),
        call(0, Some("call_1"), Some("echo"), "{\"value\":"),
        call(0, None, None, "\"x\"}"),
        text("done."),
        done(),
    ]);
    let session = shared(&client);

    let events = collect(&session, "build a todo app", CancellationToken::new()).await;

    assert_eq!(
        events,
        vec![
            TurnEvent::ContentDelta("Setting up ".to_string()),
            TurnEvent::ToolResult {
                call_id: "call_1".to_string(),
                name: "echo".to_string(),
                result: json!({"echo": {"value": "x"}}),
            },
            TurnEvent::ContentDelta("done.".to_string()),
            TurnEvent::Done,
        ]
    );

    let session = session.lock().await;
    let history = session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::System);
    assert_eq!(history[1].content, "build a todo app");
    assert_eq!(history[2].role, Role::Assistant);
    assert_eq!(history[2].content, "Setting up done.");
    assert_eq!(history[2].tool_calls.len(), 1);
    assert_eq!(history[2].tool_calls[0].name(), "echo");
    assert_eq!(history[3].role, Role::Tool);
    assert_eq!(history[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(history[3].content, json!({"echo": {"value": "x"}}).to_string());
}

#[tokio::test]
async fn test_streaming_request_carries_history_and_tools() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![text("hi"), done()]);
    let session = shared(&client);

    collect(&session, "hello", CancellationToken::new()).await;

    let request = client.last_request().unwrap();
    assert_eq!(request.model, "mock-model");
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[1].content, "hello");
    let tools = request.tools.unwrap();
    assert_eq!(
        tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
        vec!["echo", "fail"]
    );
}

#[tokio::test]
async fn test_exactly_one_done_for_any_stream() {
    let scripts: Vec<Vec<Step>> = vec![
        vec![],
        vec![done()],
        vec![text("a")],
        vec![text("a"), done(), text("ignored")],
        vec![Step::Error(LlmError::stream("dropped"))],
        vec![call(0, Some("c"), Some("echo"), "{}"), done()],
    ];

    for script in scripts {
        let client = Arc::new(MockLlmClient::new());
        client.push_stream(script);
        let session = shared(&client);

        let events = collect(&session, "hi", CancellationToken::new()).await;
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(events.last(), Some(&TurnEvent::Done));
    }
}

#[tokio::test]
async fn test_empty_stream_only_appends_user_message() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![]);
    let session = shared(&client);

    let events = collect(&session, "hi", CancellationToken::new()).await;
    assert_eq!(events, vec![TurnEvent::Done]);
    assert_eq!(session.lock().await.history().len(), 2);
}

#[tokio::test]
async fn test_stream_error_becomes_fallback_event() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![
        text("partial"),
        Step::Error(LlmError::stream("connection reset")),
        text("never seen"),
    ]);
    let session = shared(&client);

    let events = collect(&session, "hi", CancellationToken::new()).await;
    assert_eq!(
        events,
        vec![
            TurnEvent::ContentDelta("partial".to_string()),
            TurnEvent::Error(FALLBACK_MESSAGE.to_string()),
            TurnEvent::Done,
        ]
    );
    let session = session.lock().await;
    assert_eq!(session.history().last().unwrap().content, "partial");
}

#[tokio::test]
async fn test_failing_tool_does_not_stop_the_turn() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![
        call(0, Some("c0"), Some("fail"), "{}"),
        call(1, Some("c1"), Some("echo"), "{\"value\":\"y\"}"),
        call(2, Some("c2"), Some("missing"), "{}"),
        text("after"),
        done(),
    ]);
    let session = shared(&client);

    let events = collect(&session, "go", CancellationToken::new()).await;
    assert_eq!(events.len(), 5);
    match &events[0] {
        TurnEvent::ToolError { call_id, name, message } => {
            assert_eq!(call_id, "c0");
            assert_eq!(name, "fail");
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(&events[1], TurnEvent::ToolResult { call_id, .. } if call_id == "c1"));
    match &events[2] {
        TurnEvent::ToolError { message, .. } => assert!(message.contains("Unknown tool")),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(events[3], TurnEvent::ContentDelta("after".to_string()));
    assert_eq!(events[4], TurnEvent::Done);

    let session = session.lock().await;
    let history = session.history();
    // system, user, assistant, three tool results
    assert_eq!(history.len(), 6);
    assert_eq!(history[2].tool_calls.len(), 3);
    assert!(history[3].content.starts_with("Error executing tool:"));
    assert_eq!(history[4].tool_call_id.as_deref(), Some("c1"));
}

#[tokio::test]
async fn test_incomplete_tool_call_is_reported() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![
        call(0, Some("c0"), Some("echo"), "{\"value\":"),
        done(),
    ]);
    let session = shared(&client);

    let events = collect(&session, "go", CancellationToken::new()).await;
    assert_eq!(
        events,
        vec![
            TurnEvent::ToolError {
                call_id: "c0".to_string(),
                name: "echo".to_string(),
                message: "incomplete tool call arguments".to_string(),
            },
            TurnEvent::Done,
        ]
    );
    assert_eq!(session.lock().await.history().len(), 2);
}

#[tokio::test]
async fn test_cancelled_stream_ends_with_single_done() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![text("first"), Step::Hang]);
    let session = shared(&client);
    let cancel = CancellationToken::new();

    let mut stream = TurnRunner::new()
        .streaming(Arc::clone(&session), "go", cancel.clone())
        .await;
    assert_eq!(
        stream.next().await,
        Some(TurnEvent::ContentDelta("first".to_string()))
    );

    cancel.cancel();
    let rest: Vec<TurnEvent> = tokio::time::timeout(Duration::from_secs(5), stream.collect())
        .await
        .unwrap();
    assert_eq!(rest, vec![TurnEvent::Done]);

    let session = session.lock().await;
    assert_eq!(session.history().last().unwrap().content, "first");
}

#[tokio::test]
async fn test_dropped_stream_commits_partial_turn() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![
        text("partial "),
        call(0, Some("call_1"), Some("echo"), "{\"value\":\"x\"}"),
        Step::Hang,
    ]);
    let session = shared(&client);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let mut stream = TurnRunner::new()
        .streaming(Arc::clone(&session), "go", cancel.clone())
        .await;
    assert_eq!(
        stream.next().await,
        Some(TurnEvent::ContentDelta("partial ".to_string()))
    );
    assert!(matches!(
        stream.next().await,
        Some(TurnEvent::ToolResult { ref name, .. }) if name == "echo"
    ));

    // The consumer goes away without polling again
    drop(stream);
    drop(guard);
    assert!(cancel.is_cancelled());

    let session = tokio::time::timeout(Duration::from_secs(5), session.lock())
        .await
        .unwrap();
    let history = session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1].content, "go");
    assert_eq!(history[2].role, Role::Assistant);
    assert_eq!(history[2].content, "partial ");
    assert_eq!(history[2].tool_calls.len(), 1);
    assert_eq!(history[2].tool_calls[0].name(), "echo");
    assert_eq!(history[3].role, Role::Tool);
    assert_eq!(history[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(history[3].content, json!({"echo": {"value": "x"}}).to_string());
}

#[tokio::test]
async fn test_next_turn_sees_tool_output_of_dropped_stream() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![
        call(0, Some("call_1"), Some("echo"), "{}"),
        Step::Hang,
    ]);
    client.push_stream(vec![text("again"), done()]);
    let session = shared(&client);

    let mut stream = TurnRunner::new()
        .streaming(Arc::clone(&session), "first", CancellationToken::new())
        .await;
    assert!(matches!(
        stream.next().await,
        Some(TurnEvent::ToolResult { .. })
    ));
    drop(stream);

    let events = collect(&session, "second", CancellationToken::new()).await;
    assert_eq!(events.last(), Some(&TurnEvent::Done));

    let request = client.last_request().unwrap();
    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::User]
    );
}

#[tokio::test]
async fn test_stream_dropped_before_polling_releases_session() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![text("never read"), done()]);
    let session = shared(&client);

    let stream = TurnRunner::new()
        .streaming(Arc::clone(&session), "go", CancellationToken::new())
        .await;
    drop(stream);

    let session = tokio::time::timeout(Duration::from_secs(5), session.lock())
        .await
        .unwrap();
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].content, "go");
}

#[tokio::test]
async fn test_cancel_before_open_yields_done() {
    let client = Arc::new(MockLlmClient::new());
    let session = shared(&client);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let events = collect(&session, "go", cancel).await;
    assert_eq!(events, vec![TurnEvent::Done]);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_turns_on_one_session_are_serialized() {
    let client = Arc::new(MockLlmClient::new());
    client.push_stream(vec![text("one"), done()]);
    client.push_stream(vec![text("two"), done()]);
    let session = shared(&client);

    let first = TurnRunner::new()
        .streaming(Arc::clone(&session), "first", CancellationToken::new())
        .await;

    let second_session = Arc::clone(&session);
    let second = tokio::spawn(async move {
        TurnRunner::new()
            .streaming(second_session, "second", CancellationToken::new())
            .await
            .collect::<Vec<_>>()
            .await
    });

    // The second turn waits for the first stream to finish
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished());
    let first: Vec<TurnEvent> = first.collect().await;
    assert_eq!(first[0], TurnEvent::ContentDelta("one".to_string()));
    second.await.unwrap();

    let session = session.lock().await;
    let contents: Vec<&str> = session.history()[1..]
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["first", "one", "second", "two"]);
}

#[tokio::test]
async fn test_buffered_turn_runs_tools() {
    let client = Arc::new(MockLlmClient::buffered_only());
    client.push_response(Ok(response(
        "Looking at the project",
        vec![ToolCall::new(
            "call_9".to_string(),
            "echo".to_string(),
            json!({"value": "z"}),
        )],
    )));
    let session = shared(&client);

    let messages = TurnRunner::new()
        .buffered(Arc::clone(&session), "what's there?", CancellationToken::new())
        .await;

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].content, "Looking at the project");
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_9"));
    assert_eq!(messages[2].content, json!({"echo": {"value": "z"}}).to_string());
}

#[tokio::test]
async fn test_buffered_failure_returns_fallback() {
    let client = Arc::new(MockLlmClient::buffered_only());
    client.push_response(Err(LlmError::internal("upstream exploded")));
    let session = shared(&client);

    let messages = TurnRunner::new()
        .buffered(Arc::clone(&session), "hi", CancellationToken::new())
        .await;

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].content, FALLBACK_MESSAGE);

    // Only the user message was recorded
    let session = session.lock().await;
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].role, Role::User);
}

#[tokio::test]
async fn test_non_streaming_client_is_replayed_as_stream() {
    let client = Arc::new(MockLlmClient::buffered_only());
    client.push_response(Ok(response(
        "here",
        vec![ToolCall::new("c".to_string(), "echo".to_string(), json!({}))],
    )));
    let session = shared(&client);

    let events = collect(&session, "hi", CancellationToken::new()).await;
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], TurnEvent::ContentDelta("here".to_string()));
    assert!(matches!(&events[1], TurnEvent::ToolResult { name, .. } if name == "echo"));
    assert_eq!(events[2], TurnEvent::Done);
}
