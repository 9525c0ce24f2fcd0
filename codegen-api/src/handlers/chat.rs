use crate::state::{AgentLookupError, AppState};
use actix_web::{delete, post, web, HttpResponse, Responder};
use codegen_agents::Agent;
use codegen_llm_sdk::types::Message;
use codegen_types::{ChatMessage, ChatRequest, ChatResponse, ChatToolCall, ErrorResponse};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[post("/chat")]
pub async fn chat(req: web::Json<ChatRequest>, state: web::Data<AppState>) -> impl Responder {
    let req = req.into_inner();
    let agent = match resolve(&state, &req) {
        Ok(agent) => agent,
        Err(response) => return response,
    };
    info!(user_id = %req.user_id, agent = %agent.kind(), "chat");

    match agent
        .chat(&req.user_id, req.message, CancellationToken::new())
        .await
    {
        Ok(messages) => HttpResponse::Ok().json(ChatResponse {
            messages: messages.into_iter().map(to_chat_message).collect(),
        }),
        Err(e) => {
            error!(user_id = %req.user_id, error = %e, "chat failed");
            HttpResponse::InternalServerError().json(ErrorResponse::new(e.user_message()))
        }
    }
}

/// Same turn as `/chat`, sent as server-sent events. Dropping the response
/// body (client disconnect) cancels the turn.
#[post("/chat/stream")]
pub async fn chat_stream(req: web::Json<ChatRequest>, state: web::Data<AppState>) -> impl Responder {
    let req = req.into_inner();
    let agent = match resolve(&state, &req) {
        Ok(agent) => agent,
        Err(response) => return response,
    };
    info!(user_id = %req.user_id, agent = %agent.kind(), "chat stream");

    let cancel = CancellationToken::new();
    let events = match agent
        .chat_stream(&req.user_id, req.message, cancel.clone())
        .await
    {
        Ok(events) => events,
        Err(e) => {
            error!(user_id = %req.user_id, error = %e, "chat stream failed");
            return HttpResponse::InternalServerError().json(ErrorResponse::new(e.user_message()));
        }
    };

    let guard = cancel.drop_guard();
    let body = events.map(move |event| {
        let _ = &guard;
        Ok::<_, actix_web::Error>(web::Bytes::from(event.to_sse()))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body)
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    pub agent: Option<String>,
}

#[delete("/chat/{user_id}")]
pub async fn clear_chat(
    user_id: web::Path<String>,
    query: web::Query<ClearQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let user_id = user_id.into_inner();
    match state.agent(query.agent.as_deref()) {
        Ok(agent) => {
            let removed = agent.clear(&user_id);
            info!(user_id = %user_id, agent = %agent.kind(), removed, "chat cleared");
            HttpResponse::NoContent().finish()
        }
        Err(e) => lookup_error(e),
    }
}

fn resolve<'a>(state: &'a AppState, req: &ChatRequest) -> Result<&'a Agent, HttpResponse> {
    if req.user_id.trim().is_empty() {
        return Err(HttpResponse::BadRequest().json(ErrorResponse::new("user_id is required")));
    }
    if req.message.trim().is_empty() {
        return Err(HttpResponse::BadRequest().json(ErrorResponse::new("message is required")));
    }
    state.agent(req.agent.as_deref()).map_err(lookup_error)
}

fn lookup_error(e: AgentLookupError) -> HttpResponse {
    match e {
        AgentLookupError::Unknown(name) => {
            warn!(agent = %name, "unknown agent requested");
            HttpResponse::NotFound().json(ErrorResponse::new(format!("Unknown agent: {}", name)))
        }
        AgentLookupError::Disabled(kind) => {
            warn!(agent = %kind, "disabled agent requested");
            HttpResponse::ServiceUnavailable().json(ErrorResponse::new(format!(
                "Agent {} is not configured",
                kind
            )))
        }
    }
}

fn to_chat_message(message: Message) -> ChatMessage {
    ChatMessage {
        role: message.role.to_string(),
        content: message.content,
        tool_calls: message
            .tool_calls
            .iter()
            .map(|call| ChatToolCall {
                id: call.id().to_string(),
                name: call.name().to_string(),
                arguments: call.raw_arguments().clone(),
            })
            .collect(),
        tool_call_id: message.tool_call_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegen_llm_sdk::tools::ToolCall;
    use serde_json::json;

    #[test]
    fn test_to_chat_message() {
        let message = Message::assistant_with_tools(
            "checking",
            vec![ToolCall::new(
                "call_1".to_string(),
                "get_project_structure".to_string(),
                json!({}),
            )],
        );
        let chat_message = to_chat_message(message);
        assert_eq!(chat_message.role, "assistant");
        assert_eq!(chat_message.tool_calls[0].name, "get_project_structure");
        assert_eq!(chat_message.tool_call_id, None);
    }
}
