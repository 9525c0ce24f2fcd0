pub mod config;
pub mod handlers;
pub mod helpers;
pub mod state;

use actix_web::web;

/// Register every route on an app
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::chat::chat)
        .service(handlers::chat::chat_stream)
        .service(handlers::chat::clear_chat)
        .service(handlers::agents::list_agents)
        .service(handlers::llm_providers::list_providers);
}
