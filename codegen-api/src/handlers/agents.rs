use crate::state::AppState;
use actix_web::{get, web, HttpResponse, Responder};
use codegen_types::AgentsResponse;

#[get("/agents")]
pub async fn list_agents(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(AgentsResponse {
        agents: state.agent_infos(),
    })
}
