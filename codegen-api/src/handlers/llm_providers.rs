use crate::state::AppState;
use actix_web::{get, web, HttpResponse, Responder};
use codegen_types::ProvidersResponse;

#[get("/providers")]
pub async fn list_providers(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ProvidersResponse {
        providers: state.providers().to_vec(),
    })
}
