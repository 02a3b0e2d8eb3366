use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::app::AppState;

/// Health check endpoint
///
/// Reports liveness, the storage backend in use and the current time.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "store": state.store.backend_name(),
        "timestamp": Utc::now()
    }))
}
