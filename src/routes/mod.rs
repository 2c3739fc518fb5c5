pub mod appointments;
pub mod auth;
pub mod chat;
pub mod extraction;

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

pub(crate) fn ok(data: impl Serialize) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}

pub(crate) fn created(data: impl Serialize) -> HttpResponse {
    HttpResponse::Created().json(json!({ "success": true, "data": data }))
}
