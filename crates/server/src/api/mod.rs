use axum::{
  Json, Router,
  routing::{get, post},
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::utils::AppState;

mod add_line;
mod memory;
mod reply;

pub use add_line::{AddLine, AddLineResult};
pub use memory::{MemoryQuery, MemoryView};
pub use reply::{Reply, ReplyResult, ReplySegment};

#[derive(OpenApi)]
#[openapi(
  info(
    title = "LingChat API",
    version = "0.0.1",
    description = "Dialogue log, segmented replies and per-character memory"
  ),
  paths(add_line::add_line, memory::memory, reply::reply),
  components(schemas(
    AddLine,
    AddLineResult,
    MemoryQuery,
    MemoryView,
    Reply,
    ReplyResult,
    ReplySegment,
    lingchat_core::DialogueLine,
    lingchat_core::LineKind,
  ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
  Json(ApiDoc::openapi())
}

pub fn app() -> Router<AppState> {
  Router::new()
    .route("/api/v0/add_line", post(add_line::add_line))
    .route("/api/v0/memory", post(memory::memory))
    .route("/api/v0/reply", post(reply::reply))
    .route("/openapi.json", get(openapi_json))
    .merge(Scalar::with_url("/openapi/", ApiDoc::openapi()))
}
