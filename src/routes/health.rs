//! Service info endpoint

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    #[serde(rename = "generatePDF")]
    pub generate_pdf: &'static str,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

pub async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        status: "Server is running",
        message: "PDF Generator API",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            health: "GET /",
            generate_pdf: "POST /api/generate-pdf",
        },
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(info))
}
