use actix_web::{web, HttpResponse, Result};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::artifacts::ArtifactStore;
use crate::error::ApiError;
use crate::inference;
use crate::models::{CarRecord, HealthResponse, PredictionResponse};

const FORM_HTML: &str = include_str!("../static/index.html");

pub async fn predict(
    store: web::Data<ArtifactStore>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let record = CarRecord::from_json(&body)?;
    let request_id = Uuid::new_v4();

    // Artifact reads and tree walks are blocking; keep them off the event loop.
    let price = web::block(move || {
        let span = tracing::info_span!("predict", %request_id, car_name = %record.car_name);
        let _guard = span.enter();
        let price = inference::predict_price(&store, &record)?;
        info!(year = record.year, price, "predicted price");
        Ok::<_, ApiError>(price)
    })
    .await
    .map_err(|e| ApiError::Inference(format!("blocking pool unavailable: {e}")))??;

    Ok(HttpResponse::Ok().json(PredictionResponse {
        prediction_price: price,
    }))
}

pub async fn test_route() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        success: true,
        message: "this is test route".into(),
    })
}

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        success: true,
        message: "Car Price Prediction API is running".into(),
    })
}

pub async fn form() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(FORM_HTML)
}

/// Body extraction failures (bad JSON, wrong content type, oversize) are
/// reported like any other validation error.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| ApiError::validation("body", err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/test").route(web::get().to(test_route)))
        .service(web::resource("/").route(web::get().to(root)))
        .service(web::resource("/app").route(web::get().to(form)));
}
