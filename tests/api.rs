use std::path::Path;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use tempfile::TempDir;

use car_price_api::handlers;
use car_price_api::models::PredictionResponse;
use car_price_api::{ArtifactStore, FsArtifactSource};

const COLUMNS: &[&str] = &[
    "Year",
    "Present_Price",
    "Kms_Driven",
    "Fuel_Type_Diesel",
    "Fuel_Type_Petrol",
    "Seller_Type_Individual",
    "Transmission_Manual",
    "Owner_1",
    "Owner_3",
    "Car_Name_ritz",
    "Car_Name_swift",
];

// Two trees: one on Present_Price (index 1), one on Fuel_Type_Diesel (index 3).
const FOREST: &str = r#"{
    "n_features": 11,
    "trees": [
        {
            "children_left": [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature": [1, -2, -2],
            "threshold": [5.0, -2.0, -2.0],
            "value": [0.0, 2.0, 4.0]
        },
        {
            "children_left": [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature": [3, -2, -2],
            "threshold": [0.5, -2.0, -2.0],
            "value": [0.0, 3.0, 7.0]
        }
    ]
}"#;

fn write_artifacts(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let model = dir.join("model.json");
    let schema = dir.join("feature_columns.json");
    std::fs::write(&model, FOREST).unwrap();
    std::fs::write(&schema, serde_json::to_vec(COLUMNS).unwrap()).unwrap();
    (model, schema)
}

fn store(dir: &TempDir) -> web::Data<ArtifactStore> {
    let (model, schema) = write_artifacts(dir.path());
    web::Data::new(ArtifactStore::new(FsArtifactSource::new(model, schema, None)))
}

fn ritz() -> Value {
    json!({
        "Car_Name": "ritz",
        "year": 2014,
        "Present_price": 5.59,
        "Kms_Driven": 27000,
        "Fuel_Type": "Petrol",
        "Seller_Type": "Dealer",
        "Transmission": "Manual",
        "owner": 0
    })
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data($store.clone())
                .app_data(handlers::json_config(4096))
                .configure(handlers::configure),
        )
        .await
    };
}

#[actix_rt::test]
async fn predicts_price_for_known_car() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(ritz())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let fields: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
    assert_eq!(fields, vec!["prediction_price"]);

    let price = body["prediction_price"].as_f64().unwrap();
    assert!(price.is_finite() && price >= 0.0);
    // Present_Price 5.59 > 5.0 -> 4.0; Petrol -> 3.0.
    assert_eq!(price, 3.5);
}

#[actix_rt::test]
async fn diesel_indicator_reaches_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    let mut body = ritz();
    body["Fuel_Type"] = json!("Diesel");
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(body)
        .to_request();
    let resp: PredictionResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp.prediction_price, 5.5);
}

#[actix_rt::test]
async fn unseen_car_name_still_predicts() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    let mut body = ritz();
    body["Car_Name"] = json!("flying carpet");
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn missing_field_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    let mut body = ritz();
    body.as_object_mut().unwrap().remove("Fuel_Type");
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["field"], "Fuel_Type");
}

#[actix_rt::test]
async fn owner_out_of_range_never_loads_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    for owner in [4, -1] {
        let mut body = ritz();
        body["owner"] = json!(owner);
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["field"], "owner");
    }
    assert!(!store.is_loaded());
}

#[actix_rt::test]
async fn owner_bounds_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    for owner in [0, 3] {
        let mut body = ritz();
        body["owner"] = json!(owner);
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

#[actix_rt::test]
async fn unknown_enum_value_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    let mut body = ritz();
    body["Fuel_Type"] = json!("Electric");
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "Fuel_Type");
}

#[actix_rt::test]
async fn malformed_json_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/predict")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"Car_Name\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "body");
}

#[actix_rt::test]
async fn missing_artifacts_surface_as_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = web::Data::new(ArtifactStore::new(FsArtifactSource::new(
        dir.path().join("model.json"),
        dir.path().join("feature_columns.json"),
        None,
    )));
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(ritz())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "internal_error");
}

#[actix_rt::test]
async fn liveness_routes() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    for uri in ["/test", "/"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["Success"], true);
        assert!(body["message"].is_string());
    }
}

#[actix_rt::test]
async fn serves_the_form() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    let req = test::TestRequest::get().uri("/app").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("fetch(\"/predict\""));
    for name in ["ritz", "Bajaj Dominar 400", "Hyosung GT250R", "Yamaha FZ v 2.0"] {
        assert!(html.contains(&format!("<option value=\"{name}\">")), "{name}");
    }
    assert_eq!(html.matches("<option value=").count(), 97);
}

#[actix_rt::test]
async fn loosely_typed_numbers_are_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let app = app!(store);

    for (field, value) in [
        ("year", json!(2014.0)),
        ("year", json!("2014")),
        ("owner", json!("1")),
        ("Kms_Driven", json!(27000.5)),
    ] {
        let mut body = ritz();
        body[field] = value;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{field}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["field"], field);
    }
    assert!(!store.is_loaded());
}
