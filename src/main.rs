use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use tracing::{info, warn};

use car_price_api::config::AppConfig;
use car_price_api::{handlers, telemetry, ArtifactStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.logging)?;

    let store = ArtifactStore::from_config(&config.artifacts);
    if config.artifacts.eager_load {
        store.load().context("failed to load model artifacts")?;
    } else {
        warn!("eager_load disabled, artifacts load on the first prediction");
    }
    let store = web::Data::new(store);

    let json_limit = config.server.json_limit;
    let mut server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(store.clone())
            .app_data(handlers::json_config(json_limit))
            .configure(handlers::configure)
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    info!(
        "Server running at http://{}:{}",
        config.server.host, config.server.port
    );
    server
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await?;
    Ok(())
}
