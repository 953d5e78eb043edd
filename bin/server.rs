// Credit Risk Prediction Service - Web Server

use credit_risk::api::{router, AppState};
use credit_risk::{load_model, FeatureDeriver, ServiceConfig};
use log::{error, info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    info!("Credit Risk Prediction Service v{}", credit_risk::VERSION);

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // No model, no service
    let (model, model_info) = match load_model(&config.model_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Model could not be loaded: {:#}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Loaded model {} v{} ({} trees, {:?} voting, sha256 {})",
        model_info.name, model_info.version, model_info.tree_count, model_info.voting, model_info.sha256
    );

    let deriver = FeatureDeriver::new(config.formulas);
    if deriver.formulas() != credit_risk::FormulaSet::Guarded {
        warn!("Serving with '{}' feature formulas", deriver.formulas().name());
    }

    let state = AppState::new(Arc::new(model), deriver).with_info(model_info);
    let app = router(state);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server running on http://{}", addr);
    info!("   POST /predict     - score one applicant");
    info!("   GET  /health      - liveness");
    info!("   GET  /model-info  - loaded model and feature schema");

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
