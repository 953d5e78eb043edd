// Credit Risk Prediction Service - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod schema;      // Feature column contract
pub mod error;       // Per-request error taxonomy
pub mod applicant;   // Raw applicant record parsing
pub mod features;    // Feature engineering
pub mod model;       // Model artifact loading and inference
pub mod config;      // Environment configuration
pub mod batch;       // CSV batch scoring

#[cfg(feature = "server")]
pub mod api;         // HTTP prediction endpoint

// Re-export commonly used types
pub use schema::{
    FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT, RAW_FIELDS,
    column_index, schema_mismatch,
};
pub use error::PredictionError;
pub use applicant::ApplicantRecord;
pub use features::{FeatureDeriver, FormulaSet, risk_flag};
pub use model::{
    Classifier, EnsembleModel, ModelInfo, Node, Tree, Voting,
    load_model, DEFAULT_MODEL_PATH,
};
pub use config::ServiceConfig;
pub use batch::{score_csv, BatchSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
