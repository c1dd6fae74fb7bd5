//! HTTP API handlers for fivewhy-api

pub mod analytics;
pub mod export;
pub mod health;
pub mod model;
pub mod predict;
pub mod records;
pub mod search;

pub use analytics::analytics_routes;
pub use export::export_routes;
pub use health::health_routes;
pub use model::model_routes;
pub use predict::predict_routes;
pub use records::record_routes;
pub use search::search_routes;
