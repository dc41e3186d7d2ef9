//! HTTP API handlers for rozgar-dd

pub mod health;
pub mod refresh;
pub mod regions;
pub mod states;

pub use health::health_routes;
pub use refresh::refresh_routes;
pub use regions::region_routes;
pub use states::state_routes;
