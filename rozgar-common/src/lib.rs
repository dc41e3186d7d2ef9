//! # Rozgar Common Library
//!
//! Shared code for the Rozgar district statistics services:
//! - Region and metrics data model
//! - Configuration file loading
//! - Clock abstraction for time-dependent logic
//! - Common error type

pub mod config;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{
    CategoryShare, Coordinate, DistrictBreakdown, MetricValues, NormalizedMetrics, PaymentStatus,
    Provenance, Region, ResolutionOutcome, TrendPoint, WorkCategory,
};
