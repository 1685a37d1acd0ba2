//! # concorda-service
//!
//! The aggregation pipeline and its operational shell: concordance
//! resolution and primary-authority election, the per-notification state
//! machine, the worker pool that drains the update queue, and health
//! aggregation for the admin surface.

pub mod concordance;
pub mod health;
pub mod service;
pub mod worker;

pub use health::{CheckResult, SystemHealth};
pub use service::{AggregateService, ServiceConfig};
pub use worker::{WorkerConfig, WorkerHandle, WorkerPool};
