//! HTTP surface for concorda: concept read/trigger endpoints plus the
//! health and good-to-go admin endpoints.

pub mod handlers;
