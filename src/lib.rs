//! Streamcart — live-commerce intent correlation pipeline.
//!
//! Ingests live-stream chat comments into per-recipient queues (with a global
//! audit log), captures periodic frames per active source, and correlates
//! detected buying intent with the temporally nearest frame to resolve and
//! order a catalog item.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
