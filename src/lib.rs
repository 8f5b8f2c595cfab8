//! Product Content API
//!
//! Generates product descriptions, synthetic customer comments, comment
//! summaries and product images. Text comes from an LLM behind an
//! OpenAI-compatible API; images come from an external generator script run
//! as a subprocess.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
