//! Per-category provider rankings.
//!
//! A batch pipeline joins appointments, patient-provider links, ratings and
//! the provider directory, averages ratings per provider within each
//! category, and writes one ranking per category into a key-value cache.
//! The lookup side resolves a request to its category and serves the top-K
//! slice of that cached ranking.

pub mod cli;
pub mod config;
pub mod services;
pub mod types;
