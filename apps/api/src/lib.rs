//! Resume screening: scores a batch of resumes against a job description through
//! an LLM, keeps a local history of runs and mirrors each run to a session store.
//!
//! The library half is the client ([`screener::Screener`] and what it drives).
//! The `screener-api` binary serves the credential-holding relay and the session
//! store API from the same crate.

pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod history;
pub mod ingest;
pub mod models;
pub mod presets;
pub mod prompts;
pub mod relay;
pub mod routes;
pub mod scoring;
pub mod screener;
pub mod sessions;
pub mod state;
