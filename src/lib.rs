//! # credforge
//!
//! Provision OAuth client applications across identity providers from one
//! CLI, with dry-run simulation, idempotent resource reuse and guided
//! manual fallback.
//!
//! ```bash
//! credforge setup "My App" --domain app.example.com --providers cloud-oauth,social-graph
//! ```
//!
//! ## Modules
//!
//! - `cli` - Command-line interface and request construction
//! - `config` - Provisioning request, provider set and output formats
//! - `error` - Typed error taxonomy driving the failure policy
//! - `setup` - Orchestrator, provider workflows, manual fallback and output
//! - `subprocess` - Injectable subprocess layer for the provider CLIs
pub mod cli;
pub mod config;
pub mod error;
pub mod setup;
pub mod subprocess;
