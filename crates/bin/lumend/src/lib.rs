//! # lumend — lumen daemon
//!
//! Composition root that wires area automations to devices and runs the
//! dispatch loop.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Provision virtual devices for every configured entity
//! - Build one toggleable rule group per area, injecting ports
//! - Drive the single-threaded dispatcher from a tokio current-thread runtime
//! - Handle graceful shutdown (Ctrl-C), stopping every automation
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no automation logic belongs here.

pub mod areas;
pub mod config;
pub mod runtime;
