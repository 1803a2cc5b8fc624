//! # lumen-domain
//!
//! Pure domain model for the lumen automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **entity ids** and the static mapping from domain category to id prefix
//! - Define **states** and the immutable **state change** record
//! - Define **commands** sent to actuators (`turn_on`, `turn_off`, `press`, `set_value`)
//! - Define **policies** (dimming, hold durations) with their invariant checks
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod command;
pub mod entity;
pub mod event;
pub mod policy;
