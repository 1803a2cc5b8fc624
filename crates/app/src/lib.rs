//! # lumen-app
//!
//! Application layer — the automation core and its **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** the surrounding layers implement:
//!   - `StateSource` — current state and change stream of every entity
//!   - `Scheduler` — one-shot cancellable timers and the current time
//!   - `ActuatorSink` — fire-and-forget commands to lights, switches, …
//! - Provide the **core mechanics** shared by every rule group:
//!   - `SubscriptionSet` — atomic, leak-free ownership of registrations
//!   - `HoldFilter` — fires once a predicate holds continuously for a duration
//!   - `DelayedAction` / `DimmingController` — "dim now, turn off later unless interrupted"
//!   - `ToggleableAutomation` — master-toggle driven enable/disable lifecycle
//! - Provide reusable **rule producers** (`rules`) and an **in-process
//!   dispatcher** (`LocalDispatcher`) that needs no IO
//!
//! ## Concurrency
//! Everything here runs on a single-threaded cooperative dispatcher: types are
//! `!Send`, and handlers run to completion without blocking.
//!
//! ## Dependency rule
//! Depends on `lumen-domain` only. Never imports adapter crates.

pub mod delayed_action;
pub mod dimming;
pub mod dispatcher;
pub mod hold;
pub mod ports;
pub mod rules;
pub mod subscription;
pub mod toggleable;

#[cfg(test)]
mod testing;
