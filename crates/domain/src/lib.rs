//! # homelink-domain
//!
//! Pure domain model for the homelink smart-home bridge.
//!
//! ## Responsibilities
//! - Define **Capabilities** (controllable device facets: on/off, range, mode,
//!   toggle, color setting) with typed change handlers
//! - Define **Properties** (read-mostly telemetry: float sensors, discrete
//!   events) with assignment-time invariants
//! - Define **Devices** (aggregates of capabilities and properties under one
//!   identity) and their `specification`/`state`/`report`/`action` operations
//! - Define the error taxonomy and the JSON wire shapes the assistant
//!   platform consumes
//!
//! ## Dependency rule
//! This crate has **no internal dependencies** and performs no IO.
//! The message bus and the notification endpoint are expressed as traits in
//! the `app` crate (ports); drivers live in adapter crates.

pub mod capability;
pub mod device;
pub mod error;
pub mod id;
pub mod property;
pub mod value;
