//! # homelink-app
//!
//! Application engine for the homelink bridge.
//!
//! ## Responsibilities
//! - Define the **ports** adapters implement (message bus, change notifier)
//! - Hold the **device registry** mapping stable ids to device aggregates
//! - Expose the **smart-home facade** a web layer calls with JSON envelopes
//! - Run the **notification loop** that polls devices, diffs snapshots, and
//!   pushes only changed entries to the assistant's callback endpoint
//!
//! ## Dependency rule
//! Depends only on `homelink-domain`. Adapters depend on this crate and
//! implement its port traits; the binary crate wires everything together.

pub mod notification_loop;
pub mod ports;
pub mod registry;
pub mod service;
