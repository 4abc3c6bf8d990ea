//! # homelink-adapter-devices
//!
//! Example drivers wiring concrete hardware topics to device aggregates.
//!
//! Which topic maps to which capability is configuration data, not engine
//! logic — each driver here is a `build` function taking a bus handle and a
//! deserializable args struct, so the composition root can construct devices
//! straight from `[[devices]]` config entries. The drivers double as living
//! examples of the capability contract: late-bound change handlers, shared
//! value cells written from bus callbacks, and last-request-wins task
//! cancellation.

pub mod climate;
pub mod curtain;
pub mod dimmer;

pub use climate::ClimateArgs;
pub use curtain::CurtainArgs;
pub use dimmer::DimmerArgs;
