//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application engine and the outside
//! world. They are defined here so the engine and the adapter layer can both
//! depend on them without creating circular dependencies.

pub mod message_bus;
pub mod notifier;

pub use message_bus::{MessageBus, TopicCallback, TopicMessage};
pub use notifier::ChangeNotifier;
