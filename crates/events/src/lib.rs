//! Change notifications: event contract and publish/subscribe plumbing.
//!
//! Domain crates define their own event enums and implement [`Event`]; services
//! publish them on an [`EventBus`] after the store has committed the change.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
