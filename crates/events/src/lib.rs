//! `estateflow-events` — domain event plumbing.
//!
//! Events are immutable facts emitted by aggregates; this crate defines the
//! event contract, the stream envelope, and the pub/sub abstraction used to
//! distribute committed events to consumers.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
