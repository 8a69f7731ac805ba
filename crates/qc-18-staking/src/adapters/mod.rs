//! Adapters layer (Hexagonal Architecture)
//!
//! In-memory implementations of the outbound ports, shared behind `Arc`.

mod bank;
mod event_bus;
mod store;

pub use bank::*;
pub use event_bus::*;
pub use store::*;
