//! Typed access to a process instance's variable store

pub mod accessor;
pub mod coerce;
pub mod store;

pub use accessor::Variables;
pub use store::{MapStore, VariableStore};
