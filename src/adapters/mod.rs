// Adapters layer: concrete implementations of the storage ports.

pub mod local_store;

pub use local_store::{LocalStore, LocalTransaction};
