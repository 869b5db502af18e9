//! Ports implemented by the infrastructure layer

mod store;

pub use store::{ChatStore, SharedChatStore};
