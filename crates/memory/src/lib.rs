//! Conversation state store implementations for FitCoach.

pub mod in_memory;

pub use in_memory::InMemoryThreadStore;
