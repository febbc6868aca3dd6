//! Internal utilities for the chat system.

pub mod validation;

pub use validation::Validator;
