//! Utility modules

pub mod memory_storage;
pub mod recorders;
pub mod validation;

pub use memory_storage::*;
pub use recorders::*;
pub use validation::*;
