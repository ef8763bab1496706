//! Domain layer - value types, report records and port definitions
//!
//! This module defines the types the reconciliation engine works with and
//! the trait (port) that fetch adapters implement.

pub mod ports;
pub mod quantity;
pub mod report;

pub use ports::*;
pub use quantity::*;
pub use report::*;
