//! ExpenseGrove Common Types
//!
//! This crate contains shared types used across the exchange-rate subsystem,
//! including currency codes, exchange rate records, the display settings
//! collaborator, and timing constants.

pub mod currency;
pub mod rate;
pub mod settings;
pub mod error;
pub mod time;

pub use currency::*;
pub use rate::*;
pub use settings::*;
pub use error::*;
pub use time::*;
