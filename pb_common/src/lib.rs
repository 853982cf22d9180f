//! Value types shared by the PointBoard engine and server.
pub mod helpers;
mod money;

pub mod op;

pub use money::{Money, MoneyConversionError, AMOUNT_TOLERANCE, DEFAULT_CURRENCY_CODE};
