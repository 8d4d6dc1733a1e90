#![forbid(unsafe_code)]

pub mod market_data;
pub use market_data::{MarketData, MARKET_DATA_WIRE_BYTES};
