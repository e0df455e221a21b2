//! External HTTP signals: token risk report and base asset USD price

pub mod honeypot;
pub mod price;

pub use honeypot::{HoneypotClient, RiskOracle, RiskReport};
pub use price::{CoinGeckoPriceFeed, PriceFeed};
