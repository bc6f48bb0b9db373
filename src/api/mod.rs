//! API Module - form boundary

pub mod commands;
pub mod format;

pub use format::format_currency;
