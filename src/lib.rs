//! DC-coupled solar and battery micro-grid simulator with priority load
//! shedding and fault injection.

pub mod config;
pub mod devices;
pub mod error;
/// Step history export.
pub mod io;
pub mod logging;
/// Controller, fault schedule, and time-stepped engine.
pub mod sim;

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "tui")]
pub mod tui;

pub use error::ConfigError;
