//! lightup-core - Core library for LightUp
//!
//! This crate contains the alarm model, the local alarm store, and the
//! LightUpPi synchronisation engine used by the LightUp clients.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod state;
pub mod sync;
pub mod ui;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use models::{Alarm, AlarmId, DaysOfWeek, RemoteId};
