pub mod actions;
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod io;
pub mod migrate;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod summary;
pub mod update;

pub use error::{Result, TrackerError};
