//! Bookquest application library
//!
//! Reading challenge API: players log books, earn points, and are ranked by
//! their totals.

pub mod models;
pub mod modules;
pub mod ranking;
pub mod stats;
pub mod utils;

pub use modules::register_all;
