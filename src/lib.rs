//! Construction time and gear resource calculators for Whiteout Survival.
//!
//! Static level tables are loaded once (from CSV sheets or the SQLite store)
//! and every calculation is a pure function over an immutable [`table::Table`].

pub mod bonus;
pub mod calculator;
pub mod db;
pub mod duration;
pub mod error;
pub mod gear;
pub mod import;
pub mod labels;
pub mod models;
pub mod table;

pub use error::{CalcError, Result};
