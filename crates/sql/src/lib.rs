#![doc = include_str!("../README.md")]

//! # Backend contract
//!
//! Types and traits shared between the query engine and whatever executes its
//! statements: typed parameter values, backend type tags, result rows and the
//! connection/session seams.

#![forbid(unsafe_code)]

mod connection;
mod json;
mod types;

pub use self::connection::*;
pub use self::json::{into_json, row_to_json};
pub use self::types::*;
