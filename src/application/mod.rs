//! Application services layer.

pub mod embed;
pub mod error;
