#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod phase;
pub mod scoring;
pub mod time;

pub use error::Error;
