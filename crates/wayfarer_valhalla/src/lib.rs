pub mod client;
pub mod polyline;
pub mod response;

pub use client::{ValhallaClient, ValhallaClientParams, ValhallaError};
