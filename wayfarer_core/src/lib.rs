pub mod error;
pub mod geometry;
pub mod guidance;
pub mod map_matcher;
pub mod position;
pub mod progress;
pub mod reroute;
pub mod route;
pub mod routing;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_utils;
