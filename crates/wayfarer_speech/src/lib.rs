pub mod client;

pub use client::{SpeechClient, SpeechClientParams, SpeechError};
