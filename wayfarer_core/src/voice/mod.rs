pub mod audio_clip;
pub mod cache;
pub mod generator;
pub mod pipeline;
pub mod playback;
