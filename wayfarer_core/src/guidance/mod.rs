pub mod guidance_params;
pub mod scheduler;
pub mod session;
pub mod surface;
