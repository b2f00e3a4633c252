pub mod frame_handlers;
pub mod health_handlers;
