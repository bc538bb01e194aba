pub mod health_handlers;
pub mod response;
pub mod stream_handlers;
