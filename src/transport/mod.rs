pub mod http_server;
pub mod responses;

pub use http_server::{AppState, HttpServerApp, create_router};
