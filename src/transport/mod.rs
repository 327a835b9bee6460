pub mod http_server;
pub mod middleware;
pub mod websocket_server;

pub use http_server::router;
