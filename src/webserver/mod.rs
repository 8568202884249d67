/// HTTP and observer WebSocket surface
///
/// - `server`: listener lifecycle and graceful shutdown
/// - `routes`: page, static, API and `/ws` routes
/// - `state`: shared handles passed to every handler
/// - `ws`: the broadcast hub and observer connections
mod server;

pub mod routes;
pub mod state;
pub mod utils;
pub mod ws;

// Public API for starting/stopping the webserver
pub use server::{build_app, serve_with_listener, shutdown, start_server};
