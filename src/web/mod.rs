//! Mediator server.
//!
//! Clients fetch mediator networks, report how each one did, and receive a
//! replacement; evolution advances as evaluations accumulate.
//!
//! ## Architecture
//!
//! - **Lab**: every configured experiment behind one async mutex
//! - **REST API**: evaluation traffic, population control and checkpoints
//! - **WebSocket**: broadcasts evolution events to connected clients
//!
//! ## Usage
//!
//! ```no_run
//! use neuroevolution::Config;
//! use neuroevolution::web::run_server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     run_server(config, "127.0.0.1:8000".parse().unwrap()).await.unwrap();
//! }
//! ```

mod routes;
mod server;
mod state;
mod websocket;

pub use routes::{ApiError, CheckpointListResponse, CheckpointResponse, MessageResponse, StatusResponse};
pub use server::{app, run_server};
pub use state::{AppState, ServerEvent};
