//! Gateway: HTTP surface of the relay.
//!
//! Single port serves the LINE webhook (`POST /api/webhook`) and a liveness probe (`GET /`).

mod server;

pub use server::{router, run_gateway, GatewayState, HEALTH_TEXT, WEBHOOK_PATH};
