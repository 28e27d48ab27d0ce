//! Same-origin gateway for mcpscope.
//!
//! Holds the client secret so it never reaches the caller, exchanges and
//! refreshes tokens against the provider, bounces the provider's redirect
//! back to the app entry, and forwards MCP messages with the bearer token and
//! session header attached.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/auth/token` | authorization code exchange |
//! | `PUT /api/auth/token` | token refresh |
//! | `GET /api/auth/callback` | provider redirect target |
//! | `POST /api/mcp` | MCP forwarding |
//! | `GET /` | callback capture for CLI login (optional) |

pub mod error;
mod page;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{GatewayError, GatewayResult};
pub use routes::callback_location;
pub use server::{bind, create_router, serve, CALLBACK_ROUTE};
pub use state::{CallbackCapture, GatewayState};
