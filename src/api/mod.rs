//! HTTP API for the wallet tools
//!
//! JSON endpoints over the generator session, the connected wallet and the
//! transfer form.

pub mod routes;
pub mod server;

pub use server::{create_app, AppState};
