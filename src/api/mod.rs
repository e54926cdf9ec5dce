//! HTTP API for submission intake and reporting reads

pub mod server;

pub use server::{ApiServer, ApiServerConfig};
