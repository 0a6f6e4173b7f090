//! Outbound call execution for registered integrations.
//!
//! [`executor::IntegrationGateway`] ties together the route catalog, the
//! rate limiter, the audit log, and a [`downstream::Downstream`] transport.
//! Storage and transport sit behind traits so the execution rules can be
//! exercised without a database or network.

pub mod auth;
pub mod downstream;
pub mod error;
pub mod executor;
pub mod store;

pub use downstream::{Downstream, HttpDownstream};
pub use error::GatewayError;
pub use executor::{ExecuteRequest, ExecutionResult, IntegrationGateway};
pub use store::{GatewayStore, PgGatewayStore};
