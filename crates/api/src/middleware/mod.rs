//! Authentication, authorization, and request-context extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`rbac::RequireAuth`] -- Requires any authenticated user.
//! - [`rbac::RequireService`] -- Requires `service` or `admin` role.
//! - [`client_ip::ClientIp`] -- Resolves the caller's address behind proxies.

pub mod auth;
pub mod client_ip;
pub mod rbac;
