//! Well-known role name constants carried in access-token claims.

pub const ROLE_ADMIN: &str = "admin";
/// Machine callers such as SMS/email providers posting delivery receipts.
pub const ROLE_SERVICE: &str = "service";
