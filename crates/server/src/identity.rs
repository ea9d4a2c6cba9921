use axum::http::{HeaderMap, HeaderName};
use thiserror::Error;

use seatwise_core::domain::enrollment::StudentId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("request carries no `{0}` header")]
    Missing(String),
    #[error("`{0}` header is not a valid student id")]
    Invalid(String),
    #[error("identity header name `{0}` is not a valid HTTP header name")]
    BadHeaderName(String),
    #[error("caller `{0}` is not an administrator")]
    NotAdmin(String),
}

pub const ADMIN_ROLE: &str = "admin";

/// Resolves the calling student from request headers. Handlers never read
/// identity from request bodies.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap) -> Result<StudentId, IdentityError>;

    /// Verified caller that also holds the administrator role.
    fn verify_admin(&self, headers: &HeaderMap) -> Result<StudentId, IdentityError>;
}

/// Trusts headers set by the authenticating gateway in front of this service.
pub struct GatewayHeaderVerifier {
    header: HeaderName,
    role_header: HeaderName,
}

fn header_name(raw: &str) -> Result<HeaderName, IdentityError> {
    HeaderName::try_from(raw.trim().to_ascii_lowercase())
        .map_err(|_| IdentityError::BadHeaderName(raw.to_string()))
}

impl GatewayHeaderVerifier {
    pub fn new(header: &str, role_header: &str) -> Result<Self, IdentityError> {
        Ok(Self { header: header_name(header)?, role_header: header_name(role_header)? })
    }
}

impl IdentityVerifier for GatewayHeaderVerifier {
    fn verify(&self, headers: &HeaderMap) -> Result<StudentId, IdentityError> {
        let name = self.header.as_str();
        let value = headers.get(&self.header).ok_or_else(|| IdentityError::Missing(name.to_string()))?;
        let value = value.to_str().map_err(|_| IdentityError::Invalid(name.to_string()))?.trim();
        if value.is_empty() {
            return Err(IdentityError::Invalid(name.to_string()));
        }
        Ok(StudentId(value.to_string()))
    }

    fn verify_admin(&self, headers: &HeaderMap) -> Result<StudentId, IdentityError> {
        let caller = self.verify(headers)?;
        let is_admin = headers
            .get(&self.role_header)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case(ADMIN_ROLE));
        if is_admin {
            Ok(caller)
        } else {
            Err(IdentityError::NotAdmin(caller.0))
        }
    }
}
