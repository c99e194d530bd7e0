use super::{
    db::ProjectDb,
    profile::{Profile, Role},
};
use crate::error::Error;

/// Which roles an endpoint admits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Uploading an export
    Import,
    /// Deleting imported data
    Clear,
    /// Read-only dashboard data
    Reader,
}

impl Access {
    fn allows(&self, role: Role) -> bool {
        match self {
            Access::Import | Access::Clear => role == Role::Admin,
            Access::Reader => matches!(role, Role::Admin | Role::Judge),
        }
    }

    fn denial(&self) -> &'static str {
        match self {
            Access::Import => "Only admins can import data",
            Access::Clear => "Only admins can clear data",
            Access::Reader => "Account is pending approval",
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Resolve the credential to a profile and check its role.
/// Runs on every request, nothing is cached.
pub async fn authorize(
    db: &ProjectDb,
    header: Option<&str>,
    access: Access,
) -> Result<Profile, Error> {
    let header = header.ok_or(Error::AuthenticationMissing)?;
    let token = bearer_token(header).ok_or(Error::AuthenticationInvalid)?;

    let profile = db
        .get_profile_by_token(token)
        .await?
        .ok_or(Error::AuthenticationInvalid)?;

    if access.allows(profile.role()) {
        Ok(profile)
    } else {
        log::warn!(
            "Denied {:?} access to {} with role {:?}",
            access,
            profile.email,
            profile.role
        );
        Err(Error::AuthorizationDenied(access.denial()))
    }
}
