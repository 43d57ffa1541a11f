//! Role gate: which roles may perform which action on which resource.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::AuthUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::SuperAdmin),
            other => Err(AppError::BadRequest(format!("Unknown role {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    Products,
    Reviews,
    Orders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListAll,
    Create,
    Update,
    Delete,
    ReadAny,
    ModerateAny,
    UpdateStatus,
    UpdatePayment,
    CancelAny,
}

const STAFF: &[Role] = &[Role::Admin, Role::SuperAdmin];
const NOBODY: &[Role] = &[];

/// The capability table. Pairs not listed here are denied to every role.
pub fn allowed_roles(resource: Resource, action: Action) -> &'static [Role] {
    use Action::*;
    match (resource, action) {
        (Resource::Users, ListAll) => STAFF,
        (Resource::Products, Create | Update | Delete) => STAFF,
        (Resource::Reviews, ModerateAny) => STAFF,
        (Resource::Orders, ListAll | ReadAny | UpdateStatus | UpdatePayment | CancelAny) => STAFF,
        _ => NOBODY,
    }
}

pub fn can(user: &AuthUser, resource: Resource, action: Action) -> bool {
    allowed_roles(resource, action).contains(&user.role)
}

pub fn ensure_capability(user: &AuthUser, resource: Resource, action: Action) -> Result<(), AppError> {
    if can(user, resource, action) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".into()))
    }
}

/// Passes for the owner of a record, or for anyone holding the capability.
pub fn ensure_owner_or(
    user: &AuthUser,
    owner_id: Uuid,
    resource: Resource,
    action: Action,
) -> Result<(), AppError> {
    if user.user_id == owner_id || can(user, resource, action) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".into()))
    }
}
