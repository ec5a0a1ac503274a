use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{}`", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Admin => "admin",
        })
    }
}

/// Who is making the current request. Built once per request by the
/// authorization middleware and passed explicitly to every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    pub subject_id: String,
    pub email: String,
    pub role: Role,
}

impl IdentityContext {
    pub fn new(subject_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins act on any owner; users only on themselves.
    pub fn authorize_owner(&self, owner_id: &str) -> Result<(), AppError> {
        if self.is_admin() || self.subject_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "{} may not act on resources of {}",
                self.subject_id, owner_id
            )))
        }
    }

    /// Same rule as `authorize_owner`, keyed by email.
    pub fn authorize_email(&self, email: &str) -> Result<(), AppError> {
        if self.is_admin() || self.email == email {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "{} may not act on resources of {}",
                self.email, email
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Unauthorized("admin role required".into()))
        }
    }
}
