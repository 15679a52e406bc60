// SPDX-License-Identifier: Apache-2.0

use crate::program::{check_text, ParseError, NAME_MAX_LEN};
use serde::{Deserialize, Serialize};

pub const EMAIL_MAX_LEN: usize = 254;
pub const SUBJECT_MAX_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseError::InvalidFormat(
                "role must be one of 'user', 'admin'",
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            _ => Err(ParseError::InvalidFormat(
                "provider must be one of 'google', 'github'",
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_id: Option<String>,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Verified sign-in claim handed over by the upstream identity provider.
/// The subject is the provider-scoped stable identifier; the workflow
/// trusts it as authoritative and upserts the user row keyed on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaim {
    pub email: String,
    pub name: String,
    pub provider: Provider,
    pub subject: String,
}

impl IdentityClaim {
    pub fn validate(&self) -> Result<(), ParseError> {
        check_text("email", &self.email, EMAIL_MAX_LEN)?;
        if !self.email.contains('@') {
            return Err(ParseError::InvalidFormat("email must contain '@'"));
        }
        check_text("name", &self.name, NAME_MAX_LEN)?;
        check_text("subject", &self.subject, SUBJECT_MAX_LEN)?;
        Ok(())
    }
}
