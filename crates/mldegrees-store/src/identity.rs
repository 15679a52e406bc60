// SPDX-License-Identifier: Apache-2.0

use crate::error::StoreError;
use mldegrees_model::{IdentityClaim, Provider, Role, User};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_COLUMNS: &str =
    "id, email, name, google_id, github_id, role, created_at, updated_at";

pub(crate) fn map_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_raw: String = row.get(5)?;
    let role = Role::parse(&role_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        google_id: row.get(3)?,
        github_id: row.get(4)?,
        role,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Upserts a user row keyed on the provider subject. Repeat sign-ins
/// refresh email and display name; the stored role is never touched by
/// this path. The users table carries two unique keys (email and the
/// subject), so the row is located by subject first and then written.
pub fn upsert_identity(conn: &Connection, claim: &IdentityClaim) -> Result<User, StoreError> {
    claim.validate()?;
    let column = if claim.provider == Provider::Google {
        "google_id"
    } else {
        "github_id"
    };
    let existing: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM users WHERE {column} = ?1"),
            params![claim.subject],
            |row| row.get(0),
        )
        .optional()?;
    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE users SET email = ?1, name = ?2, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?3",
                params![claim.email, claim.name, id],
            )?;
            get_user(conn, id)
        }
        None => {
            let sql = format!(
                "INSERT INTO users (email, name, {column}) VALUES (?1, ?2, ?3)
                 RETURNING {USER_COLUMNS}"
            );
            let user = conn.query_row(
                &sql,
                params![claim.email, claim.name, claim.subject],
                map_user_row,
            )?;
            Ok(user)
        }
    }
}

/// Development-only sign-in: provisions `{role}@local.dev` with a
/// predictable subject and forces the stored role, so a fresh database can
/// be driven as either role without a provider round-trip. Returns the
/// user and the bearer token to present.
pub fn upsert_local_identity(
    conn: &Connection,
    role: Role,
) -> Result<(User, String), StoreError> {
    let email = format!("{}@local.dev", role.as_str());
    let name = if role == Role::Admin {
        "Local Admin"
    } else {
        "Local User"
    };
    let subject = format!("local_{email}");
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE google_id = ?1",
            params![subject],
            |row| row.get(0),
        )
        .optional()?;
    let user = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE users SET role = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![role.as_str(), id],
            )?;
            get_user(conn, id)?
        }
        None => {
            let sql = format!(
                "INSERT INTO users (email, name, google_id, role) VALUES (?1, ?2, ?3, ?4)
                 RETURNING {USER_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![email, name, subject, role.as_str()],
                map_user_row,
            )?
        }
    };
    Ok((user, subject))
}

/// Resolves a bearer token (a provider subject) to a user. Unknown tokens
/// resolve to `None`; the request proceeds anonymously.
pub fn find_user_by_subject(
    conn: &Connection,
    subject: &str,
) -> Result<Option<User>, StoreError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE google_id = ?1 OR github_id = ?1"
    );
    let user = conn
        .query_row(&sql, params![subject], map_user_row)
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<User, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, params![user_id], map_user_row)
        .optional()?
        .ok_or(StoreError::NotFound("user"))
}
