// SPDX-License-Identifier: Apache-2.0

use crate::error::StoreError;
use mldegrees_model::{RatingSummary, RatingValue, VoteTotals, VoteValue};
use rusqlite::{params, Connection, OptionalExtension};

fn require_listable_program(conn: &Connection, program_id: i64) -> Result<(), StoreError> {
    let listable: Option<bool> = conn
        .query_row(
            "SELECT status = 'active' AND visibility = 'approved'
             FROM programs WHERE id = ?1",
            params![program_id],
            |row| row.get(0),
        )
        .optional()?;
    match listable {
        Some(true) => Ok(()),
        // Unlisted programs are indistinguishable from absent ones here;
        // feedback only targets what the public catalog shows.
        Some(false) | None => Err(StoreError::NotFound("program")),
    }
}

/// Casts, flips, toggles off, or removes the caller's vote, then returns
/// the program's refreshed totals. `None` removes outright; casting the
/// value already stored also removes (toggle); the opposite value flips.
pub fn cast_vote(
    conn: &mut Connection,
    user_id: i64,
    program_id: i64,
    vote: Option<VoteValue>,
) -> Result<VoteTotals, StoreError> {
    require_listable_program(conn, program_id)?;
    let tx = conn.transaction()?;
    match vote {
        None => {
            tx.execute(
                "DELETE FROM votes WHERE user_id = ?1 AND program_id = ?2",
                params![user_id, program_id],
            )?;
        }
        Some(value) => {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT vote FROM votes WHERE user_id = ?1 AND program_id = ?2",
                    params![user_id, program_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing == Some(value.as_i64()) {
                tx.execute(
                    "DELETE FROM votes WHERE user_id = ?1 AND program_id = ?2",
                    params![user_id, program_id],
                )?;
            } else {
                tx.execute(
                    "INSERT INTO votes (user_id, program_id, vote) VALUES (?1, ?2, ?3)
                     ON CONFLICT (user_id, program_id) DO UPDATE
                         SET vote = excluded.vote,
                             updated_at = CURRENT_TIMESTAMP",
                    params![user_id, program_id, value.as_i64()],
                )?;
            }
        }
    }
    tx.commit()?;
    vote_totals(conn, program_id)
}

pub fn vote_totals(conn: &Connection, program_id: i64) -> Result<VoteTotals, StoreError> {
    let (upvotes, downvotes): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN vote = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN vote = -1 THEN 1 ELSE 0 END), 0)
         FROM votes WHERE program_id = ?1",
        params![program_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(VoteTotals {
        upvotes,
        downvotes,
        score: upvotes - downvotes,
    })
}

/// Upserts the caller's 1-5 rating (overwrite, never accumulate) or
/// removes it when `None`, then returns the refreshed aggregate.
pub fn rate_program(
    conn: &mut Connection,
    user_id: i64,
    program_id: i64,
    rating: Option<RatingValue>,
) -> Result<RatingSummary, StoreError> {
    require_listable_program(conn, program_id)?;
    match rating {
        None => {
            conn.execute(
                "DELETE FROM ratings WHERE user_id = ?1 AND program_id = ?2",
                params![user_id, program_id],
            )?;
        }
        Some(value) => {
            conn.execute(
                "INSERT INTO ratings (user_id, program_id, rating) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, program_id) DO UPDATE
                     SET rating = excluded.rating,
                         updated_at = CURRENT_TIMESTAMP",
                params![user_id, program_id, value.as_i64()],
            )?;
        }
    }
    rating_summary(conn, program_id, Some(user_id))
}

pub fn rating_summary(
    conn: &Connection,
    program_id: i64,
    viewer: Option<i64>,
) -> Result<RatingSummary, StoreError> {
    let (average, count): (f64, i64) = conn.query_row(
        "SELECT COALESCE(AVG(rating), 0.0), COUNT(*) FROM ratings WHERE program_id = ?1",
        params![program_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let user_rating = match viewer {
        Some(user_id) => conn
            .query_row(
                "SELECT rating FROM ratings WHERE user_id = ?1 AND program_id = ?2",
                params![user_id, program_id],
                |row| row.get(0),
            )
            .optional()?,
        None => None,
    };
    Ok(RatingSummary {
        average,
        count,
        user_rating,
    })
}
