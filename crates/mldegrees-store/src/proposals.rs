// SPDX-License-Identifier: Apache-2.0

use crate::error::StoreError;
use mldegrees_model::{
    check_admin_notes, check_reason, CostTier, DegreeType, ParseError, ProgramPatch,
    ProgramProposal, ProposalStatus, ReviewAction, Visibility,
};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

const PROPOSAL_SELECT: &str = "SELECT pp.id, pp.program_id, pp.user_id,
            pp.proposed_name, pp.proposed_description, pp.proposed_degree_type,
            pp.proposed_country, pp.proposed_city, pp.proposed_state,
            pp.proposed_url, pp.proposed_cost,
            pp.reason, pp.status, pp.admin_notes, pp.reviewed_by, pp.reviewed_at,
            pp.created_at, pp.updated_at,
            u.name, u.email, p.name, univ.name, reviewer.name
     FROM program_proposals pp
     JOIN users u ON u.id = pp.user_id
     JOIN programs p ON p.id = pp.program_id
     JOIN universities univ ON univ.id = p.university_id
     LEFT JOIN users reviewer ON reviewer.id = pp.reviewed_by";

fn text_column<T>(
    idx: usize,
    raw: &str,
    parse: fn(&str) -> Result<T, ParseError>,
) -> rusqlite::Result<T> {
    parse(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn optional_text_column<T>(
    idx: usize,
    raw: Option<String>,
    parse: fn(&str) -> Result<T, ParseError>,
) -> rusqlite::Result<Option<T>> {
    raw.map(|value| text_column(idx, &value, parse)).transpose()
}

fn map_proposal_row(row: &Row<'_>) -> rusqlite::Result<ProgramProposal> {
    let degree_raw: Option<String> = row.get(5)?;
    let cost_raw: Option<String> = row.get(10)?;
    let status_raw: String = row.get(12)?;
    let proposed = ProgramPatch {
        name: row.get(3)?,
        description: row.get(4)?,
        degree_type: optional_text_column(5, degree_raw, DegreeType::parse)?,
        country: row.get(6)?,
        city: row.get(7)?,
        state: row.get(8)?,
        url: row.get(9)?,
        cost: optional_text_column(10, cost_raw, CostTier::parse)?,
    };
    Ok(ProgramProposal {
        id: row.get(0)?,
        program_id: row.get(1)?,
        user_id: row.get(2)?,
        proposed,
        reason: row.get(11)?,
        status: text_column(12, &status_raw, ProposalStatus::parse)?,
        admin_notes: row.get(13)?,
        reviewed_by: row.get(14)?,
        reviewed_at: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
        user_name: row.get(18)?,
        user_email: row.get(19)?,
        program_name: row.get(20)?,
        university_name: row.get(21)?,
        reviewer_name: row.get(22)?,
    })
}

fn get_proposal(conn: &Connection, proposal_id: i64) -> Result<ProgramProposal, StoreError> {
    let sql = format!("{PROPOSAL_SELECT} WHERE pp.id = ?1");
    conn.query_row(&sql, params![proposal_id], map_proposal_row)
        .optional()?
        .ok_or(StoreError::NotFound("proposal"))
}

/// Stores a new `pending` proposal against an existing program. The patch
/// must carry at least one field and the reason must be non-empty; both
/// are rechecked here so no caller can slip an empty proposal past the
/// boundary.
pub fn create_proposal(
    conn: &Connection,
    user_id: i64,
    program_id: i64,
    patch: &ProgramPatch,
    reason: &str,
) -> Result<ProgramProposal, StoreError> {
    patch.validate()?;
    check_reason(reason)?;
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM programs WHERE id = ?1",
            params![program_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(StoreError::NotFound("program"));
    }
    let proposal_id: i64 = conn.query_row(
        "INSERT INTO program_proposals
             (program_id, user_id, proposed_name, proposed_description,
              proposed_degree_type, proposed_country, proposed_city, proposed_state,
              proposed_url, proposed_cost, reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         RETURNING id",
        params![
            program_id,
            user_id,
            patch.name,
            patch.description,
            patch.degree_type.map(DegreeType::as_str),
            patch.country,
            patch.city,
            patch.state,
            patch.url,
            patch.cost.map(CostTier::as_str),
            reason,
        ],
        |row| row.get(0),
    )?;
    get_proposal(conn, proposal_id)
}

/// Proposals in the given status, newest first, with submitter, program,
/// university, and reviewer names for the review screen.
pub fn list_proposals(
    conn: &Connection,
    status: ProposalStatus,
) -> Result<Vec<ProgramProposal>, StoreError> {
    let sql = format!("{PROPOSAL_SELECT} WHERE pp.status = ?1 ORDER BY pp.created_at DESC, pp.id DESC");
    let mut stmt = conn.prepare_cached(&sql)?;
    let mapped = stmt.query_map(params![status.as_str()], map_proposal_row)?;
    Ok(mapped.collect::<Result<Vec<_>, _>>()?)
}

/// Everything the user has submitted, newest first, any status.
pub fn list_user_proposals(
    conn: &Connection,
    user_id: i64,
) -> Result<Vec<ProgramProposal>, StoreError> {
    let sql = format!("{PROPOSAL_SELECT} WHERE pp.user_id = ?1 ORDER BY pp.created_at DESC, pp.id DESC");
    let mut stmt = conn.prepare_cached(&sql)?;
    let mapped = stmt.query_map(params![user_id], map_proposal_row)?;
    Ok(mapped.collect::<Result<Vec<_>, _>>()?)
}

struct OwnershipCheck {
    user_id: i64,
    status: ProposalStatus,
}

fn ownership_check(tx: &Transaction<'_>, proposal_id: i64) -> Result<OwnershipCheck, StoreError> {
    let row: Option<(i64, String)> = tx
        .query_row(
            "SELECT user_id, status FROM program_proposals WHERE id = ?1",
            params![proposal_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (user_id, status_raw) = row.ok_or(StoreError::NotFound("proposal"))?;
    Ok(OwnershipCheck {
        user_id,
        status: ProposalStatus::parse(&status_raw)?,
    })
}

/// Owner revises a still-pending proposal in place. Terminal proposals,
/// rejected ones included, are immutable through this path.
pub fn update_own_proposal(
    conn: &mut Connection,
    user_id: i64,
    proposal_id: i64,
    patch: &ProgramPatch,
    reason: &str,
) -> Result<ProgramProposal, StoreError> {
    patch.validate()?;
    check_reason(reason)?;
    let tx = conn.transaction()?;
    let current = ownership_check(&tx, proposal_id)?;
    if current.user_id != user_id {
        return Err(StoreError::Forbidden("proposal belongs to another user"));
    }
    if current.status != ProposalStatus::Pending {
        return Err(StoreError::Conflict("only pending proposals can be edited"));
    }
    tx.execute(
        "UPDATE program_proposals
         SET proposed_name = ?1, proposed_description = ?2, proposed_degree_type = ?3,
             proposed_country = ?4, proposed_city = ?5, proposed_state = ?6,
             proposed_url = ?7, proposed_cost = ?8, reason = ?9,
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?10",
        params![
            patch.name,
            patch.description,
            patch.degree_type.map(DegreeType::as_str),
            patch.country,
            patch.city,
            patch.state,
            patch.url,
            patch.cost.map(CostTier::as_str),
            reason,
            proposal_id,
        ],
    )?;
    tx.commit()?;
    get_proposal(conn, proposal_id)
}

/// Owner withdraws a proposal. Pending and rejected proposals may go;
/// approved ones are immutable history.
pub fn delete_own_proposal(
    conn: &mut Connection,
    user_id: i64,
    proposal_id: i64,
) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    let current = ownership_check(&tx, proposal_id)?;
    if current.user_id != user_id {
        return Err(StoreError::Forbidden("proposal belongs to another user"));
    }
    if current.status == ProposalStatus::Approved {
        return Err(StoreError::Conflict(
            "approved proposals cannot be deleted",
        ));
    }
    tx.execute(
        "DELETE FROM program_proposals WHERE id = ?1",
        params![proposal_id],
    )?;
    tx.commit()?;
    Ok(())
}

/// Adjudicates a pending proposal. The terminal transition is claimed
/// with a conditional update so that of two racing reviews exactly one
/// succeeds; on approval the stored patch is applied onto the target
/// program inside the same transaction. Fields the patch does not carry
/// are left untouched.
pub fn review_proposal(
    conn: &mut Connection,
    admin_id: i64,
    proposal_id: i64,
    action: ReviewAction,
    admin_notes: Option<&str>,
) -> Result<ProgramProposal, StoreError> {
    if let Some(notes) = admin_notes {
        check_admin_notes(notes)?;
    }
    let tx = conn.transaction()?;
    let claimed = tx.execute(
        "UPDATE program_proposals
         SET status = ?1, admin_notes = ?2, reviewed_by = ?3,
             reviewed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?4 AND status = 'pending'",
        params![
            action.terminal_status().as_str(),
            admin_notes,
            admin_id,
            proposal_id,
        ],
    )?;
    if claimed == 0 {
        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM program_proposals WHERE id = ?1",
                params![proposal_id],
                |row| row.get(0),
            )
            .optional()?;
        return Err(match exists {
            Some(_) => StoreError::Conflict("proposal already reviewed"),
            None => StoreError::NotFound("proposal"),
        });
    }

    if action == ReviewAction::Approve {
        let sql = format!("{PROPOSAL_SELECT} WHERE pp.id = ?1");
        let proposal = tx.query_row(&sql, params![proposal_id], map_proposal_row)?;
        apply_patch(&tx, proposal.program_id, &proposal.proposed)?;
    }
    tx.commit()?;
    get_proposal(conn, proposal_id)
}

fn apply_patch(
    tx: &Transaction<'_>,
    program_id: i64,
    patch: &ProgramPatch,
) -> Result<(), StoreError> {
    let mut sets: Vec<String> = vec!["updated_at = CURRENT_TIMESTAMP".to_string()];
    let mut params: Vec<Value> = Vec::new();

    if let Some(name) = &patch.name {
        sets.push(format!("name = ?{}", params.len() + 1));
        params.push(Value::Text(name.clone()));
    }
    if let Some(description) = &patch.description {
        sets.push(format!("description = ?{}", params.len() + 1));
        params.push(Value::Text(description.clone()));
    }
    if let Some(degree_type) = patch.degree_type {
        sets.push(format!("degree_type = ?{}", params.len() + 1));
        params.push(Value::Text(degree_type.as_str().to_string()));
    }
    if let Some(country) = &patch.country {
        sets.push(format!("country = ?{}", params.len() + 1));
        params.push(Value::Text(country.clone()));
    }
    if let Some(city) = &patch.city {
        sets.push(format!("city = ?{}", params.len() + 1));
        params.push(Value::Text(city.clone()));
    }
    if let Some(state) = &patch.state {
        sets.push(format!("state = ?{}", params.len() + 1));
        params.push(Value::Text(state.clone()));
    }
    if let Some(url) = &patch.url {
        sets.push(format!("url = ?{}", params.len() + 1));
        params.push(Value::Text(url.clone()));
    }
    if let Some(cost) = patch.cost {
        sets.push(format!("cost = ?{}", params.len() + 1));
        params.push(Value::Text(cost.as_str().to_string()));
    }

    let sql = format!(
        "UPDATE programs SET {} WHERE id = ?{}",
        sets.join(", "),
        params.len() + 1
    );
    params.push(Value::Integer(program_id));
    let changed = tx.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
    if changed == 0 {
        return Err(StoreError::NotFound("program"));
    }
    Ok(())
}

/// Direct visibility moderation for freshly proposed programs. Guarded by
/// the same pending-only claim as proposal review: once a program is
/// approved or rejected, repeating the action reports a conflict instead
/// of silently rewriting the terminal state.
pub fn set_program_visibility(
    conn: &mut Connection,
    program_id: i64,
    action: ReviewAction,
) -> Result<(), StoreError> {
    let decided = if action == ReviewAction::Approve {
        Visibility::Approved
    } else {
        Visibility::Rejected
    };
    let tx = conn.transaction()?;
    let claimed = tx.execute(
        "UPDATE programs
         SET visibility = ?1, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?2 AND visibility = 'pending'",
        params![decided.as_str(), program_id],
    )?;
    if claimed == 0 {
        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM programs WHERE id = ?1",
                params![program_id],
                |row| row.get(0),
            )
            .optional()?;
        return Err(match exists {
            Some(_) => StoreError::Conflict("program visibility already decided"),
            None => StoreError::NotFound("program"),
        });
    }
    tx.commit()?;
    Ok(())
}
