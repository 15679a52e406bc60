// SPDX-License-Identifier: Apache-2.0

use crate::error::StoreError;
use mldegrees_model::{
    CostTier, DegreeType, ParseError, Program, ProgramDraft, ProgramStatus, ProgramUpdate,
    Visibility,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Equality filters for the public catalog. Every field is optional;
/// absent fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub degree_type: Option<DegreeType>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub cost: Option<CostTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogSort {
    Rating,
    Name,
    CreatedAt,
}

impl CatalogSort {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "rating" => Ok(Self::Rating),
            "name" => Ok(Self::Name),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(ParseError::InvalidFormat(
                "sort_by must be one of 'rating', 'name', 'created_at'",
            )),
        }
    }
}

impl Default for CatalogSort {
    fn default() -> Self {
        Self::Rating
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ParseError::InvalidFormat(
                "sort_order must be one of 'asc', 'desc'",
            )),
        }
    }

    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub filter: CatalogFilter,
    pub sort: CatalogSort,
    pub order: Option<SortOrder>,
}

impl CatalogQuery {
    /// Explicit order wins; otherwise ratings and recency list best-first
    /// while names read alphabetically.
    #[must_use]
    pub fn effective_order(&self) -> SortOrder {
        self.order.unwrap_or(match self.sort {
            CatalogSort::Name => SortOrder::Asc,
            CatalogSort::Rating | CatalogSort::CreatedAt => SortOrder::Desc,
        })
    }
}

/// Sort keys for the admin all-programs view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AdminSort {
    Name,
    UniversityName,
    DegreeType,
    Country,
    Visibility,
    CreatedAt,
}

impl AdminSort {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "name" => Ok(Self::Name),
            "university_name" => Ok(Self::UniversityName),
            "degree_type" => Ok(Self::DegreeType),
            "country" => Ok(Self::Country),
            "visibility" => Ok(Self::Visibility),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(ParseError::InvalidFormat(
                "sort_by must be one of 'name', 'university_name', 'degree_type', \
                 'country', 'visibility', 'created_at'",
            )),
        }
    }
}

impl Default for AdminSort {
    fn default() -> Self {
        Self::CreatedAt
    }
}

const PROGRAM_SELECT: &str = "SELECT p.id, p.university_id, u.name, p.name, p.description,
            p.degree_type, p.country, p.city, p.state, p.url, p.cost,
            p.status, p.visibility,
            COALESCE(AVG(r.rating), 0.0) AS average_rating,
            p.created_at, p.updated_at
     FROM programs p
     JOIN universities u ON u.id = p.university_id
     LEFT JOIN ratings r ON r.program_id = p.id";

const PROGRAM_GROUP_BY: &str = " GROUP BY p.id, u.name";

fn text_column<T>(
    idx: usize,
    raw: &str,
    parse: fn(&str) -> Result<T, ParseError>,
) -> rusqlite::Result<T> {
    parse(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn map_program_row(row: &Row<'_>) -> rusqlite::Result<Program> {
    let degree_raw: String = row.get(5)?;
    let cost_raw: String = row.get(10)?;
    let status_raw: String = row.get(11)?;
    let visibility_raw: String = row.get(12)?;
    Ok(Program {
        id: row.get(0)?,
        university_id: row.get(1)?,
        university_name: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        degree_type: text_column(5, &degree_raw, DegreeType::parse)?,
        country: row.get(6)?,
        city: row.get(7)?,
        state: row.get(8)?,
        url: row.get(9)?,
        cost: text_column(10, &cost_raw, CostTier::parse)?,
        status: text_column(11, &status_raw, ProgramStatus::parse)?,
        visibility: text_column(12, &visibility_raw, Visibility::parse)?,
        average_rating: row.get(13)?,
        user_vote: None,
        user_rating: None,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn placeholders(count: usize) -> String {
    let mut out = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

/// Public catalog listing: active, approved programs with university name
/// and rating average, equality-filtered and sorted per the query. When a
/// viewer is given, their own votes and ratings are merged onto the rows.
pub fn list_public_programs(
    conn: &Connection,
    query: &CatalogQuery,
    viewer: Option<i64>,
) -> Result<Vec<Program>, StoreError> {
    let mut sql = String::from(PROGRAM_SELECT);
    let mut where_parts: Vec<String> = vec![
        "p.status = 'active'".to_string(),
        "p.visibility = 'approved'".to_string(),
    ];
    let mut params: Vec<Value> = Vec::new();

    if let Some(degree_type) = query.filter.degree_type {
        where_parts.push("p.degree_type = ?".to_string());
        params.push(Value::Text(degree_type.as_str().to_string()));
    }
    if let Some(country) = &query.filter.country {
        where_parts.push("p.country = ?".to_string());
        params.push(Value::Text(country.clone()));
    }
    if let Some(city) = &query.filter.city {
        where_parts.push("p.city = ?".to_string());
        params.push(Value::Text(city.clone()));
    }
    if let Some(state) = &query.filter.state {
        where_parts.push("p.state = ?".to_string());
        params.push(Value::Text(state.clone()));
    }
    if let Some(cost) = query.filter.cost {
        where_parts.push("p.cost = ?".to_string());
        params.push(Value::Text(cost.as_str().to_string()));
    }

    sql.push_str(" WHERE ");
    sql.push_str(&where_parts.join(" AND "));
    sql.push_str(PROGRAM_GROUP_BY);

    let order = query.effective_order().as_sql();
    match query.sort {
        CatalogSort::Rating => {
            sql.push_str(&format!(" ORDER BY average_rating {order}, p.id"));
        }
        CatalogSort::Name => {
            sql.push_str(&format!(" ORDER BY LOWER(p.name) {order}, p.id"));
        }
        CatalogSort::CreatedAt => {
            sql.push_str(&format!(" ORDER BY p.created_at {order}, p.id"));
        }
    }

    let mut stmt = conn.prepare_cached(&sql)?;
    let mapped = stmt.query_map(params_from_iter(params.iter()), map_program_row)?;
    let mut programs = mapped.collect::<Result<Vec<_>, _>>()?;

    if let Some(user_id) = viewer {
        attach_viewer_feedback(conn, user_id, &mut programs)?;
    }
    Ok(programs)
}

fn attach_viewer_feedback(
    conn: &Connection,
    user_id: i64,
    programs: &mut [Program],
) -> Result<(), StoreError> {
    if programs.is_empty() {
        return Ok(());
    }
    let mut params: Vec<Value> = Vec::with_capacity(programs.len() + 1);
    params.push(Value::Integer(user_id));
    for program in programs.iter() {
        params.push(Value::Integer(program.id));
    }
    let marks = placeholders(programs.len());

    let votes_sql = format!(
        "SELECT program_id, vote FROM votes WHERE user_id = ? AND program_id IN ({marks})"
    );
    let mut stmt = conn.prepare_cached(&votes_sql)?;
    let votes: HashMap<i64, i64> = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;

    let ratings_sql = format!(
        "SELECT program_id, rating FROM ratings WHERE user_id = ? AND program_id IN ({marks})"
    );
    let mut stmt = conn.prepare_cached(&ratings_sql)?;
    let ratings: HashMap<i64, i64> = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;

    for program in programs.iter_mut() {
        program.user_vote = votes.get(&program.id).copied();
        program.user_rating = ratings.get(&program.id).copied();
    }
    Ok(())
}

/// Single program with university and rating average, regardless of
/// visibility. Used by the admin surface and for post-mutation reads.
pub fn get_program(
    conn: &Connection,
    program_id: i64,
    viewer: Option<i64>,
) -> Result<Program, StoreError> {
    let sql = format!("{PROGRAM_SELECT} WHERE p.id = ?1{PROGRAM_GROUP_BY}");
    let program = conn
        .query_row(&sql, params![program_id], map_program_row)
        .optional()?;
    let mut program = program.ok_or(StoreError::NotFound("program"))?;
    if let Some(user_id) = viewer {
        attach_viewer_feedback(conn, user_id, std::slice::from_mut(&mut program))?;
    }
    Ok(program)
}

/// Programs awaiting visibility moderation, newest first.
pub fn list_pending_programs(conn: &Connection) -> Result<Vec<Program>, StoreError> {
    let sql = format!(
        "{PROGRAM_SELECT} WHERE p.visibility = 'pending'{PROGRAM_GROUP_BY} ORDER BY p.created_at DESC, p.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let mapped = stmt.query_map([], map_program_row)?;
    Ok(mapped.collect::<Result<Vec<_>, _>>()?)
}

/// Admin view over every active program, whatever its visibility.
pub fn list_all_programs(
    conn: &Connection,
    sort: AdminSort,
    order: SortOrder,
) -> Result<Vec<Program>, StoreError> {
    let order_sql = order.as_sql();
    let order_clause = match sort {
        AdminSort::Name => format!(" ORDER BY LOWER(p.name) {order_sql}, p.id"),
        AdminSort::UniversityName => format!(" ORDER BY LOWER(u.name) {order_sql}, p.id"),
        AdminSort::DegreeType => format!(" ORDER BY p.degree_type {order_sql}, p.id"),
        AdminSort::Country => format!(" ORDER BY p.country {order_sql}, p.id"),
        AdminSort::Visibility => format!(" ORDER BY p.visibility {order_sql}, p.id"),
        AdminSort::CreatedAt => format!(" ORDER BY p.created_at {order_sql}, p.id"),
    };
    let sql = format!(
        "{PROGRAM_SELECT} WHERE p.status = 'active'{PROGRAM_GROUP_BY}{order_clause}"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let mapped = stmt.query_map([], map_program_row)?;
    Ok(mapped.collect::<Result<Vec<_>, _>>()?)
}

fn find_or_create_university(conn: &Connection, name: &str) -> Result<i64, StoreError> {
    let id = conn.query_row(
        "INSERT INTO universities (name) VALUES (?1)
         ON CONFLICT (name) DO UPDATE SET name = excluded.name
         RETURNING id",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Inserts a user-proposed program. The row starts active but with
/// `pending` visibility, so it stays off the public catalog until an
/// admin approves it.
pub fn create_program(conn: &mut Connection, draft: &ProgramDraft) -> Result<Program, StoreError> {
    draft.validate()?;
    let tx = conn.transaction()?;
    let university_id = find_or_create_university(&tx, &draft.university_name)?;
    tx.execute(
        "INSERT INTO programs
             (university_id, name, description, degree_type, country, city, state, url, cost,
              status, visibility)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', 'pending')",
        params![
            university_id,
            draft.name,
            draft.description,
            draft.degree_type.as_str(),
            draft.country,
            draft.city,
            draft.state,
            draft.url,
            draft.cost.as_str(),
        ],
    )?;
    let program_id = tx.last_insert_rowid();
    tx.commit()?;
    get_program(conn, program_id, None)
}

/// Admin full-row overwrite. Every field is written; the university is
/// resolved (or created) from its name.
pub fn update_program(
    conn: &mut Connection,
    update: &ProgramUpdate,
) -> Result<Program, StoreError> {
    update.validate()?;
    let tx = conn.transaction()?;
    let university_id = find_or_create_university(&tx, &update.university_name)?;
    let changed = tx.execute(
        "UPDATE programs
         SET university_id = ?1, name = ?2, description = ?3, degree_type = ?4,
             country = ?5, city = ?6, state = ?7, url = ?8, cost = ?9,
             status = ?10, visibility = ?11, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?12",
        params![
            university_id,
            update.name,
            update.description,
            update.degree_type.as_str(),
            update.country,
            update.city,
            update.state,
            update.url,
            update.cost.as_str(),
            update.status.as_str(),
            update.visibility.as_str(),
            update.id,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound("program"));
    }
    tx.commit()?;
    get_program(conn, update.id, None)
}
