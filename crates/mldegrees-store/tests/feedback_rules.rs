// SPDX-License-Identifier: Apache-2.0

use mldegrees_model::{
    CostTier, DegreeType, IdentityClaim, ProgramDraft, Provider, RatingValue, ReviewAction, Role,
    VoteValue,
};
use mldegrees_store::{
    cast_vote, create_program, open_in_memory, rate_program, rating_summary,
    set_program_visibility, upsert_identity, upsert_local_identity, vote_totals, StoreError,
};
use rusqlite::Connection;

fn listed_program(conn: &mut Connection) -> i64 {
    let program = create_program(
        conn,
        &ProgramDraft {
            university_name: "MIT".to_string(),
            name: "MS in Machine Learning".to_string(),
            description: "Graduate machine learning curriculum".to_string(),
            degree_type: DegreeType::Masters,
            country: "United States".to_string(),
            city: "Cambridge".to_string(),
            state: Some("MA".to_string()),
            url: None,
            cost: CostTier::High,
        },
    )
    .expect("create");
    set_program_visibility(conn, program.id, ReviewAction::Approve).expect("approve");
    program.id
}

fn up() -> Option<VoteValue> {
    Some(VoteValue::parse(1).expect("up"))
}

fn down() -> Option<VoteValue> {
    Some(VoteValue::parse(-1).expect("down"))
}

#[test]
fn vote_cast_toggle_and_flip() {
    let mut conn = open_in_memory().expect("open");
    let program = listed_program(&mut conn);
    let (voter, _) = upsert_local_identity(&conn, Role::User).expect("voter");

    let totals = cast_vote(&mut conn, voter.id, program, up()).expect("cast");
    assert_eq!((totals.upvotes, totals.downvotes, totals.score), (1, 0, 1));

    // Same value again removes the vote.
    let totals = cast_vote(&mut conn, voter.id, program, up()).expect("toggle");
    assert_eq!((totals.upvotes, totals.downvotes, totals.score), (0, 0, 0));

    let totals = cast_vote(&mut conn, voter.id, program, down()).expect("down");
    assert_eq!((totals.upvotes, totals.downvotes, totals.score), (0, 1, -1));

    // Opposite value flips in place, never double-counts.
    let totals = cast_vote(&mut conn, voter.id, program, up()).expect("flip");
    assert_eq!((totals.upvotes, totals.downvotes, totals.score), (1, 0, 1));
    let stored: i64 = conn
        .query_row("SELECT COUNT(*) FROM votes", [], |row| row.get(0))
        .expect("count");
    assert_eq!(stored, 1);
}

#[test]
fn explicit_remove_clears_the_vote() {
    let mut conn = open_in_memory().expect("open");
    let program = listed_program(&mut conn);
    let (voter, _) = upsert_local_identity(&conn, Role::User).expect("voter");

    cast_vote(&mut conn, voter.id, program, down()).expect("cast");
    let totals = cast_vote(&mut conn, voter.id, program, None).expect("remove");
    assert_eq!((totals.upvotes, totals.downvotes, totals.score), (0, 0, 0));
    // Removing when nothing is stored stays quiet.
    let totals = cast_vote(&mut conn, voter.id, program, None).expect("remove again");
    assert_eq!(totals.score, 0);
}

#[test]
fn votes_aggregate_across_users() {
    let mut conn = open_in_memory().expect("open");
    let program = listed_program(&mut conn);
    let (a, _) = upsert_local_identity(&conn, Role::User).expect("a");
    let b = upsert_identity(
        &conn,
        &IdentityClaim {
            email: "b@example.com".to_string(),
            name: "Bee".to_string(),
            provider: Provider::Github,
            subject: "gh-b".to_string(),
        },
    )
    .expect("b");

    cast_vote(&mut conn, a.id, program, up()).expect("a up");
    cast_vote(&mut conn, b.id, program, down()).expect("b down");
    let totals = vote_totals(&conn, program).expect("totals");
    assert_eq!((totals.upvotes, totals.downvotes, totals.score), (1, 1, 0));
}

#[test]
fn feedback_targets_must_be_publicly_listed() {
    let mut conn = open_in_memory().expect("open");
    let unapproved = create_program(
        &mut conn,
        &ProgramDraft {
            university_name: "CMU".to_string(),
            name: "MS in AI".to_string(),
            description: "Pending program".to_string(),
            degree_type: DegreeType::Masters,
            country: "United States".to_string(),
            city: "Pittsburgh".to_string(),
            state: None,
            url: None,
            cost: CostTier::High,
        },
    )
    .expect("create")
    .id;
    let (voter, _) = upsert_local_identity(&conn, Role::User).expect("voter");

    assert_eq!(
        cast_vote(&mut conn, voter.id, unapproved, up()).expect_err("pending"),
        StoreError::NotFound("program")
    );
    assert_eq!(
        rate_program(
            &mut conn,
            voter.id,
            unapproved,
            Some(RatingValue::parse(5).expect("rating")),
        )
        .expect_err("pending"),
        StoreError::NotFound("program")
    );
    assert_eq!(
        cast_vote(&mut conn, voter.id, 9_999, up()).expect_err("absent"),
        StoreError::NotFound("program")
    );
}

#[test]
fn rating_overwrites_instead_of_accumulating() {
    let mut conn = open_in_memory().expect("open");
    let program = listed_program(&mut conn);
    let (rater, _) = upsert_local_identity(&conn, Role::User).expect("rater");

    let summary = rate_program(
        &mut conn,
        rater.id,
        program,
        Some(RatingValue::parse(5).expect("rating")),
    )
    .expect("rate");
    assert_eq!(summary.count, 1);
    assert!((summary.average - 5.0).abs() < 1e-9);
    assert_eq!(summary.user_rating, Some(5));

    let summary = rate_program(
        &mut conn,
        rater.id,
        program,
        Some(RatingValue::parse(3).expect("rating")),
    )
    .expect("re-rate");
    assert_eq!(summary.count, 1);
    assert!((summary.average - 3.0).abs() < 1e-9);
    assert_eq!(summary.user_rating, Some(3));
}

#[test]
fn rating_average_spans_users_and_removal_recomputes() {
    let mut conn = open_in_memory().expect("open");
    let program = listed_program(&mut conn);
    let (a, _) = upsert_local_identity(&conn, Role::User).expect("a");
    let b = upsert_identity(
        &conn,
        &IdentityClaim {
            email: "b@example.com".to_string(),
            name: "Bee".to_string(),
            provider: Provider::Google,
            subject: "g-b".to_string(),
        },
    )
    .expect("b");

    rate_program(
        &mut conn,
        a.id,
        program,
        Some(RatingValue::parse(5).expect("rating")),
    )
    .expect("a rates");
    let summary = rate_program(
        &mut conn,
        b.id,
        program,
        Some(RatingValue::parse(2).expect("rating")),
    )
    .expect("b rates");
    assert_eq!(summary.count, 2);
    assert!((summary.average - 3.5).abs() < 1e-9);
    assert_eq!(summary.user_rating, Some(2));

    let summary = rate_program(&mut conn, a.id, program, None).expect("a removes");
    assert_eq!(summary.count, 1);
    assert!((summary.average - 2.0).abs() < 1e-9);
    assert_eq!(summary.user_rating, None);

    let fresh = rating_summary(&conn, program, None).expect("summary");
    assert_eq!(fresh.count, 1);
    assert_eq!(fresh.user_rating, None);
}
