#![forbid(unsafe_code)]
//! SQLite persistence for the mldegrees catalog.
//!
//! Every function here is a synchronous operation on a [`rusqlite`]
//! connection; callers that live in async land serialize access through
//! their own lock. Functions taking `&mut Connection` run a transaction,
//! functions taking `&Connection` are single statements or plain reads.
//! Writers that race over the same row settle it in SQL: conditional
//! `UPDATE ... WHERE status = 'pending'` claims, not read-then-write.

mod catalog;
mod db;
mod error;
mod feedback;
mod identity;
mod proposals;

pub use catalog::{
    create_program, get_program, list_all_programs, list_pending_programs, list_public_programs,
    update_program, AdminSort, CatalogFilter, CatalogQuery, CatalogSort, SortOrder,
};
pub use db::{apply_migrations, open, open_in_memory, ping};
pub use error::StoreError;
pub use feedback::{cast_vote, rate_program, rating_summary, vote_totals};
pub use identity::{find_user_by_subject, get_user, upsert_identity, upsert_local_identity};
pub use proposals::{
    create_proposal, delete_own_proposal, list_proposals, list_user_proposals, review_proposal,
    set_program_visibility, update_own_proposal,
};

pub const CRATE_NAME: &str = "mldegrees-store";
