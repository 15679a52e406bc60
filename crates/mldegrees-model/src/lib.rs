#![forbid(unsafe_code)]
//! Domain model for the mldegrees catalog.
//!
//! Single source of truth for the entity shapes shared by the store, the
//! wire contract, and the server: catalog programs, identities, votes and
//! ratings, and the moderated proposal workflow. Parsing and validation
//! live here so that every boundary rejects malformed values the same way.
//!
//! ```compile_fail
//! use mldegrees_model::ProposalStatus;
//!
//! fn exhaustive_match(s: ProposalStatus) -> &'static str {
//!     match s {
//!         ProposalStatus::Pending => "p",
//!         ProposalStatus::Approved => "a",
//!         ProposalStatus::Rejected => "r",
//!     }
//! }
//! ```

mod feedback;
mod program;
mod proposal;
mod user;

pub use feedback::{
    RatingSummary, RatingValue, VoteTotals, VoteValue, RATING_MAX, RATING_MIN, VOTE_DOWN, VOTE_UP,
};
pub use program::{
    CostTier, DegreeType, ParseError, Program, ProgramDraft, ProgramStatus, ProgramUpdate,
    Visibility, DESCRIPTION_MAX_LEN, LOCATION_MAX_LEN, NAME_MAX_LEN, URL_MAX_LEN,
};
pub use proposal::{
    check_admin_notes, check_reason, ProgramPatch, ProgramProposal, ProposalStatus, ReviewAction,
    ADMIN_NOTES_MAX_LEN, REASON_MAX_LEN,
};
pub use user::{IdentityClaim, Provider, Role, User, EMAIL_MAX_LEN};

pub const CRATE_NAME: &str = "mldegrees-model";
