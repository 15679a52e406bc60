#![forbid(unsafe_code)]
//! Wire contract for the mldegrees backend.
//!
//! Everything a client can send or receive is defined here: strict request
//! DTOs, the [`ApiError`] envelope with its status mapping, and the
//! query-string parsers for catalog and admin listings. The crate is pure
//! data; it never touches the network or the database.

mod error_mapping;
mod errors;
mod params;
mod requests;

pub use error_mapping::map_error;
pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    parse_admin_catalog_params, parse_catalog_params, parse_path_id, parse_review_status_param,
};
pub use requests::{
    AuthRequest, LocalAuthRequest, ProgramActionRequest, ProposalEditRequest,
    ProposalReviewRequest, ProposalSubmitRequest, ProposeProgramRequest, RateRequest, VoteRequest,
};

pub const CRATE_NAME: &str = "mldegrees-api";
