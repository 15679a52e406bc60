use crate::program::ParseError;
use serde::{Deserialize, Serialize};

pub const VOTE_DOWN: i64 = -1;
pub const VOTE_UP: i64 = 1;
pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;

/// Directional ±1 preference. The wire accepts 0 as well, meaning
/// "remove my vote"; that case never reaches this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn parse(raw: i64) -> Result<Self, ParseError> {
        match raw {
            VOTE_UP => Ok(Self::Up),
            VOTE_DOWN => Ok(Self::Down),
            other => Err(ParseError::OutOfRange("vote", other)),
        }
    }

    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Up => VOTE_UP,
            Self::Down => VOTE_DOWN,
        }
    }
}

/// Star rating in 1..=5. Resubmission overwrites; the wire value 0 means
/// "remove my rating" and never reaches this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingValue(i64);

impl RatingValue {
    pub fn parse(raw: i64) -> Result<Self, ParseError> {
        if (RATING_MIN..=RATING_MAX).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(ParseError::OutOfRange("rating", raw))
        }
    }

    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteTotals {
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i64>,
}
