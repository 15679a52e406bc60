// SPDX-License-Identifier: Apache-2.0

use crate::errors::ApiError;
use mldegrees_model::{
    CostTier, DegreeType, IdentityClaim, ProgramDraft, ProgramPatch, Provider, RatingValue,
    ReviewAction, Role, VoteValue,
};
use serde::{Deserialize, Serialize};

/// Sign-in callback body. Exactly one provider subject must be present;
/// the upstream verifier has already checked the credential, this service
/// only records who it was for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthRequest {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_id: Option<String>,
}

impl AuthRequest {
    pub fn claim(&self) -> Result<IdentityClaim, ApiError> {
        let (provider, subject) = match (&self.google_id, &self.github_id) {
            (Some(subject), None) => (Provider::Google, subject.clone()),
            (None, Some(subject)) => (Provider::Github, subject.clone()),
            _ => {
                return Err(ApiError::invalid_body(
                    "exactly one of google_id or github_id is required",
                ))
            }
        };
        Ok(IdentityClaim {
            email: self.email.clone(),
            name: self.name.clone(),
            provider,
            subject,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalAuthRequest {
    pub role: Role,
}

/// `vote` is -1, 0, or 1 on the wire; 0 means "remove my vote".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub program_id: i64,
    pub vote: i64,
}

impl VoteRequest {
    pub fn vote_value(&self) -> Result<Option<VoteValue>, ApiError> {
        if self.vote == 0 {
            return Ok(None);
        }
        VoteValue::parse(self.vote)
            .map(Some)
            .map_err(|e| ApiError::invalid_body(e.to_string()))
    }
}

/// `rating` is 0..=5 on the wire; 0 means "remove my rating".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateRequest {
    pub rating: i64,
}

impl RateRequest {
    pub fn rating_value(&self) -> Result<Option<RatingValue>, ApiError> {
        if self.rating == 0 {
            return Ok(None);
        }
        RatingValue::parse(self.rating)
            .map(Some)
            .map_err(|e| ApiError::invalid_body(e.to_string()))
    }
}

/// Propose a brand-new program. Degree type, country, and cost fall back
/// to catalog defaults when absent or blank; optional location fields
/// normalize blank to absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposeProgramRequest {
    pub university_name: String,
    pub program_name: String,
    pub description: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree_type: Option<DegreeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostTier>,
}

impl ProposeProgramRequest {
    #[must_use]
    pub fn draft(&self) -> ProgramDraft {
        ProgramDraft {
            university_name: self.university_name.clone(),
            name: self.program_name.clone(),
            description: self.description.clone(),
            degree_type: self.degree_type.unwrap_or_default(),
            country: self
                .country
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "United States".to_string()),
            city: self.city.clone(),
            state: self.state.clone().filter(|s| !s.is_empty()),
            url: self.url.clone().filter(|u| !u.is_empty()),
            cost: self.cost.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposalSubmitRequest {
    pub program_id: i64,
    pub proposed: ProgramPatch,
    pub reason: String,
}

/// Owner revision of a pending proposal; the proposal id rides in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposalEditRequest {
    pub proposed: ProgramPatch,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposalReviewRequest {
    pub proposal_id: i64,
    pub action: ReviewAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramActionRequest {
    pub program_id: i64,
    pub action: ReviewAction,
}
