// SPDX-License-Identifier: Apache-2.0

use crate::program::{
    check_optional_text, check_text, CostTier, DegreeType, ParseError, DESCRIPTION_MAX_LEN,
    LOCATION_MAX_LEN, NAME_MAX_LEN, URL_MAX_LEN,
};
use serde::{Deserialize, Serialize};

pub const REASON_MAX_LEN: usize = 2000;
pub const ADMIN_NOTES_MAX_LEN: usize = 2000;

/// Validates a submitter's reason. Every proposal must say why.
pub fn check_reason(reason: &str) -> Result<(), ParseError> {
    check_text("reason", reason, REASON_MAX_LEN)
}

/// Validates moderator notes. Notes are optional and may be blank.
pub fn check_admin_notes(notes: &str) -> Result<(), ParseError> {
    check_optional_text("admin_notes", notes, ADMIN_NOTES_MAX_LEN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseError::InvalidFormat(
                "proposal status must be one of 'pending', 'approved', 'rejected'",
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Terminal states never transition again; only `pending` rows may be
    /// reviewed, and only `pending` rows may be edited by their owner.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseError::InvalidFormat(
                "action must be one of 'approve', 'reject'",
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    #[must_use]
    pub fn terminal_status(self) -> ProposalStatus {
        match self {
            Self::Approve => ProposalStatus::Approved,
            Self::Reject => ProposalStatus::Rejected,
        }
    }
}

/// Sparse field patch for a program. Only populated fields are proposed;
/// applying a patch overwrites exactly those fields and leaves the rest of
/// the row untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree_type: Option<DegreeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostTier>,
}

impl ProgramPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.degree_type.is_none()
            && self.country.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.url.is_none()
            && self.cost.is_none()
    }

    /// Names of the populated fields, in schema column order.
    #[must_use]
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.degree_type.is_some() {
            fields.push("degree_type");
        }
        if self.country.is_some() {
            fields.push("country");
        }
        if self.city.is_some() {
            fields.push("city");
        }
        if self.state.is_some() {
            fields.push("state");
        }
        if self.url.is_some() {
            fields.push("url");
        }
        if self.cost.is_some() {
            fields.push("cost");
        }
        fields
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if self.is_empty() {
            return Err(ParseError::InvalidFormat(
                "at least one proposed field must be set",
            ));
        }
        if let Some(name) = &self.name {
            check_text("name", name, NAME_MAX_LEN)?;
        }
        if let Some(description) = &self.description {
            check_text("description", description, DESCRIPTION_MAX_LEN)?;
        }
        if let Some(country) = &self.country {
            check_text("country", country, LOCATION_MAX_LEN)?;
        }
        if let Some(city) = &self.city {
            check_text("city", city, LOCATION_MAX_LEN)?;
        }
        if let Some(state) = &self.state {
            check_optional_text("state", state, LOCATION_MAX_LEN)?;
        }
        if let Some(url) = &self.url {
            check_optional_text("url", url, URL_MAX_LEN)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramProposal {
    pub id: i64,
    pub program_id: i64,
    pub user_id: i64,
    pub proposed: ProgramPatch,
    pub reason: String,
    pub status: ProposalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_name: Option<String>,
}

impl ProgramProposal {
    pub fn validate(&self) -> Result<(), ParseError> {
        self.proposed.validate()?;
        check_reason(&self.reason)?;
        if let Some(notes) = &self.admin_notes {
            check_admin_notes(notes)?;
        }
        if self.status.is_terminal() && self.reviewed_by.is_none() {
            return Err(ParseError::InvalidFormat(
                "reviewed proposals must record the reviewer",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_is_rejected_regardless_of_other_fields() {
        let patch = ProgramPatch::default();
        assert!(patch.is_empty());
        assert!(patch.validate().is_err());
    }

    #[test]
    fn patch_with_one_field_lists_exactly_that_field() {
        let patch = ProgramPatch {
            city: Some("Seattle".to_string()),
            ..ProgramPatch::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(patch.present_fields(), vec!["city"]);
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn patch_rejects_blank_populated_field() {
        let patch = ProgramPatch {
            name: Some(String::new()),
            ..ProgramPatch::default()
        };
        assert_eq!(patch.validate(), Err(ParseError::Empty("name")));
    }

    #[test]
    fn patch_serde_omits_absent_fields() {
        let patch = ProgramPatch {
            city: Some("Seattle".to_string()),
            ..ProgramPatch::default()
        };
        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(json, serde_json::json!({"city": "Seattle"}));
        let back: ProgramPatch = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, patch);
    }

    #[test]
    fn patch_deserialization_rejects_unknown_fields() {
        let raw = serde_json::json!({"tuition": "$$"});
        assert!(serde_json::from_value::<ProgramPatch>(raw).is_err());
    }

    #[test]
    fn review_action_maps_to_terminal_status() {
        assert_eq!(
            ReviewAction::Approve.terminal_status(),
            ProposalStatus::Approved
        );
        assert_eq!(
            ReviewAction::Reject.terminal_status(),
            ProposalStatus::Rejected
        );
        assert!(ProposalStatus::Approved.is_terminal());
        assert!(ProposalStatus::Rejected.is_terminal());
        assert!(!ProposalStatus::Pending.is_terminal());
    }
}
