// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const NAME_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 8192;
pub const LOCATION_MAX_LEN: usize = 120;
pub const URL_MAX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    Empty(&'static str),
    Trimmed(&'static str),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
    OutOfRange(&'static str, i64),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(name) => write!(f, "{name} must not be empty"),
            Self::Trimmed(name) => {
                write!(f, "{name} must not contain leading/trailing whitespace")
            }
            Self::TooLong(name, max) => write!(f, "{name} exceeds max length {max}"),
            Self::InvalidFormat(msg) => f.write_str(msg),
            Self::OutOfRange(name, got) => write!(f, "{name} out of range: {got}"),
        }
    }
}

impl std::error::Error for ParseError {}

pub(crate) fn check_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ParseError> {
    if value.trim().is_empty() {
        return Err(ParseError::Empty(field));
    }
    if value.trim() != value {
        return Err(ParseError::Trimmed(field));
    }
    if value.len() > max_len {
        return Err(ParseError::TooLong(field, max_len));
    }
    Ok(())
}

pub(crate) fn check_optional_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ParseError> {
    if value.len() > max_len {
        return Err(ParseError::TooLong(field, max_len));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DegreeType {
    Bachelors,
    Masters,
    Phd,
    Certificate,
}

impl DegreeType {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "bachelors" => Ok(Self::Bachelors),
            "masters" => Ok(Self::Masters),
            "phd" => Ok(Self::Phd),
            "certificate" => Ok(Self::Certificate),
            _ => Err(ParseError::InvalidFormat(
                "degree_type must be one of 'bachelors', 'masters', 'phd', 'certificate'",
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bachelors => "bachelors",
            Self::Masters => "masters",
            Self::Phd => "phd",
            Self::Certificate => "certificate",
        }
    }
}

impl Default for DegreeType {
    fn default() -> Self {
        Self::Masters
    }
}

/// Price bracket shown in the catalog; the tiers are display labels, not
/// currency amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CostTier {
    #[serde(rename = "Free")]
    Free,
    #[serde(rename = "$")]
    Low,
    #[serde(rename = "$$")]
    Medium,
    #[serde(rename = "$$$")]
    High,
}

impl CostTier {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "Free" => Ok(Self::Free),
            "$" => Ok(Self::Low),
            "$$" => Ok(Self::Medium),
            "$$$" => Ok(Self::High),
            _ => Err(ParseError::InvalidFormat(
                "cost must be one of 'Free', '$', '$$', '$$$'",
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Low => "$",
            Self::Medium => "$$",
            Self::High => "$$$",
        }
    }
}

impl Default for CostTier {
    fn default() -> Self {
        Self::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ProgramStatus {
    Active,
    Inactive,
}

impl ProgramStatus {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ParseError::InvalidFormat(
                "status must be one of 'active', 'inactive'",
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Moderation gate controlling public listing. A program is publicly
/// listable only when `status = active` and `visibility = approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Visibility {
    Pending,
    Approved,
    Rejected,
}

impl Visibility {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseError::InvalidFormat(
                "visibility must be one of 'pending', 'approved', 'rejected'",
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
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Program {
    pub id: i64,
    pub university_id: i64,
    pub university_name: String,
    pub name: String,
    pub description: String,
    pub degree_type: DegreeType,
    pub country: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub cost: CostTier,
    pub status: ProgramStatus,
    pub visibility: Visibility,
    pub average_rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Program {
    #[must_use]
    pub fn is_publicly_listable(&self) -> bool {
        self.status == ProgramStatus::Active && self.visibility == Visibility::Approved
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        check_text("name", &self.name, NAME_MAX_LEN)?;
        check_text("description", &self.description, DESCRIPTION_MAX_LEN)?;
        check_text("country", &self.country, LOCATION_MAX_LEN)?;
        check_text("city", &self.city, LOCATION_MAX_LEN)?;
        if let Some(state) = &self.state {
            check_optional_text("state", state, LOCATION_MAX_LEN)?;
        }
        if let Some(url) = &self.url {
            check_optional_text("url", url, URL_MAX_LEN)?;
        }
        if !(0.0..=5.0).contains(&self.average_rating) {
            return Err(ParseError::InvalidFormat(
                "average_rating must be within 0.0..=5.0",
            ));
        }
        Ok(())
    }
}

/// Input for the propose-new-program path. Carries user-supplied fields
/// after defaults have been applied; the created row starts at
/// `visibility = pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramDraft {
    pub university_name: String,
    pub name: String,
    pub description: String,
    pub degree_type: DegreeType,
    pub country: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub cost: CostTier,
}

impl ProgramDraft {
    pub fn validate(&self) -> Result<(), ParseError> {
        check_text("university_name", &self.university_name, NAME_MAX_LEN)?;
        check_text("name", &self.name, NAME_MAX_LEN)?;
        check_text("description", &self.description, DESCRIPTION_MAX_LEN)?;
        check_text("country", &self.country, LOCATION_MAX_LEN)?;
        check_text("city", &self.city, LOCATION_MAX_LEN)?;
        if let Some(state) = &self.state {
            check_optional_text("state", state, LOCATION_MAX_LEN)?;
        }
        if let Some(url) = &self.url {
            check_optional_text("url", url, URL_MAX_LEN)?;
        }
        Ok(())
    }
}

/// Full-row overwrite used by the admin program-management path. Unlike
/// [`crate::ProgramPatch`] every field is mandatory; absent optionals
/// clear the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramUpdate {
    pub id: i64,
    pub university_name: String,
    pub name: String,
    pub description: String,
    pub degree_type: DegreeType,
    pub country: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub cost: CostTier,
    pub status: ProgramStatus,
    pub visibility: Visibility,
}

impl ProgramUpdate {
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.id <= 0 {
            return Err(ParseError::OutOfRange("id", self.id));
        }
        check_text("university_name", &self.university_name, NAME_MAX_LEN)?;
        check_text("name", &self.name, NAME_MAX_LEN)?;
        check_text("description", &self.description, DESCRIPTION_MAX_LEN)?;
        check_text("country", &self.country, LOCATION_MAX_LEN)?;
        check_text("city", &self.city, LOCATION_MAX_LEN)?;
        if let Some(state) = &self.state {
            check_optional_text("state", state, LOCATION_MAX_LEN)?;
        }
        if let Some(url) = &self.url {
            check_optional_text("url", url, URL_MAX_LEN)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_program() -> Program {
        Program {
            id: 1,
            university_id: 1,
            university_name: "Stanford University".to_string(),
            name: "MS in Computer Science".to_string(),
            description: "AI specialization".to_string(),
            degree_type: DegreeType::Masters,
            country: "United States".to_string(),
            city: "Stanford".to_string(),
            state: Some("CA".to_string()),
            url: None,
            cost: CostTier::High,
            status: ProgramStatus::Active,
            visibility: Visibility::Approved,
            average_rating: 4.5,
            user_vote: None,
            user_rating: None,
            created_at: "2024-01-01 00:00:00".to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn degree_type_parse_round_trips() {
        for raw in ["bachelors", "masters", "phd", "certificate"] {
            let parsed = DegreeType::parse(raw).expect("degree type");
            assert_eq!(parsed.as_str(), raw);
        }
        assert!(DegreeType::parse("doctorate").is_err());
        assert!(DegreeType::parse("Masters").is_err());
    }

    #[test]
    fn cost_tier_serializes_as_display_label() {
        let json = serde_json::to_string(&CostTier::Medium).expect("serialize");
        assert_eq!(json, "\"$$\"");
        let back: CostTier = serde_json::from_str("\"Free\"").expect("deserialize");
        assert_eq!(back, CostTier::Free);
        assert!(serde_json::from_str::<CostTier>("\"$$$$\"").is_err());
    }

    #[test]
    fn public_listing_requires_active_and_approved() {
        let mut p = sample_program();
        assert!(p.is_publicly_listable());
        p.status = ProgramStatus::Inactive;
        assert!(!p.is_publicly_listable());
        p.status = ProgramStatus::Active;
        p.visibility = Visibility::Pending;
        assert!(!p.is_publicly_listable());
    }

    #[test]
    fn program_validate_rejects_blank_required_fields() {
        let mut p = sample_program();
        p.city = "  ".to_string();
        assert_eq!(p.validate(), Err(ParseError::Empty("city")));
    }

    #[test]
    fn program_validate_rejects_out_of_range_average() {
        let mut p = sample_program();
        p.average_rating = 5.1;
        assert!(p.validate().is_err());
    }

    #[test]
    fn draft_validate_caps_url_length() {
        let draft = ProgramDraft {
            university_name: "MIT".to_string(),
            name: "PhD in EECS".to_string(),
            description: "Research".to_string(),
            degree_type: DegreeType::Phd,
            country: "United States".to_string(),
            city: "Cambridge".to_string(),
            state: Some("MA".to_string()),
            url: Some("x".repeat(URL_MAX_LEN + 1)),
            cost: CostTier::Free,
        };
        assert_eq!(
            draft.validate(),
            Err(ParseError::TooLong("url", URL_MAX_LEN))
        );
    }
}
