// SPDX-License-Identifier: Apache-2.0

use crate::errors::ApiError;
use mldegrees_model::{CostTier, DegreeType, ProposalStatus};
use mldegrees_store::{AdminSort, CatalogFilter, CatalogQuery, CatalogSort, SortOrder};
use std::collections::BTreeMap;

/// Empty values behave as absent; browsers send `?country=` for a cleared
/// picker and that must not filter everything out.
fn non_empty<'a>(query: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

pub fn parse_catalog_params(query: &BTreeMap<String, String>) -> Result<CatalogQuery, ApiError> {
    let degree_type = non_empty(query, "degree_type")
        .map(|raw| DegreeType::parse(raw).map_err(|_| ApiError::invalid_param("degree_type", raw)))
        .transpose()?;
    let cost = non_empty(query, "cost")
        .map(|raw| CostTier::parse(raw).map_err(|_| ApiError::invalid_param("cost", raw)))
        .transpose()?;
    let sort = non_empty(query, "sort_by")
        .map(|raw| CatalogSort::parse(raw).map_err(|_| ApiError::invalid_param("sort_by", raw)))
        .transpose()?
        .unwrap_or_default();
    let order = non_empty(query, "sort_order")
        .map(|raw| SortOrder::parse(raw).map_err(|_| ApiError::invalid_param("sort_order", raw)))
        .transpose()?;

    Ok(CatalogQuery {
        filter: CatalogFilter {
            degree_type,
            country: non_empty(query, "country").map(str::to_string),
            city: non_empty(query, "city").map(str::to_string),
            state: non_empty(query, "state").map(str::to_string),
            cost,
        },
        sort,
        order,
    })
}

/// Admin all-programs listing: wider sort vocabulary, same empty-is-absent
/// convention. Recency sorts newest first unless the caller says otherwise.
pub fn parse_admin_catalog_params(
    query: &BTreeMap<String, String>,
) -> Result<(AdminSort, SortOrder), ApiError> {
    let sort = non_empty(query, "sort_by")
        .map(|raw| AdminSort::parse(raw).map_err(|_| ApiError::invalid_param("sort_by", raw)))
        .transpose()?
        .unwrap_or_default();
    let order = non_empty(query, "sort_order")
        .map(|raw| SortOrder::parse(raw).map_err(|_| ApiError::invalid_param("sort_order", raw)))
        .transpose()?
        .unwrap_or(match sort {
            AdminSort::CreatedAt => SortOrder::Desc,
            _ => SortOrder::Asc,
        });
    Ok((sort, order))
}

/// Review queue status selector, defaulting to the queue admins act on.
pub fn parse_review_status_param(
    query: &BTreeMap<String, String>,
) -> Result<ProposalStatus, ApiError> {
    non_empty(query, "status")
        .map(|raw| ProposalStatus::parse(raw).map_err(|_| ApiError::invalid_param("status", raw)))
        .transpose()
        .map(|status| status.unwrap_or(ProposalStatus::Pending))
}

pub fn parse_path_id(raw: &str, name: &'static str) -> Result<i64, ApiError> {
    let id = raw
        .parse::<i64>()
        .map_err(|_| ApiError::invalid_param(name, raw))?;
    if id <= 0 {
        return Err(ApiError::invalid_param(name, raw));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiErrorCode;

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let parsed = parse_catalog_params(&query(&[])).expect("parse");
        assert_eq!(parsed.sort, CatalogSort::Rating);
        assert_eq!(parsed.order, None);
        assert_eq!(parsed.filter, CatalogFilter::default());
    }

    #[test]
    fn empty_values_are_treated_as_absent() {
        let parsed = parse_catalog_params(&query(&[("country", ""), ("sort_by", "")]))
            .expect("parse");
        assert_eq!(parsed.filter.country, None);
        assert_eq!(parsed.sort, CatalogSort::Rating);
    }

    #[test]
    fn filters_and_sorts_parse_together() {
        let parsed = parse_catalog_params(&query(&[
            ("degree_type", "phd"),
            ("country", "Canada"),
            ("cost", "$$"),
            ("sort_by", "name"),
            ("sort_order", "desc"),
        ]))
        .expect("parse");
        assert_eq!(parsed.filter.degree_type, Some(DegreeType::Phd));
        assert_eq!(parsed.filter.country.as_deref(), Some("Canada"));
        assert_eq!(parsed.filter.cost, Some(CostTier::Medium));
        assert_eq!(parsed.sort, CatalogSort::Name);
        assert_eq!(parsed.order, Some(SortOrder::Desc));
    }

    #[test]
    fn unknown_enum_values_are_rejected_with_the_parameter_name() {
        let err = parse_catalog_params(&query(&[("sort_by", "sneaky; DROP TABLE programs")]))
            .expect_err("reject");
        assert_eq!(err.code, ApiErrorCode::ValidationFailed);
        assert_eq!(err.details["parameter"], "sort_by");

        let err = parse_catalog_params(&query(&[("cost", "$$$$")])).expect_err("reject");
        assert_eq!(err.details["parameter"], "cost");
    }

    #[test]
    fn admin_sort_defaults_follow_the_key() {
        let (sort, order) = parse_admin_catalog_params(&query(&[])).expect("parse");
        assert_eq!(sort, AdminSort::CreatedAt);
        assert_eq!(order, SortOrder::Desc);

        let (sort, order) =
            parse_admin_catalog_params(&query(&[("sort_by", "university_name")])).expect("parse");
        assert_eq!(sort, AdminSort::UniversityName);
        assert_eq!(order, SortOrder::Asc);
    }

    #[test]
    fn review_status_defaults_to_pending() {
        assert_eq!(
            parse_review_status_param(&query(&[])).expect("parse"),
            ProposalStatus::Pending
        );
        assert_eq!(
            parse_review_status_param(&query(&[("status", "rejected")])).expect("parse"),
            ProposalStatus::Rejected
        );
        assert!(parse_review_status_param(&query(&[("status", "all")])).is_err());
    }

    #[test]
    fn path_ids_must_be_positive_integers() {
        assert_eq!(parse_path_id("7", "id").expect("parse"), 7);
        assert!(parse_path_id("0", "id").is_err());
        assert!(parse_path_id("-3", "id").is_err());
        assert!(parse_path_id("seven", "id").is_err());
    }
}
