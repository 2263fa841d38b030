//! Filter request DTO shared by the query and masterfile handlers

use masterforge_common::{
    errors::{AppError, Result},
    FilterSpec, PublicationType,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use validator::Validate;

/// Filters as accepted over HTTP
///
/// Counts are signed so that negative values can be clamped rather than
/// rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    #[validate(length(min = 1, max = 100))]
    pub protagonist_id: Option<String>,

    #[serde(default)]
    #[validate(length(max = 9))]
    pub types: Vec<String>,

    #[validate(length(max = 200))]
    pub venue_suffix: Option<String>,

    pub min_coauthor_publications_in_set: Option<i64>,

    pub focus_top_k_coauthors: Option<i64>,

    pub year_min: Option<i32>,

    pub year_max: Option<i32>,
}

impl FilterRequest {
    /// Convert into a filter for `protagonist_id`
    pub fn into_spec(self, protagonist_id: &str) -> Result<FilterSpec> {
        validated(&self)?;

        if let (Some(min), Some(max)) = (self.year_min, self.year_max) {
            if min > max {
                return Err(AppError::Validation {
                    message: format!("yearMin ({}) must not exceed yearMax ({})", min, max),
                    field: Some("yearMin".to_string()),
                });
            }
        }

        let types = self
            .types
            .iter()
            .map(|t| t.parse::<PublicationType>())
            .collect::<std::result::Result<BTreeSet<_>, _>>()
            .map_err(|message| AppError::Validation {
                message,
                field: Some("types".to_string()),
            })?;

        Ok(FilterSpec {
            protagonist_id: protagonist_id.to_string(),
            types,
            venue_suffix: self.venue_suffix,
            min_coauthor_publications_in_set: FilterSpec::clamp_count(self.min_coauthor_publications_in_set),
            focus_top_k_coauthors: FilterSpec::clamp_count(self.focus_top_k_coauthors),
            year_min: self.year_min,
            year_max: self.year_max,
        })
    }
}

/// Run `validator` rules, mapping failures to a 400
pub fn validated<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        field: e.field_errors().keys().next().map(|k| k.to_string()),
        message: e.to_string(),
    })
}
