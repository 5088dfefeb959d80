//! Free-text search parsing.
//!
//! Turns input such as `username:alice email:a@b.c` into structured filter
//! parameters for the users endpoint. Input with no recognized `field:value`
//! tokens is treated as a plain email search.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::query::QueryParams;

/// Fields the users endpoint can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Id,
    Uuid,
    ExternalId,
    Username,
    Email,
}

impl FilterField {
    pub const ALL: [FilterField; 5] = [
        FilterField::Id,
        FilterField::Uuid,
        FilterField::ExternalId,
        FilterField::Username,
        FilterField::Email,
    ];

    /// Name used both in search tokens and in the `filter[..]` query key
    pub fn as_str(self) -> &'static str {
        match self {
            FilterField::Id => "id",
            FilterField::Uuid => "uuid",
            FilterField::ExternalId => "external_id",
            FilterField::Username => "username",
            FilterField::Email => "email",
        }
    }

    /// Look up a field by its token name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value(s) to match for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Whole search string, used by the plain-text email fallback
    Exact(String),
    /// Values collected from `field:value` tokens, in token order
    AnyOf(Vec<String>),
}

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Exact(value) => value.is_empty(),
            FilterValue::AnyOf(values) => values.iter().all(String::is_empty),
        }
    }

    /// Serialized form for the `filter[field]` query parameter
    pub fn to_query_value(&self) -> String {
        match self {
            FilterValue::Exact(value) => value.clone(),
            FilterValue::AnyOf(values) => values.join(","),
        }
    }
}

/// Parse raw search input into query parameters.
///
/// Each whitespace-separated token is split on `:`; the first piece names the field
/// and the second is the value, with anything after a second `:` dropped. A token counts only
/// when both halves are non-empty and the field is known; anything else is dropped.
/// When no token counts, the whole input becomes an exact `email` filter, so
/// `parse_filters("")` still yields `{ email: "" }`.
pub fn parse_filters(input: &str) -> QueryParams {
    let mut matched: BTreeMap<FilterField, Vec<String>> = BTreeMap::new();

    for token in input.split_whitespace() {
        let mut parts = token.split(':');
        let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let Some(field) = FilterField::from_name(name) else {
            continue;
        };
        matched.entry(field).or_default().push(value.to_string());
    }

    let filters = if matched.is_empty() {
        BTreeMap::from([(FilterField::Email, FilterValue::Exact(input.to_string()))])
    } else {
        matched
            .into_iter()
            .map(|(field, values)| (field, FilterValue::AnyOf(values)))
            .collect()
    };

    QueryParams {
        filters,
        ..QueryParams::default()
    }
}
