use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::filters::{FilterField, FilterValue};

/// Columns the users endpoint can sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Id,
    Uuid,
    Username,
    Email,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Uuid => "uuid",
            SortField::Username => "username",
            SortField::Email => "email",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sort field '{0}' (expected id, uuid, username, email, created_at or updated_at)")]
pub struct ParseSortError(String);

/// Sort order in the `field` / `-field` notation used by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sort {
    pub field: SortField,
    pub descending: bool,
}

impl FromStr for Sort {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let field = match name {
            "id" => SortField::Id,
            "uuid" => SortField::Uuid,
            "username" => SortField::Username,
            "email" => SortField::Email,
            "created_at" => SortField::CreatedAt,
            "updated_at" => SortField::UpdatedAt,
            _ => return Err(ParseSortError(s.to_string())),
        };

        Ok(Sort { field, descending })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(self.field.as_str())
    }
}

impl Serialize for Sort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identity of one users request. Requests with equal keys are served from
/// the same cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<all>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Filter, page and sort parameters for the users endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryParams {
    pub filters: BTreeMap<FilterField, FilterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

impl QueryParams {
    /// Page 1 is the server default and is left out of the request.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = (page > 1).then_some(page);
        self
    }

    pub fn with_sort(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    /// Query pairs in a stable order. Empty filters are omitted.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .filters
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(field, value)| (format!("filter[{field}]"), value.to_query_value()))
            .collect();

        if let Some(sort) = self.sort {
            pairs.push(("sort".to_string(), sort.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }

        pairs
    }

    /// URL-encoded query string without a leading `?`
    pub fn to_query_string(&self) -> String {
        self.to_query_pairs()
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parameters that produce the same request share a key.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(self.to_query_string())
    }
}
