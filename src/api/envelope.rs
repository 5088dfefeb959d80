//! Fractal list envelopes.
//!
//! The application API wraps every list as
//! `{ object: "list", data: [{ object, attributes }], meta: { pagination } }`.
//! Callers only ever see the flattened [`PaginatedResult`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::users::pagination::PageDescriptor;

#[derive(Debug, Deserialize)]
pub struct FractalList<T> {
    #[serde(default)]
    pub object: String,
    pub data: Vec<FractalItem<T>>,
    pub meta: FractalMeta,
}

#[derive(Debug, Deserialize)]
pub struct FractalItem<T> {
    #[serde(default)]
    pub object: String,
    pub attributes: T,
}

#[derive(Debug, Deserialize)]
pub struct FractalMeta {
    pub pagination: FractalPagination,
}

#[derive(Debug, Deserialize)]
pub struct FractalPagination {
    pub total: u64,
    pub count: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

impl From<FractalPagination> for PageDescriptor {
    fn from(p: FractalPagination) -> Self {
        PageDescriptor {
            current_page: p.current_page,
            per_page: p.per_page,
            count: p.count,
            total: p.total,
            total_pages: p.total_pages,
        }
    }
}

/// One page of items plus where it sits in the full result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub pagination: PageDescriptor,
}

impl<T> From<FractalList<T>> for PaginatedResult<T> {
    fn from(list: FractalList<T>) -> Self {
        PaginatedResult {
            items: list.data.into_iter().map(|item| item.attributes).collect(),
            pagination: list.meta.pagination.into(),
        }
    }
}

/// Decode a raw list body into a paginated result
pub fn to_paginated_set<T: DeserializeOwned>(body: &str) -> Result<PaginatedResult<T>, ApiError> {
    let list: FractalList<T> =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(list.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::User;

    const BODY: &str = r#"{
        "object": "list",
        "data": [
            {
                "object": "user",
                "attributes": {
                    "id": 1,
                    "external_id": null,
                    "uuid": "c4022c6c-9bf1-4a23-bff9-519cceb38335",
                    "username": "admin",
                    "email": "admin@example.com",
                    "first_name": "Admin",
                    "last_name": "User",
                    "language": "en",
                    "root_admin": true,
                    "2fa": false,
                    "created_at": "2021-01-01T12:00:00+00:00",
                    "updated_at": "2021-02-01T12:00:00+00:00"
                }
            },
            {
                "object": "user",
                "attributes": {
                    "id": 2,
                    "external_id": "ext-2",
                    "uuid": "7a1b1ea5-0a7c-4a2e-9f57-64b1e4e7f3a1",
                    "username": "bob",
                    "email": "bob@example.com",
                    "root_admin": false,
                    "2fa": true,
                    "created_at": "2021-03-01T08:30:00Z"
                }
            }
        ],
        "meta": {
            "pagination": {
                "total": 12,
                "count": 2,
                "per_page": 2,
                "current_page": 1,
                "total_pages": 6,
                "links": {}
            }
        }
    }"#;

    #[test]
    fn test_users_envelope_is_flattened() {
        let page: PaginatedResult<User> = to_paginated_set(BODY).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].username, "admin");
        assert!(page.items[0].root_admin);
        assert_eq!(page.items[1].external_id.as_deref(), Some("ext-2"));
        assert!(page.items[1].use_totp);
        assert_eq!(page.items[1].language, "en");
        assert!(page.items[1].updated_at.is_none());
        assert_eq!(
            page.pagination,
            PageDescriptor {
                current_page: 1,
                per_page: 2,
                count: 2,
                total: 12,
                total_pages: 6,
            }
        );
    }

    #[test]
    fn test_missing_meta_is_decode_error() {
        let result = to_paginated_set::<User>(r#"{"object":"list","data":[]}"#);
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }
}
