//! Fixtures shared by the users tests

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use super::fetcher::{UserPage, UserSource};
use super::filters::{FilterField, FilterValue};
use super::pagination::PageDescriptor;
use super::query::QueryParams;
use crate::api::{ApiError, PaginatedResult, User};

pub fn user(id: u64, username: &str) -> User {
    User {
        id,
        uuid: Uuid::from_u128(u128::from(id)),
        external_id: None,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        language: "en".to_string(),
        root_admin: id == 1,
        use_totp: id % 2 == 0,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        updated_at: None,
    }
}

/// In-memory users endpoint: username filters match by substring, pages are sliced
pub struct StubSource {
    users: Vec<User>,
    per_page: u64,
    calls: Mutex<Vec<QueryParams>>,
}

impl StubSource {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            users: (1..=count).map(|id| user(id, &format!("user{id}"))).collect(),
            per_page,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<QueryParams> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserSource for StubSource {
    async fn list_users(&self, params: &QueryParams) -> Result<UserPage, ApiError> {
        self.calls.lock().unwrap().push(params.clone());

        let matching: Vec<&User> = match params.filters.get(&FilterField::Username) {
            Some(FilterValue::AnyOf(values)) => self
                .users
                .iter()
                .filter(|user| values.iter().any(|value| user.username.contains(value.as_str())))
                .collect(),
            _ => self.users.iter().collect(),
        };

        let total = matching.len() as u64;
        let current_page = u64::from(params.page.unwrap_or(1));
        let offset = ((current_page - 1) * self.per_page) as usize;
        let items: Vec<User> = matching
            .into_iter()
            .skip(offset)
            .take(self.per_page as usize)
            .cloned()
            .collect();

        Ok(PaginatedResult {
            pagination: PageDescriptor {
                current_page,
                per_page: self.per_page,
                count: items.len() as u64,
                total,
                total_pages: total.div_ceil(self.per_page),
            },
            items,
        })
    }
}
