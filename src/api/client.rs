use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use super::envelope::{PaginatedResult, to_paginated_set};
use super::{ApiError, User};
use crate::config::AppConfig;
use crate::logging::{RequestLog, RequestLogger};
use crate::users::fetcher::UserSource;
use crate::users::query::QueryParams;

const USERS_ENDPOINT: &str = "/api/application/users";
const ACCEPT_HEADER: &str = "application/vnd.pterodactyl.v1+json";

/// Client for the panel's application API
#[derive(Debug, Clone)]
pub struct PanelClient {
    http: reqwest::Client,
    base_url: String,
    per_page: u32,
    logger: Option<RequestLogger>,
}

impl PanelClient {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            ApiError::Config(format!(
                "no API key configured; set api_key in the config file or {}",
                crate::config::API_KEY_ENV
            ))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| ApiError::Config(format!("invalid API key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .user_agent(concat!("userdeck/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.panel_url.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            logger: RequestLogger::new().ok(),
        })
    }

    pub fn with_logger(mut self, logger: RequestLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn users_url(&self) -> String {
        format!("{}{}", self.base_url, USERS_ENDPOINT)
    }

    /// Fetch one page of users matching `params`
    pub async fn list_users(
        &self,
        params: &QueryParams,
    ) -> Result<PaginatedResult<User>, ApiError> {
        let url = self.users_url();
        let mut query = params.to_query_pairs();
        query.push(("per_page".to_string(), self.per_page.to_string()));

        let started = Instant::now();
        let result = self.send(&url, &query).await;

        if let Some(logger) = &self.logger {
            let entry = RequestLog::new(&url, &params.to_query_string(), started.elapsed());
            let entry = match &result {
                Ok((status, _)) => entry.with_status(*status),
                Err(err) => entry.with_error(err),
            };
            // The log is best-effort and must not fail the request
            let _ = logger.log(&entry);
        }

        let (status, body) = result?;
        if !(200..300).contains(&status) {
            return Err(ApiError::from_response(status, &body));
        }

        to_paginated_set(&body)
    }

    async fn send(&self, url: &str, query: &[(String, String)]) -> Result<(u16, String), ApiError> {
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl UserSource for PanelClient {
    async fn list_users(&self, params: &QueryParams) -> Result<PaginatedResult<User>, ApiError> {
        PanelClient::list_users(self, params).await
    }
}
