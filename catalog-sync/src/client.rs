#![doc = "Shopware Admin API client: bridges the core Catalog contract to the real HTTP endpoints."]
//
//! # Catalog Client (CLI <-> Core)
//!
//! This module wires the [`Catalog`] trait from `catalog-sync-core` to a Shopware-style
//! Admin API over HTTP. The core crate stays transport-agnostic; everything about URLs,
//! headers and response shapes lives here.
//!
//! ## Endpoints
//!
//! - `POST /api/oauth/token`: password grant, yields a bearer token
//! - `POST /api/search/{entity}`: equality filter on `productNumber`
//! - `POST /api/{entity}`: create, id from `data.id` or the `Location` header
//! - `PATCH /api/{entity}/{id}`: partial update
//!
//! The bearer token is fetched lazily on first use and kept for the lifetime of the
//! client. Any non-2xx answer becomes [`CatalogError::Status`] carrying the body text.

use async_trait::async_trait;
use catalog_sync_core::contract::{Catalog, ProductPayload, RemoteItem};
use catalog_sync_core::error::CatalogError;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

const CLIENT_ID: &str = "administration";
const ENTITY: &str = "product";
const BUSINESS_KEY_FIELD: &str = "productNumber";

/// Resolved connection settings.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'static str,
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<RemoteItem>,
}

#[derive(Deserialize)]
struct CreateResponse {
    data: Option<CreatedEntity>,
}

#[derive(Deserialize)]
struct CreatedEntity {
    id: String,
}

pub struct ShopwareClient {
    http: reqwest::Client,
    config: ApiConfig,
    token: Option<String>,
}

impl ShopwareClient {
    pub fn new(config: ApiConfig) -> Self {
        tracing::info!(
            base_url = %config.base_url,
            username = %config.username,
            password_set = !config.password.is_empty(),
            "Initialized ShopwareClient"
        );
        Self {
            http: reqwest::Client::new(),
            config,
            token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url, path)
    }

    async fn ensure_authenticated(&mut self) -> Result<String, CatalogError> {
        if self.token.is_none() {
            self.authenticate().await?;
        }
        self.token
            .clone()
            .ok_or_else(|| CatalogError::Auth("no access token after authentication".into()))
    }

    async fn authorised(&mut self, request: RequestBuilder) -> Result<Response, CatalogError> {
        let token = self.ensure_authenticated().await?;
        let response = request
            .header(ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = status.as_u16(), body = %body, "Catalog API answered with an error");
    Err(CatalogError::Status {
        status: status.as_u16(),
        body,
    })
}

fn id_from_location(response: &Response) -> Option<String> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Catalog for ShopwareClient {
    async fn authenticate(&mut self) -> Result<(), CatalogError> {
        tracing::info!(base_url = %self.config.base_url, "Requesting access token");
        let body = TokenRequest {
            grant_type: "password",
            client_id: CLIENT_ID,
            username: &self.config.username,
            password: &self.config.password,
        };

        let response = self
            .http
            .post(self.url("oauth/token"))
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Authentication rejected");
            return Err(CatalogError::Auth(format!(
                "token endpoint answered {}: {}",
                status.as_u16(),
                text
            )));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| CatalogError::Response(format!("unreadable token response: {e}")))?
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CatalogError::Auth("token response carried no access_token".into()))?;

        self.token = Some(token);
        tracing::info!("Authentication successful");
        Ok(())
    }

    async fn find_by_business_key(&mut self, key: &str) -> Result<Option<RemoteItem>, CatalogError> {
        let body = json!({
            "filter": [
                { "type": "equals", "field": BUSINESS_KEY_FIELD, "value": key }
            ]
        });
        let request = self
            .http
            .post(self.url(&format!("search/{ENTITY}")))
            .json(&body);
        let response = self.authorised(request).await?;

        let found = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| CatalogError::Response(format!("unreadable search response: {e}")))?
            .data
            .into_iter()
            .next();
        tracing::debug!(product_number = key, found = found.is_some(), "Search finished");
        Ok(found)
    }

    async fn create(&mut self, payload: &ProductPayload) -> Result<String, CatalogError> {
        let request = self.http.post(self.url(ENTITY)).json(payload);
        let response = self.authorised(request).await?;

        let from_header = id_from_location(&response);
        let text = response.text().await?;
        let from_body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<CreateResponse>(&text)
                .ok()
                .and_then(|r| r.data)
                .map(|d| d.id)
        };

        let id = from_body.or(from_header).ok_or_else(|| {
            CatalogError::Response("create answered without an id in body or Location".into())
        })?;
        tracing::info!(product_number = %payload.product_number, id = %id, "Product created");
        Ok(id)
    }

    async fn update(&mut self, id: &str, payload: &ProductPayload) -> Result<(), CatalogError> {
        let request = self
            .http
            .patch(self.url(&format!("{ENTITY}/{id}")))
            .json(payload);
        self.authorised(request).await?;
        tracing::info!(product_number = %payload.product_number, id, "Product updated");
        Ok(())
    }
}
