//! HTTP client for the inventory backend
//!
//! Uses async reqwest. The base URL is configurable so tests can point the
//! client at a mock server.

use super::models::{AuthoritativeRecord, Domain, Workspace};
use crate::error::{InventoryError, Result};
use serde::Deserialize;

const TOKEN_PATH: &str = "/oauth/token";
const USER_CONTEXT_PATH: &str = "/api/webshell/workspaces";
const INVENTORY_BROWSE_PATH: &str = "/api/qracore/browses";
const INVENTORY_BROWSE_ID: &str = "urn:browse:mfg:aa800";

/// Columns requested from the location detail browse
const INVENTORY_FIELDS: &str = "ld_det.ld_domain,ld_det.ld_site,ld_det.ld_loc,ld_det.ld_part,\
ld_det.ld_lot,ld_det.ld_status,ld_det.ld_grade,ld_det.ld_assay,ld_det.ld_expire,\
ld_det.ld_qty_oh,ld_det.ld_qty_all,ld_det.ld_ref,pt_mstr.pt_desc1,pt_mstr.pt_desc2,pt_mstr.pt_um";

const PAGE_SIZE: u32 = 1000;

const USER_AGENT: &str = "offline_inventory/1.0";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserContext {
    #[serde(rename = "qad-qracore", default)]
    workspaces: Option<Vec<Workspace>>,
}

/// Browse responses come either wrapped in `{"data": [...]}` or as a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BrowseResponse {
    Wrapped { data: Vec<AuthoritativeRecord> },
    Bare(Vec<AuthoritativeRecord>),
}

/// Client for the backend's token, user context and browse endpoints
#[derive(Debug, Clone)]
pub struct QadClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
}

impl QadClient {
    pub fn new(base_url: &str, client_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange username and password for an access token (OAuth password grant)
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        log::info!("Authenticating {}", username);

        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .header("User-Agent", USER_AGENT)
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            log::warn!("Authentication rejected: {}", response.status());
            return Err(InventoryError::Auth);
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            log::warn!("Unexpected token response: {}", e);
            InventoryError::Auth
        })?;
        Ok(token.access_token)
    }

    /// List the domains available to the token's user
    pub async fn fetch_domains(&self, token: &str) -> Result<Vec<Domain>> {
        let response = self
            .http
            .get(self.url(USER_CONTEXT_PATH))
            .header("User-Agent", USER_AGENT)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InventoryError::HttpStatus(response.status()));
        }

        let context: UserContext = response.json().await?;
        match context.workspaces {
            Some(workspaces) => {
                let domains: Vec<Domain> = workspaces.into_iter().map(Domain::from).collect();
                log::info!("Fetched {} domains", domains.len());
                Ok(domains)
            }
            None => {
                log::warn!("Unexpected domains response format");
                Ok(Vec::new())
            }
        }
    }

    /// Fetch the inventory of one domain
    ///
    /// The backend is asked to filter by domain, but callers must not rely on it.
    pub async fn fetch_inventory(
        &self,
        token: &str,
        domain: &str,
    ) -> Result<Vec<AuthoritativeRecord>> {
        log::info!("Fetching inventory for domain {}...", domain);

        let filters = format!("ld_det.ld_domain EQ '{}'", domain);
        let page_size = PAGE_SIZE.to_string();
        let response = self
            .http
            .get(self.url(INVENTORY_BROWSE_PATH))
            .header("User-Agent", USER_AGENT)
            .bearer_auth(token)
            .query(&[
                ("browseId", INVENTORY_BROWSE_ID),
                ("filters", filters.as_str()),
                ("fields", INVENTORY_FIELDS),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InventoryError::HttpStatus(response.status()));
        }

        let records = match response.json::<BrowseResponse>().await? {
            BrowseResponse::Wrapped { data } => data,
            BrowseResponse::Bare(data) => data,
        };

        log::info!("Fetched {} inventory records", records.len());
        Ok(records)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
