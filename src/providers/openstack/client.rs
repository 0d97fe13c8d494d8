use reqwest::{Certificate, Client, Response, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fs;
use std::time::Duration;
use tracing::debug;

use super::OpenStackOptions;
use super::models::{Flavor, NovaSource, Server, ServerImage};
use crate::normalize::{CatalogEntry, ProbeError, ProbeResponse, VersionProbe};
use crate::providers::ProviderError;

const USER_AGENT: &str = concat!("cloud-info-provider/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FlavorList {
    flavors: Vec<Flavor>,
}

#[derive(Debug, Deserialize)]
struct FlavorBody {
    flavor: Flavor,
}

#[derive(Debug, Deserialize)]
struct ImageList {
    images: Vec<ServerImage>,
}

#[derive(Debug, Deserialize)]
struct ImageBody {
    image: ServerImage,
}

#[derive(Debug, Deserialize)]
struct ServerList {
    servers: Vec<Server>,
}

/// Keystone v2 password session plus the Nova compute API of the tenant.
#[derive(Debug)]
pub struct NovaClient {
    http: Client,
    probe_http: Client,
    auth_url: String,
    token: String,
    compute_url: String,
    catalog: Vec<CatalogEntry>,
}

fn build_client(options: &OpenStackOptions, timeout: Option<Duration>) -> Result<Client, ProviderError> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if options.insecure {
        builder = builder.danger_accept_invalid_certs(true);
    } else if let Some(path) = &options.cacert {
        let pem = fs::read(path)?;
        builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

impl NovaClient {
    /// Fetch a token and the service catalog. Credentials are validated
    /// before anything goes on the wire.
    pub async fn authenticate(options: &OpenStackOptions) -> Result<Self, ProviderError> {
        let credentials = options.validate()?;
        let http = build_client(options, None)?;
        let probe_http = build_client(options, Some(options.probe_timeout))?;

        let auth_url = credentials.auth_url.trim_end_matches('/').to_string();
        let tokens_url = format!("{auth_url}/tokens");
        let body = json!({
            "auth": {
                "passwordCredentials": {
                    "username": credentials.username,
                    "password": credentials.password,
                },
                "tenantName": credentials.tenant_name,
            }
        });

        let response = http.post(&tokens_url).json(&body).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let reason = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ProviderError::Auth { url: tokens_url, reason });
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: tokens_url,
            });
        }

        let access = response.json::<TokenResponse>().await?.access;
        let compute_url = access
            .service_catalog
            .iter()
            .find(|entry| entry.kind == "compute")
            .and_then(|entry| entry.endpoints.first())
            .map(|endpoint| endpoint.public_url.trim_end_matches('/').to_string())
            .ok_or_else(|| ProviderError::Config(format!("no compute endpoint in the service catalog of {auth_url}")))?;
        debug!(%compute_url, "using compute endpoint");

        Ok(Self {
            http,
            probe_http,
            auth_url,
            token: access.token.id,
            compute_url,
            catalog: access.service_catalog,
        })
    }

    async fn get(&self, path: &str) -> Result<Response, ProviderError> {
        let url = format!("{}{path}", self.compute_url);
        Ok(self.http.get(&url).header("X-Auth-Token", &self.token).send().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        self.fetch_json(path, None).await
    }

    /// Like [`Self::get_json`], with 404 mapped to a lookup miss.
    async fn find_json<T: DeserializeOwned>(&self, path: &str, kind: &'static str, id: &str) -> Result<T, ProviderError> {
        self.fetch_json(path, Some((kind, id))).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        lookup: Option<(&'static str, &str)>,
    ) -> Result<T, ProviderError> {
        let response = self.get(path).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.url().as_str(), lookup));
        }
        Ok(response.json().await?)
    }
}

/// Error for a non-success response. For point lookups (`kind`, `id`) a 404
/// means the object is gone.
fn status_error(status: StatusCode, url: &str, lookup: Option<(&'static str, &str)>) -> ProviderError {
    match lookup {
        Some((kind, id)) if status == StatusCode::NOT_FOUND => ProviderError::NotFound {
            kind,
            id: id.to_string(),
        },
        _ => ProviderError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        },
    }
}

#[async_trait::async_trait]
impl VersionProbe for NovaClient {
    async fn probe_endpoint_version(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        let response = self
            .probe_http
            .get(url)
            .header("X-Auth-Token", &self.token)
            .send()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
        let server = response
            .headers()
            .get(header::SERVER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(ProbeResponse {
            status: response.status().as_u16(),
            server,
        })
    }
}

#[async_trait::async_trait]
impl NovaSource for NovaClient {
    fn auth_url(&self) -> &str {
        &self.auth_url
    }

    async fn service_catalog(&self) -> Result<Vec<CatalogEntry>, ProviderError> {
        Ok(self.catalog.clone())
    }

    async fn list_flavors(&self, detailed: bool) -> Result<Vec<Flavor>, ProviderError> {
        let path = if detailed { "/flavors/detail" } else { "/flavors" };
        Ok(self.get_json::<FlavorList>(path).await?.flavors)
    }

    async fn list_images(&self, detailed: bool) -> Result<Vec<ServerImage>, ProviderError> {
        let path = if detailed { "/images/detail" } else { "/images" };
        Ok(self.get_json::<ImageList>(path).await?.images)
    }

    async fn list_instances(&self) -> Result<Vec<Server>, ProviderError> {
        Ok(self.get_json::<ServerList>("/servers/detail").await?.servers)
    }

    async fn find_image(&self, id: &str) -> Result<ServerImage, ProviderError> {
        let body: ImageBody = self.find_json(&format!("/images/{id}"), "image", id).await?;
        Ok(body.image)
    }

    async fn find_flavor(&self, id: &str) -> Result<Flavor, ProviderError> {
        let body: FlavorBody = self.find_json(&format!("/flavors/{id}"), "flavor", id).await?;
        Ok(body.flavor)
    }
}
