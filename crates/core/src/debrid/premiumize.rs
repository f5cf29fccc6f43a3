//! Premiumize.me debrid client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::PremiumizeConfig;

use super::{DebridClient, DebridError, Item, ItemKind, Transfer, TransferStatus};

/// Premiumize.me client implementation.
pub struct PremiumizeClient {
    client: Client,
    config: PremiumizeConfig,
}

impl PremiumizeClient {
    /// Create a new Premiumize client.
    pub fn new(config: PremiumizeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Build an endpoint URL carrying the API key.
    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}?apikey={}",
            self.base_url(),
            endpoint,
            urlencoding::encode(&self.config.api_key)
        )
    }

    /// Make a GET request and decode the success envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, DebridError> {
        let mut url = self.endpoint_url(endpoint);
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }

        let response = self.client.get(&url).send().await?;
        Self::decode(endpoint, response).await
    }

    /// Make a POST request with form data and decode the success envelope.
    async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, DebridError> {
        let url = self.endpoint_url(endpoint);
        let response = self.client.post(&url).form(params).send().await?;
        Self::decode(endpoint, response).await
    }

    /// Check HTTP status and the `status` field, then decode the body as `T`.
    async fn decode<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, DebridError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DebridError::Api(format!(
                "HTTP {} from {}: {}",
                status,
                endpoint,
                body.chars().take(200).collect::<String>()
            )));
        }

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| DebridError::InvalidResponse(format!("{}: {}", endpoint, e)))?;
        if envelope.status != "success" {
            return Err(DebridError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| format!("{} returned status {}", endpoint, envelope.status)),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| DebridError::InvalidResponse(format!("{}: {}", endpoint, e)))
    }

    /// Generate a zip link for a set of files or folders.
    async fn generate_zip(&self, field: &str, item_id: &str) -> Result<String, DebridError> {
        let response: ZipResponse = self.post_form("/zip/generate", &[(field, item_id)]).await?;
        debug!(item_id = item_id, "Generated zip link");
        Ok(response.location)
    }

    /// Create a folder in the root of the cloud storage.
    async fn create_folder(&self, name: &str) -> Result<String, DebridError> {
        let response: CreateFolderResponse =
            self.post_form("/folder/create", &[("name", name)]).await?;
        Ok(response.id)
    }
}

/// Common response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Empty success payload.
#[derive(Debug, Deserialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
struct TransferListResponse {
    #[serde(default)]
    transfers: Vec<PmTransfer>,
}

/// Premiumize transfer record.
#[derive(Debug, Deserialize)]
struct PmTransfer {
    id: String,
    name: String,
    status: TransferStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl From<PmTransfer> for Transfer {
    fn from(t: PmTransfer) -> Self {
        Transfer {
            id: t.id,
            name: t.name,
            status: t.status,
            message: t.message,
            progress: t.progress,
            kind: t.kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FolderListResponse {
    #[serde(default)]
    content: Vec<PmItem>,
}

/// Premiumize folder entry.
#[derive(Debug, Deserialize)]
struct PmItem {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: ItemKind,
    #[serde(default)]
    size: Option<u64>,
}

impl From<PmItem> for Item {
    fn from(i: PmItem) -> Self {
        Item {
            id: i.id,
            name: i.name,
            kind: i.kind,
            size_bytes: i.size,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ZipResponse {
    location: String,
}

#[derive(Debug, Deserialize)]
struct CreateFolderResponse {
    id: String,
}

#[async_trait]
impl DebridClient for PremiumizeClient {
    fn name(&self) -> &str {
        "premiumize"
    }

    async fn list_transfers(&self) -> Result<Vec<Transfer>, DebridError> {
        let response: TransferListResponse = self.get("/transfer/list", &[]).await?;
        Ok(response.transfers.into_iter().map(Transfer::from).collect())
    }

    async fn update_transfer_status(
        &self,
        transfer_id: &str,
        status: TransferStatus,
    ) -> Result<(), DebridError> {
        debug!(
            transfer_id = transfer_id,
            status = status.as_str(),
            "Premiumize has no transfer status endpoint"
        );
        Err(DebridError::Unsupported("transfer status updates".to_string()))
    }

    async fn delete_transfer(&self, transfer_id: &str) -> Result<(), DebridError> {
        let _: Empty = self
            .post_form("/transfer/delete", &[("id", transfer_id)])
            .await?;
        Ok(())
    }

    async fn list_folder(&self, folder_id: Option<&str>) -> Result<Vec<Item>, DebridError> {
        let params: Vec<(&str, &str)> = match folder_id {
            Some(id) if !id.is_empty() => vec![("id", id)],
            _ => vec![],
        };
        let response: FolderListResponse = self.get("/folder/list", &params).await?;
        Ok(response.content.into_iter().map(Item::from).collect())
    }

    async fn generate_file_link(&self, item_id: &str) -> Result<String, DebridError> {
        self.generate_zip("files[]", item_id).await
    }

    async fn generate_folder_link(&self, item_id: &str) -> Result<String, DebridError> {
        self.generate_zip("folders[]", item_id).await
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), DebridError> {
        let _: Empty = self.post_form("/folder/delete", &[("id", folder_id)]).await?;
        Ok(())
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), DebridError> {
        let _: Empty = self.post_form("/item/delete", &[("id", file_id)]).await?;
        Ok(())
    }

    async fn resolve_downloads_folder_id(&self) -> Result<String, DebridError> {
        let wanted = self.config.downloads_folder.as_str();
        let root = self.list_folder(None).await?;

        if let Some(folder) = root
            .into_iter()
            .find(|item| item.kind == ItemKind::Folder && item.name == wanted)
        {
            debug!(folder_id = %folder.id, "Found downloads folder {}", wanted);
            return Ok(folder.id);
        }

        info!("Downloads folder {} not found, creating it", wanted);
        self.create_folder(wanted).await
    }
}
