use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use veil_types::api::{CreateOwnerRequest, ErrorResponse, SendMessageRequest};
use veil_types::link_id::is_valid_link_id;
use veil_types::{Message, Owner};

use super::{LinkStore, NewOwner};
use crate::config::ClientConfig;
use crate::error::StoreError;

/// [`LinkStore`] backed by the Veil HTTP API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(config: &ClientConfig) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl LinkStore for HttpStore {
    async fn create_owner(&self, owner: &NewOwner) -> Result<Owner, StoreError> {
        let resp = self
            .client
            .post(self.url("/owners"))
            .json(&CreateOwnerRequest {
                unique_id: owner.unique_id.clone(),
                name: owner.name.clone(),
                wallet_address: owner.wallet_address.clone(),
            })
            .send()
            .await?;

        decode(check(resp).await?).await
    }

    async fn owner_by_link(&self, link_id: &str) -> Result<Option<Owner>, StoreError> {
        // Anything outside the link alphabet cannot exist and must not reach the URL path.
        if !is_valid_link_id(link_id) {
            return Ok(None);
        }

        let resp = self
            .client
            .get(self.url(&format!("/owners/{link_id}")))
            .send()
            .await?;

        match check(resp).await {
            Ok(resp) => decode(resp).await.map(Some),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn messages_for(&self, owner: &Owner) -> Result<Vec<Message>, StoreError> {
        let resp = self
            .client
            .get(self.url(&format!("/owners/{}/messages", owner.unique_id)))
            .send()
            .await?;

        let messages: Vec<Message> = decode(check(resp).await?).await?;
        debug!("Fetched {} messages for {}", messages.len(), owner.unique_id);
        Ok(messages)
    }

    async fn insert_message(&self, owner: &Owner, text: &str) -> Result<Message, StoreError> {
        let resp = self
            .client
            .post(self.url(&format!("/owners/{}/messages", owner.unique_id)))
            .json(&SendMessageRequest {
                text: text.to_string(),
            })
            .send()
            .await?;

        decode(check(resp).await?).await
    }

    async fn delete_message(&self, owner: &Owner, message_id: Uuid) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.url(&format!(
                "/owners/{}/messages/{}",
                owner.unique_id, message_id
            )))
            .send()
            .await?;

        check(resp).await?;
        Ok(())
    }
}

/// Map non-2xx responses onto [`StoreError`].
async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    match status {
        StatusCode::NOT_FOUND => Err(StoreError::NotFound),
        StatusCode::CONFLICT => Err(StoreError::Conflict),
        _ => {
            let message = match resp.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
}
