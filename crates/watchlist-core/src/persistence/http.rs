//! REST persistence collaborator.
//!
//! Talks JSON to a collection endpoint:
//!
//! | operation | request                                         |
//! |-----------|-------------------------------------------------|
//! | list      | `GET    {endpoint}/{resource}`                  |
//! | create    | `POST   {endpoint}/{resource}` `{name}`         |
//! | update    | `PATCH  {endpoint}/{resource}/{id}` `{id, goal, priority}` |
//! | delete    | `DELETE {endpoint}/{resource}/{id}`             |
//!
//! Any non-2xx answer becomes [`PersistenceError::Status`] with the body text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use super::PersistEntities;
use crate::entity::{EntityId, EntityRecord, GoalUpdate};
use crate::error::PersistenceError;
use crate::storage::ApiConfig;

pub struct HttpPersistence {
    client: Client,
    base: Url,
    resource: String,
    token: Option<String>,
}

impl HttpPersistence {
    pub fn new(
        endpoint: &str,
        resource: &str,
        timeout: Duration,
    ) -> Result<Self, PersistenceError> {
        let base = Url::parse(endpoint)?;
        if base.cannot_be_a_base() {
            return Err(PersistenceError::Rejected(format!(
                "endpoint {endpoint} cannot carry a path"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            resource: resource.trim_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, PersistenceError> {
        let mut this = Self::new(
            &config.endpoint,
            &config.resource,
            Duration::from_secs(config.timeout_secs),
        )?;
        this.token = config.token.clone().filter(|t| !t.is_empty());
        Ok(this)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, id: Option<EntityId>) -> Result<Url, PersistenceError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                PersistenceError::Rejected(format!("endpoint {} cannot carry a path", self.base))
            })?;
            segments.pop_if_empty();
            for part in self.resource.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("bearer {token}")),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PersistenceError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PersistenceError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PersistenceError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Decode(e.to_string()))
}

#[async_trait]
impl PersistEntities for HttpPersistence {
    async fn list(&self) -> Result<Vec<EntityRecord>, PersistenceError> {
        let response = self.send(self.client.get(self.url(None)?)).await?;
        decode(response).await
    }

    async fn create(&self, name: &str) -> Result<EntityRecord, PersistenceError> {
        let request = self.client.post(self.url(None)?).json(&json!({ "name": name }));
        let response = self.send(request).await?;
        decode(response).await
    }

    async fn update(&self, id: EntityId, update: &GoalUpdate) -> Result<(), PersistenceError> {
        let body = json!({
            "id": id,
            "goal": update.goal,
            "priority": update.priority,
        });
        let request = self.client.patch(self.url(Some(id))?).json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError> {
        self.send(self.client.delete(self.url(Some(id))?)).await?;
        Ok(())
    }
}
