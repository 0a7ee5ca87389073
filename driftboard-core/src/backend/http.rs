//! HTTP backend client for the board CRUD surface.
//!
//! Routes follow the server contract: `GET /api/board`,
//! `POST/PATCH/DELETE /api/lists[/:id]`, the same for cards, and
//! `POST /api/cards/:id/move`. Non-2xx responses surface as
//! [`BackendError::Http`] with the body as detail text; a 204 resolves
//! to `None` instead of an entity.

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{BoardSnapshot, Card, CardPatch, List, ListPatch};

use super::{BackendError, BoardBackend};

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> Result<Response, BackendError> {
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn json_or_none<T: DeserializeOwned>(resp: Response) -> Result<Option<T>, BackendError> {
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        resp.json()
            .await
            .map(Some)
            .map_err(|e| BackendError::Network(format!("Invalid response body: {e}")))
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
        resp.json()
            .await
            .map_err(|e| BackendError::Network(format!("Invalid response body: {e}")))
    }
}

impl BoardBackend for HttpBackend {
    async fn fetch_all(&self) -> Result<BoardSnapshot, BackendError> {
        let resp = self.send(Method::GET, "/api/board", None::<&()>).await?;
        Self::json(resp).await
    }

    async fn create_list(&self, list: &List) -> Result<List, BackendError> {
        let resp = self.send(Method::POST, "/api/lists", Some(list)).await?;
        Self::json(resp).await
    }

    async fn update_list(&self, id: &str, patch: &ListPatch) -> Result<Option<List>, BackendError> {
        let resp = self
            .send(Method::PATCH, &format!("/api/lists/{id}"), Some(patch))
            .await?;
        Self::json_or_none(resp).await
    }

    async fn delete_list(&self, id: &str) -> Result<(), BackendError> {
        self.send(Method::DELETE, &format!("/api/lists/{id}"), None::<&()>)
            .await?;
        Ok(())
    }

    async fn create_card(&self, card: &Card) -> Result<Card, BackendError> {
        let resp = self.send(Method::POST, "/api/cards", Some(card)).await?;
        Self::json(resp).await
    }

    async fn update_card(&self, id: &str, patch: &CardPatch) -> Result<Option<Card>, BackendError> {
        let resp = self
            .send(Method::PATCH, &format!("/api/cards/{id}"), Some(patch))
            .await?;
        Self::json_or_none(resp).await
    }

    async fn delete_card(&self, id: &str) -> Result<(), BackendError> {
        self.send(Method::DELETE, &format!("/api/cards/{id}"), None::<&()>)
            .await?;
        Ok(())
    }

    async fn move_card(
        &self,
        id: &str,
        target_list_id: &str,
        target_index: usize,
    ) -> Result<Option<Card>, BackendError> {
        let body = serde_json::json!({
            "targetListId": target_list_id,
            "targetIndex": target_index,
        });
        let resp = self
            .send(Method::POST, &format!("/api/cards/{id}/move"), Some(&body))
            .await?;
        Self::json_or_none(resp).await
    }
}
