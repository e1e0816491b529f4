//! REST client for one backend collection.
//!
//! The gateway is a thin request/response layer: it never retries and never
//! touches local state. Each failure comes back as an [`Error`] kind the caller
//! turns into a notification.

use std::{marker::PhantomData, sync::Arc};

use reqwest::{Client as HttpClient, RequestBuilder, Response, Url, header};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    resource::{Resource, UserProfile},
    server::ErrorResponseBody,
    session::{CredentialProvider, Credentials, LoggedUser},
};

pub struct Gateway<R> {
    http: HttpClient,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for Gateway<R> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            credentials: Arc::clone(&self.credentials),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> Gateway<R> {
    pub fn new(http: HttpClient, base_url: Url, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http,
            base_url,
            credentials,
            _resource: PhantomData,
        }
    }

    #[instrument(skip(self), fields(collection = R::COLLECTION))]
    pub async fn list_all(&self) -> Result<Vec<R>> {
        let url = self.endpoint(None)?;
        let response = self.http.get(url).send().await.map_err(Error::Network)?;
        decode(response).await
    }

    #[instrument(skip_all, fields(collection = R::COLLECTION))]
    pub async fn create(&self, draft: &R::Draft) -> Result<R> {
        let url = self.endpoint(None)?;
        let request = self.authorize(self.http.post(url).json(draft));
        let response = request.send().await.map_err(Error::Network)?;
        let record: R = decode(response).await?;
        debug!(id = record.id(), "created");
        Ok(record)
    }

    /// Replaces the rank field of `id` and returns the server's copy.
    #[instrument(skip(self), fields(collection = R::COLLECTION))]
    pub async fn update_rank(&self, id: &str, new_rank: u64) -> Result<R> {
        let url = self.endpoint(Some(id))?;
        let mut body = serde_json::Map::new();
        body.insert(R::RANK_FIELD.to_string(), json!(new_rank));
        let request = self.authorize(self.http.put(url).json(&body));
        let response = request.send().await.map_err(Error::Network)?;
        // Some backends answer 200 with `null` when the id is gone.
        let record: Option<R> = decode(response).await?;
        record.ok_or_else(|| Error::NotFound(format!("{} {id}", R::COLLECTION)))
    }

    #[instrument(skip(self), fields(collection = R::COLLECTION))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = self.endpoint(Some(id))?;
        let request = self.authorize(self.http.delete(url));
        let response = request.send().await.map_err(Error::Network)?;
        check(response).await?;
        Ok(())
    }

    /// Exchanges a username and password for a [`LoggedUser`].
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<LoggedUser> {
        let url = self.url(&["login"])?;
        let response = self
            .http
            .post(url)
            .json(credentials)
            .send()
            .await
            .map_err(Error::Network)?;
        decode(response).await
    }

    /// Every user with the blogs they added.
    #[instrument(skip(self))]
    pub async fn users(&self) -> Result<Vec<UserProfile>> {
        let url = self.url(&["users"])?;
        let response = self.http.get(url).send().await.map_err(Error::Network)?;
        decode(response).await
    }

    #[instrument(skip(self))]
    pub async fn user(&self, id: &str) -> Result<UserProfile> {
        let url = self.url(&["users", checked_id(id)?])?;
        let response = self.http.get(url).send().await.map_err(Error::Network)?;
        decode(response).await
    }

    fn endpoint(&self, id: Option<&str>) -> Result<Url> {
        match id {
            Some(id) => self.url(&[R::COLLECTION, checked_id(id)?]),
            None => self.url(&[R::COLLECTION]),
        }
    }

    /// Appends `api` and `segments` to the base path. Each segment is
    /// percent-encoded, so `/`, `?` and `#` inside an id stay part of it.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Decode(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.token() {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }
}

/// Dot segments would be collapsed by the server's path normalisation, so
/// they can never name a record.
fn checked_id(id: &str) -> Result<&str> {
    match id {
        "" | "." | ".." => Err(Error::NotFound(format!("no record with id '{id}'"))),
        id => Ok(id),
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponseBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .map(str::to_lowercase)
                .unwrap_or_else(|| text.clone())
        });
    debug!(%status, %message, "request rejected");
    Err(Error::from_status(status, message))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check(response).await?;
    let bytes = response.bytes().await.map_err(Error::Network)?;
    serde_json::from_slice(&bytes).map_err(|err| Error::Decode(err.to_string()))
}
