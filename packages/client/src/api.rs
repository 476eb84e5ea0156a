use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use journal_common::{
    CreateEntryRequest, DeleteEntryResponse, Entry, EntryListResponse, PageCursor, Photo,
    UpdateEntryRequest,
};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ClientError;

/// A photo picked for upload.
#[derive(Clone, Debug)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The journal API as the data layer sees it.
#[async_trait]
pub trait EntriesApi: Send + Sync {
    async fn list(
        &self,
        limit: u64,
        cursor: Option<PageCursor>,
    ) -> Result<EntryListResponse, ClientError>;

    async fn get(&self, id: Uuid) -> Result<Entry, ClientError>;

    async fn create(
        &self,
        raw_text: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<Entry, ClientError>;

    async fn update(&self, id: Uuid, raw_text: &str) -> Result<Entry, ClientError>;

    async fn delete(&self, id: Uuid) -> Result<(), ClientError>;

    async fn polish(&self, id: Uuid) -> Result<Entry, ClientError>;

    async fn upload_photo(&self, entry_id: Uuid, upload: PhotoUpload)
    -> Result<Photo, ClientError>;
}

/// [`EntriesApi`] over HTTP with a bearer token.
#[derive(Clone)]
pub struct HttpEntriesApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpEntriesApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/entries{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.bearer_auth(&self.token).send().await?;
        Ok(read_json(response).await?.json::<T>().await?)
    }
}

async fn read_json(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_response(status, &headers, &body))
}

/// Query pairs for one page request.
fn page_query(limit: u64, cursor: Option<PageCursor>) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(cursor) = cursor {
        query.push((
            "cursor",
            cursor.date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ));
        if let Some(id) = cursor.id {
            query.push(("cursor_id", id.to_string()));
        }
    }
    query
}

#[async_trait]
impl EntriesApi for HttpEntriesApi {
    async fn list(
        &self,
        limit: u64,
        cursor: Option<PageCursor>,
    ) -> Result<EntryListResponse, ClientError> {
        self.send(self.http.get(self.url("")).query(&page_query(limit, cursor)))
            .await
    }

    async fn get(&self, id: Uuid) -> Result<Entry, ClientError> {
        self.send(self.http.get(self.url(&format!("/{id}")))).await
    }

    async fn create(
        &self,
        raw_text: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<Entry, ClientError> {
        let body = CreateEntryRequest {
            raw_text: raw_text.to_string(),
            date,
        };
        self.send(self.http.post(self.url("")).json(&body)).await
    }

    async fn update(&self, id: Uuid, raw_text: &str) -> Result<Entry, ClientError> {
        let body = UpdateEntryRequest {
            raw_text: raw_text.to_string(),
        };
        self.send(self.http.patch(self.url(&format!("/{id}"))).json(&body))
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        let _: DeleteEntryResponse = self
            .send(self.http.delete(self.url(&format!("/{id}"))))
            .await?;
        Ok(())
    }

    async fn polish(&self, id: Uuid) -> Result<Entry, ClientError> {
        self.send(self.http.post(self.url(&format!("/{id}/polish"))))
            .await
    }

    async fn upload_photo(
        &self,
        entry_id: Uuid,
        upload: PhotoUpload,
    ) -> Result<Photo, ClientError> {
        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        self.send(
            self.http
                .post(self.url(&format!("/{entry_id}/photos")))
                .multipart(form),
        )
        .await
    }
}
