//! OpenRelik REST client implementing [`CaseApi`].
//!
//! Every request carries the API key as a refresh token. When the server
//! answers `401`, an access token is fetched from `/auth/refresh`, cached,
//! and the request is sent once more with it.

use super::case_api::{CaseApi, CaseApiError};
use crate::models::{
    FileId, FolderId, TemplateId, WorkflowId,
    folder::{Folder, FolderListing},
    upload::UploadChunk,
    workflow::WorkflowRecord,
};
use async_trait::async_trait;
use reqwest::{
    Body, Client, RequestBuilder, Response, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::debug;

const REFRESH_TOKEN_HEADER: &str = "x-openrelik-refresh-token";
const ACCESS_TOKEN_HEADER: &str = "x-openrelik-access-token";

pub struct OpenRelikClient {
    http: Client,
    server_url: String,
    base_url: String,
    api_key: String,
    access_token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct CreatedResponse {
    #[serde(default)]
    id: Option<i64>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    new_access_token: Option<String>,
}

impl OpenRelikClient {
    pub fn new(http: Client, server_url: &str, api_version: &str, api_key: String) -> Self {
        let server_url = server_url.trim_end_matches('/').to_string();
        let base_url = format!("{}/api/{}", server_url, api_version);
        Self {
            http,
            server_url,
            base_url,
            api_key,
            access_token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn folders_url(&self, parent: Option<FolderId>) -> String {
        match parent {
            Some(id) => self.url(&format!("/folders/{}/folders", id)),
            None => self.url("/folders/"),
        }
    }

    /// Send the request built by `build`, rebuilding it for one retry after
    /// an access token refresh.
    async fn send<F>(&self, build: F) -> Result<Response, CaseApiError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let response = self.authorize(build()).await.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        debug!("OpenRelik rejected the access token, refreshing");
        self.refresh_access_token().await?;
        let response = self.authorize(build()).await.send().await?;
        ensure_success(response).await
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(REFRESH_TOKEN_HEADER, self.api_key.as_str());
        let token = self.access_token.read().await.clone();
        match token {
            Some(token) => request.header(ACCESS_TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn refresh_access_token(&self) -> Result<(), CaseApiError> {
        let response = self
            .http
            .get(format!("{}/auth/refresh", self.server_url))
            .header(REFRESH_TOKEN_HEADER, self.api_key.as_str())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CaseApiError::Auth(format!(
                "refresh returned {}",
                response.status()
            )));
        }
        let refreshed: RefreshResponse = response.json().await?;
        let token = refreshed
            .new_access_token
            .ok_or_else(|| CaseApiError::Auth("refresh response carried no token".into()))?;
        *self.access_token.write().await = Some(token);
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, CaseApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::CONFLICT {
        Err(CaseApiError::Conflict(body))
    } else {
        Err(CaseApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn resumable_params(chunk: &UploadChunk) -> Vec<(&'static str, String)> {
    vec![
        ("resumableChunkNumber", chunk.chunk_number.to_string()),
        ("resumableChunkSize", chunk.chunk_size.to_string()),
        ("resumableCurrentChunkSize", chunk.data.len().to_string()),
        ("resumableTotalSize", chunk.total_size.to_string()),
        ("resumableType", String::new()),
        ("resumableIdentifier", chunk.identifier.clone()),
        ("resumableFilename", chunk.file_name.clone()),
        ("resumableRelativePath", chunk.file_name.clone()),
        ("resumableTotalChunks", chunk.total_chunks.to_string()),
        ("folder_id", chunk.folder_id.to_string()),
    ]
}

#[async_trait]
impl CaseApi for OpenRelikClient {
    async fn list_folders(&self, parent: Option<FolderId>) -> Result<Vec<Folder>, CaseApiError> {
        let url = self.folders_url(parent);
        let response = self.send(|| self.http.get(&url)).await?;
        let listing: FolderListing = response.json().await?;
        Ok(listing.into_folders())
    }

    async fn create_folder(
        &self,
        parent: Option<FolderId>,
        display_name: &str,
    ) -> Result<FolderId, CaseApiError> {
        let url = self.folders_url(parent);
        let body = json!({ "display_name": display_name });
        let response = self.send(|| self.http.post(&url).json(&body)).await?;
        let created: CreatedResponse = response.json().await?;
        created.id.ok_or(CaseApiError::MissingId("folder"))
    }

    async fn upload_chunk(&self, chunk: UploadChunk) -> Result<Option<FileId>, CaseApiError> {
        let url = self.url("/files/upload");
        let params = resumable_params(&chunk);
        let response = self
            .send(|| {
                let part = Part::stream_with_length(
                    Body::from(chunk.data.clone()),
                    chunk.data.len() as u64,
                )
                .file_name(chunk.file_name.clone());
                self.http
                    .post(&url)
                    .query(&params)
                    .multipart(Form::new().part("file", part))
            })
            .await?;

        if response.status() != StatusCode::CREATED {
            return Ok(None);
        }
        let created: CreatedResponse = response.json().await?;
        created.id.map(Some).ok_or(CaseApiError::MissingId("file"))
    }

    async fn create_workflow(
        &self,
        folder_id: FolderId,
        file_ids: &[FileId],
        template_id: TemplateId,
    ) -> Result<WorkflowId, CaseApiError> {
        let url = self.url(&format!("/folders/{}/workflows/", folder_id));
        let body = json!({
            "folder_id": folder_id,
            "file_ids": file_ids,
            "template_id": template_id,
        });
        let response = self.send(|| self.http.post(&url).json(&body)).await?;
        let created: CreatedResponse = response.json().await?;
        created.id.ok_or(CaseApiError::MissingId("workflow"))
    }

    async fn run_workflow(
        &self,
        folder_id: FolderId,
        workflow_id: WorkflowId,
    ) -> Result<(), CaseApiError> {
        let workflow_url = self.url(&format!("/folders/{}/workflows/{}", folder_id, workflow_id));
        let record: WorkflowRecord = self
            .send(|| self.http.get(&workflow_url))
            .await?
            .json()
            .await?;
        let spec = match record.spec_json.as_deref() {
            Some(raw) => serde_json::from_str::<Value>(raw)?,
            None => json!({}),
        };

        let run_url = format!("{}/run/", workflow_url);
        let body = json!({ "workflow_spec": spec });
        self.send(|| self.http.post(&run_url).json(&body)).await?;
        debug!("Workflow {} ({}) started", record.id, workflow_id);
        Ok(())
    }
}
