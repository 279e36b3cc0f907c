//! Google Cloud Storage as an [`ObjectSource`], via the JSON API.

use super::object_source::{ObjectSource, SourceError};
use crate::models::object::SourceObject;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::{collections::HashMap, fmt, io};

/// Token endpoint of the GCE metadata server.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// How requests to the storage API are authorized.
#[derive(Clone)]
pub enum GcsAuth {
    /// No credentials, for emulators.
    Anonymous,
    /// A fixed bearer token.
    Static(String),
    /// A token fetched from the metadata server at this URL for every request.
    MetadataServer(String),
}

impl fmt::Debug for GcsAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcsAuth::Anonymous => f.write_str("Anonymous"),
            GcsAuth::Static(_) => f.write_str("Static(<redacted>)"),
            GcsAuth::MetadataServer(url) => f.debug_tuple("MetadataServer").field(url).finish(),
        }
    }
}

pub struct GcsSource {
    http: Client,
    endpoint: Url,
    auth: GcsAuth,
}

#[derive(Deserialize)]
struct BucketResource {
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    md5_hash: Option<String>,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl GcsSource {
    pub fn new(http: Client, endpoint: &str, auth: GcsAuth) -> Result<Self, SourceError> {
        let endpoint =
            Url::parse(endpoint).map_err(|_| SourceError::InvalidEndpoint(endpoint.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(SourceError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self {
            http,
            endpoint,
            auth,
        })
    }

    /// `{endpoint}/storage/v1/b/{segments...}`, each segment percent-encoded
    /// on its own so object names keep their slashes.
    fn bucket_url(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["storage", "v1", "b"])
            .extend(segments);
        Ok(url)
    }

    async fn access_token(&self) -> Result<Option<String>, SourceError> {
        match &self.auth {
            GcsAuth::Anonymous => Ok(None),
            GcsAuth::Static(token) => Ok(Some(token.clone())),
            GcsAuth::MetadataServer(url) => {
                let response = self
                    .http
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(SourceError::Auth(format!(
                        "metadata server returned {}",
                        response.status()
                    )));
                }
                let token: MetadataToken = response.json().await?;
                Ok(Some(token.access_token))
            }
        }
    }

    async fn get(&self, url: Url) -> Result<Response, SourceError> {
        let mut request = self.http.get(url);
        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }
}

async fn check_status(
    response: Response,
    not_found: impl FnOnce() -> SourceError,
) -> Result<Response, SourceError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(not_found());
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn decode_md5(encoded: &str) -> Result<[u8; 16], SourceError> {
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|err| SourceError::Decode(format!("md5Hash `{}`: {}", encoded, err)))?;
    bytes
        .try_into()
        .map_err(|_| SourceError::Decode(format!("md5Hash `{}` is not 16 bytes", encoded)))
}

#[async_trait]
impl ObjectSource for GcsSource {
    async fn bucket_labels(&self, bucket: &str) -> Result<HashMap<String, String>, SourceError> {
        let mut url = self.bucket_url(&[bucket])?;
        url.query_pairs_mut().append_pair("fields", "labels");

        let response = check_status(self.get(url).await?, || {
            SourceError::BucketNotFound(bucket.to_string())
        })
        .await?;
        let resource: BucketResource = response.json().await?;
        Ok(resource.labels.unwrap_or_default())
    }

    async fn open_object(&self, bucket: &str, object: &str) -> Result<SourceObject, SourceError> {
        let not_found = || SourceError::ObjectNotFound {
            bucket: bucket.to_string(),
            object: object.to_string(),
        };
        let object_url = self.bucket_url(&[bucket, "o", object])?;

        let mut metadata_url = object_url.clone();
        metadata_url
            .query_pairs_mut()
            .append_pair("fields", "size,md5Hash");
        let metadata: ObjectResource = check_status(self.get(metadata_url).await?, not_found)
            .await?
            .json()
            .await?;

        let size = metadata
            .size
            .as_deref()
            .map(|s| {
                s.parse::<u64>()
                    .map_err(|_| SourceError::Decode(format!("object size `{}`", s)))
            })
            .transpose()?;
        let md5 = metadata.md5_hash.as_deref().map(decode_md5).transpose()?;

        let mut media_url = object_url;
        media_url.query_pairs_mut().append_pair("alt", "media");
        let response = check_status(self.get(media_url).await?, not_found).await?;
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other))
            .boxed();

        Ok(SourceObject { size, md5, body })
    }
}
