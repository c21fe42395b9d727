use reqwest::header::{HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::errors::{Result, TaskboardError};

#[derive(Debug, Clone)]
pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpService {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| TaskboardError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Appends each segment to the base URL, percent-encoding `/`, `?`, `#`
    /// and the like so a value can't escape its segment.
    fn segments_url(&self, segments: &[&str]) -> Result<String> {
        let invalid = |reason: String| TaskboardError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    pub async fn get_service_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get(self.url(path)).await
    }

    /// GET with the path given as raw segments, e.g. a user name taken as is.
    pub async fn get_service_data_at<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.get(self.segments_url(segments)?).await
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| TaskboardError::Http {
                url: url.clone(),
                source,
            })?;
        Self::decode(url, response).await
    }

    pub async fn post_service_data<B, T>(&self, path: &str, payload: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|source| TaskboardError::Http {
                url: url.clone(),
                source,
            })?;
        Self::decode(url, response).await
    }

    async fn decode<T: DeserializeOwned>(url: String, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(TaskboardError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| TaskboardError::Http { url, source })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
