use crate::diary_entry::DiaryEntry;
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Remote diary operations the search page depends on.
#[async_trait]
pub trait DiaryApi: Send + Sync {
    async fn search(&self, query: &str) -> ApiResult<Vec<DiaryEntry>>;
    async fn delete(&self, id: &str) -> ApiResult<()>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// `DiaryApi` over the service's REST endpoints.
#[derive(Clone)]
pub struct HttpDiaryApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpDiaryApi {
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
            .and_then(|body| body.message);
        warn!(%status, ?message, "diary service returned an error");
        Err(ApiError::Status { status, message })
    }
}

#[async_trait]
impl DiaryApi for HttpDiaryApi {
    async fn search(&self, query: &str) -> ApiResult<Vec<DiaryEntry>> {
        let mut url = self.endpoint(&["api", "diaries", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        debug!(%url, "searching diaries");

        let response = self.authorize(self.client.get(url)).send().await?;
        let response = Self::check(response).await?;
        response.json::<Vec<DiaryEntry>>().await.map_err(|e| {
            if e.is_decode() {
                ApiError::Decode(e.to_string())
            } else {
                ApiError::Transport(e)
            }
        })
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["api", "diaries", id])?;
        debug!(%url, "deleting diary");

        let response = self.authorize(self.client.delete(url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
