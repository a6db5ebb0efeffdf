use super::{OutboundWrite, RemoteBackend};
use crate::error::{Error, Result};
use crate::models::dataset::RemoteDataset;
use crate::models::member::Member;
use crate::models::snapshot::PeriodSnapshot;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;

const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `X-API-Key: <key>`
    ApiKey,
}

impl AuthScheme {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "apiKey" => AuthScheme::ApiKey,
            _ => AuthScheme::Bearer,
        }
    }
}

/// REST backend for the dashboard API.
pub struct HttpBackend {
    base_url: Url,
    auth: Option<(AuthScheme, String)>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        scheme: AuthScheme,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| Error::Config(format!("invalid API base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("API base URL {base_url} cannot be a base")));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        let auth = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| (scheme, key.to_string()));

        Ok(Self {
            base_url,
            auth,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("API base URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth {
            Some((AuthScheme::Bearer, key)) => builder.bearer_auth(key),
            Some((AuthScheme::ApiKey, key)) => builder.header("X-API-Key", key),
            None => builder,
        }
    }

    async fn get_optional_snapshot(&self, segment: &str, period: &str) -> Result<Option<PeriodSnapshot>> {
        let url = self.endpoint(&[segment, period])?;
        let response = self.request(Method::GET, url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_response(response, &url).await?;
        Ok(Some(response.json::<PeriodSnapshot>().await?))
    }

    async fn send_json<T: serde::Serialize + ?Sized>(&self, method: Method, segments: &[&str], body: &T) -> Result<()> {
        let url = self.endpoint(segments)?;
        let response = self.request(method, url.clone()).json(body).send().await?;
        check_response(response, &url).await?;
        Ok(())
    }
}

/// 4xx other than 408/429 means the server will never accept this payload.
async fn check_response(response: Response, url: &Url) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = if body.chars().count() > MAX_ERROR_BODY {
        format!("{}... (truncated)", body.chars().take(MAX_ERROR_BODY).collect::<String>())
    } else {
        body
    };

    let transient = status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS;
    if status.is_client_error() && !transient {
        Err(Error::Rejected {
            status: status.as_u16(),
            body,
        })
    } else {
        Err(Error::Network(format!("HTTP {} from {url}: {body}", status.as_u16())))
    }
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn ping(&self) -> Result<()> {
        let url = self.endpoint(&["health"])?;
        let response = self.request(Method::GET, url.clone()).send().await?;
        check_response(response, &url).await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<RemoteDataset> {
        let url = self.endpoint(&["data", "all"])?;
        log::debug!("fetching full dataset from {url}");
        let response = self.request(Method::GET, url.clone()).send().await?;
        let response = check_response(response, &url).await?;
        Ok(response.json::<RemoteDataset>().await?)
    }

    async fn fetch_weekly(&self, period: &str) -> Result<Option<PeriodSnapshot>> {
        self.get_optional_snapshot("weekly", period).await
    }

    async fn fetch_monthly(&self, period: &str) -> Result<Option<PeriodSnapshot>> {
        self.get_optional_snapshot("monthly", period).await
    }

    async fn fetch_members(&self) -> Result<Vec<Member>> {
        let url = self.endpoint(&["members"])?;
        let response = self.request(Method::GET, url.clone()).send().await?;
        let response = check_response(response, &url).await?;
        Ok(response.json::<Vec<Member>>().await?)
    }

    async fn push(&self, write: &OutboundWrite) -> Result<()> {
        match write {
            OutboundWrite::Daily(record) => self.send_json(Method::POST, &["daily"], record).await,
            OutboundWrite::Project(project) => {
                self.send_json(Method::POST, &["projects"], project).await
            }
            OutboundWrite::Weekly(snapshot) => {
                self.send_json(Method::PUT, &["weekly", snapshot.period.as_str()], snapshot)
                    .await
            }
            OutboundWrite::Monthly(snapshot) => {
                self.send_json(Method::PUT, &["monthly", snapshot.period.as_str()], snapshot)
                    .await
            }
        }
    }
}
