use reqwest::{Response, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::core::activity::{ActivityListing, ActivityName, Email};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url {0}")]
    InvalidBaseUrl(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {detail}")]
    Rejected { status: u16, detail: String },
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Deserialize)]
struct DetailBody {
    detail: String,
}

/// Typed client for the activities API.
#[derive(Clone)]
pub struct Client {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn list_activities(&self) -> Result<ActivityListing, ClientError> {
        let url = self.url(&["activities"])?;
        let res = self.client.get(url).send().await?;
        let res = ensure_success(res).await?;
        Ok(res.json::<ActivityListing>().await?)
    }

    pub async fn signup(
        &self,
        activity: &ActivityName,
        email: &Email,
    ) -> Result<String, ClientError> {
        self.post_membership(activity, email, "signup").await
    }

    pub async fn unregister(
        &self,
        activity: &ActivityName,
        email: &Email,
    ) -> Result<String, ClientError> {
        self.post_membership(activity, email, "unregister").await
    }

    async fn post_membership(
        &self,
        activity: &ActivityName,
        email: &Email,
        action: &str,
    ) -> Result<String, ClientError> {
        let url = self.url(&["activities", activity.as_str(), action])?;
        let res = self
            .client
            .post(url)
            .query(&[("email", email.as_str())])
            .send()
            .await?;
        let res = ensure_success(res).await?;
        Ok(res.json::<MessageBody>().await?.message)
    }

    /// Appends percent-encoded path segments to the base url.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let invalid = || ClientError::InvalidBaseUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn ensure_success(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().await?;
    let detail = serde_json::from_str::<DetailBody>(&text)
        .map(|body| body.detail)
        .unwrap_or(text);
    Err(ClientError::Rejected {
        status: status.as_u16(),
        detail,
    })
}
