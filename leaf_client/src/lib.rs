//! HTTP client for the leaf disease server.
//!
use std::path::Path;

use common::{
    protocol::{
        DiseaseInfoResponse, DiseaseListResponse, ErrorBody, HealthResponse, PredictResponse,
    },
    Error,
};
use reqwest::{multipart, Client, Response, Url};
use serde::de::DeserializeOwned;

pub struct LeafClient {
    http: Client,
    base: Url,
}

impl LeafClient {
    pub fn new(server: &str) -> Result<Self, Error> {
        let base = Url::parse(server)?;
        if base.cannot_be_a_base() {
            return Err(format!("{server} cannot be used as a server URL").into());
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    /// URL of an endpoint below the server base, with each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Upload an image file and return the server's prediction.
    pub async fn predict(&self, image: &Path) -> Result<PredictResponse, Error> {
        let data = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".into());
        log::info!("Uploading {} ({} bytes)", image.display(), data.len());

        let part = multipart::Part::bytes(data).file_name(file_name);
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.endpoint(&["predict"]))
            .multipart(form)
            .send()
            .await?;
        parse(resp).await
    }

    pub async fn health(&self) -> Result<HealthResponse, Error> {
        let resp = self.http.get(self.endpoint(&["health"])).send().await?;
        parse(resp).await
    }

    pub async fn diseases(&self) -> Result<DiseaseListResponse, Error> {
        let resp = self.http.get(self.endpoint(&["diseases"])).send().await?;
        parse(resp).await
    }

    pub async fn info(&self, disease: &str) -> Result<DiseaseInfoResponse, Error> {
        let resp = self
            .http
            .get(self.endpoint(&["info", disease]))
            .send()
            .await?;
        parse(resp).await
    }
}

/// Decode a JSON body, turning error responses into their message.
async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let text = resp.text().await?;
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(format!("server answered {status}: {message}").into())
}
