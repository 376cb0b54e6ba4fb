use super::types::{
    ImagePayload, ProcessFrameResponse, ProcessImageResponse, ServerHealth, Statistics,
};
use crate::config::ServerConfig;
use crate::error::{DecodeError, Result, TransportError};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

const PROCESS_FRAME: &str = "process_frame";
const PROCESS_IMAGE: &str = "process_image";
const STATISTICS: &str = "statistics";
const RESET_STATISTICS: &str = "reset_statistics";
const HEALTH: &str = "health";

/// Endpoints of the detection server
#[async_trait]
pub trait DetectionApi: Send + Sync {
    /// Run detection on a live frame
    async fn process_frame(&self, image: String) -> Result<ProcessFrameResponse>;

    /// Run detection on an uploaded still image
    async fn process_image(&self, image: String) -> Result<ProcessImageResponse>;

    async fn statistics(&self) -> Result<Statistics>;

    /// Succeeds only on a 2xx response
    async fn reset_statistics(&self) -> Result<()>;

    async fn health(&self) -> Result<ServerHealth>;
}

/// reqwest-backed client for the detection server
#[derive(Clone)]
pub struct MaskguardClient {
    http: Client,
    base_url: Url,
}

impl MaskguardClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        // Url::join replaces the last segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| TransportError::Request {
                endpoint: "client",
                source,
            })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &'static str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", path, e)).into())
    }

    async fn send<B, T>(&self, method: Method, path: &'static str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let bytes = self.send_raw(method, path, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|source| DecodeError::Json {
                endpoint: path,
                source,
            })
            .map_err(Into::into)
    }

    async fn send_raw<B>(&self, method: Method, path: &'static str, body: Option<&B>) -> Result<Vec<u8>>
    where
        B: Serialize + Sync,
    {
        let url = self.endpoint(path)?;
        trace!("{} {}", method, url);

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| TransportError::Request {
                endpoint: path,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint: path,
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request {
                endpoint: path,
                source,
            })?;

        debug!("{} returned {} bytes", path, bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DetectionApi for MaskguardClient {
    async fn process_frame(&self, image: String) -> Result<ProcessFrameResponse> {
        self.send(Method::POST, PROCESS_FRAME, Some(&ImagePayload { image }))
            .await
    }

    async fn process_image(&self, image: String) -> Result<ProcessImageResponse> {
        self.send(Method::POST, PROCESS_IMAGE, Some(&ImagePayload { image }))
            .await
    }

    async fn statistics(&self) -> Result<Statistics> {
        self.send::<(), _>(Method::GET, STATISTICS, None).await
    }

    async fn reset_statistics(&self) -> Result<()> {
        self.send_raw(Method::POST, RESET_STATISTICS, Some(&serde_json::json!({})))
            .await
            .map(|_| ())
    }

    async fn health(&self) -> Result<ServerHealth> {
        self.send::<(), _>(Method::GET, HEALTH, None).await
    }
}
