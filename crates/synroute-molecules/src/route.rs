//! Route-prediction client.
//!
//! The remote service takes `{"smiles": ...}` and answers with a JSON object
//! whose `image_url` points at a rendered synthesis route. Fetching that
//! image is the second half of a prediction.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use synroute_common::{SandboxClient, SynrouteError};
use synroute_config::RouteConfig;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Why a route prediction produced no image. Every variant ends the action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route service returned HTTP {0}")]
    RemoteStatus(u16),

    #[error("route service response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("route service response has no image_url")]
    MissingImageLocator,

    #[error("route image request returned HTTP {0}")]
    ImageFetch(u16),

    #[error("route image is not in a recognised image format")]
    UndecodableImage,

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Blocked(String),
}

impl From<SynrouteError> for RouteError {
    fn from(e: SynrouteError) -> Self {
        match e {
            SynrouteError::Security(_) => RouteError::Blocked(e.to_string()),
            other => RouteError::Transport(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for RouteError {
    fn from(e: reqwest::Error) -> Self {
        // Redirect failures come from the allowlist-aware redirect policy.
        if e.is_redirect() {
            let reason = std::error::Error::source(&e)
                .map(|s| s.to_string())
                .unwrap_or_else(|| e.to_string());
            return RouteError::Blocked(reason);
        }
        RouteError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Svg,
}

impl ImageFormat {
    /// Identify an image from its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            return png_dimensions(bytes).map(|_| ImageFormat::Png);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }
        if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(ImageFormat::Webp);
        }
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
        let head = head.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
            return Some(ImageFormat::Svg);
        }
        None
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

/// Width and height from a PNG IHDR chunk, if the header is intact.
pub fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 24 || &data[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(data[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(data[20..24].try_into().ok()?);
    (width > 0 && height > 0).then_some((width, height))
}

/// The predicted route image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteImage {
    pub locator: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
struct RouteRequest<'a> {
    smiles: &'a str,
}

/// A service that predicts a synthesis route for a molecule.
#[async_trait]
pub trait RoutePredictor: Send + Sync {
    async fn predict(&self, smiles: &str) -> Result<RouteImage, RouteError>;
}

/// Client for the RXNMapper-style route endpoint.
#[derive(Debug, Clone)]
pub struct RxnRouteClient {
    client: SandboxClient,
    endpoint: String,
}

/// Subset of the service response we read.
#[derive(Debug, Deserialize)]
struct RouteResponse {
    image_url: Option<serde_json::Value>,
}

impl RxnRouteClient {
    pub fn new(client: SandboxClient, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into() }
    }

    pub fn from_config(cfg: &RouteConfig) -> Result<Self, SynrouteError> {
        let client = SandboxClient::with_allowlist(
            cfg.timeout(),
            cfg.connect_timeout(),
            cfg.allowed_hosts.iter().cloned(),
        )?;
        Ok(Self::new(client, cfg.endpoint.clone()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve the locator against the endpoint so relative paths work.
    fn resolve_locator(&self, locator: &str) -> Result<String, RouteError> {
        let base = Url::parse(&self.endpoint)
            .map_err(|e| RouteError::Transport(format!("invalid endpoint {}: {}", self.endpoint, e)))?;
        base.join(locator)
            .map(String::from)
            .map_err(|e| RouteError::MalformedResponse(format!("invalid image_url {:?}: {}", locator, e)))
    }

    async fn fetch_image(&self, locator: &str) -> Result<RouteImage, RouteError> {
        let url = self.resolve_locator(locator)?;
        debug!(%url, "fetching route image");
        let resp = self.client.get(&url)?.send().await?;
        if resp.status() != StatusCode::OK {
            warn!(status = resp.status().as_u16(), %url, "route image fetch failed");
            return Err(RouteError::ImageFetch(resp.status().as_u16()));
        }
        let bytes = resp.bytes().await?.to_vec();
        let format = ImageFormat::sniff(&bytes).ok_or(RouteError::UndecodableImage)?;
        Ok(RouteImage { locator: url, format, bytes })
    }
}

#[async_trait]
impl RoutePredictor for RxnRouteClient {
    async fn predict(&self, smiles: &str) -> Result<RouteImage, RouteError> {
        info!(endpoint = %self.endpoint, "requesting route prediction");

        // reqwest's `.json()` sets Content-Type: application/json
        let resp = self
            .client
            .post(&self.endpoint)?
            .json(&RouteRequest { smiles })
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            warn!(status = resp.status().as_u16(), "route service returned an error status");
            return Err(RouteError::RemoteStatus(resp.status().as_u16()));
        }

        let body = resp.bytes().await?;
        let parsed: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| RouteError::MalformedResponse(e.to_string()))?;
        let locator = serde_json::from_value::<RouteResponse>(parsed)
            .ok()
            .and_then(|r| r.image_url)
            .and_then(|v| v.as_str().map(str::to_owned))
            .filter(|s| !s.trim().is_empty())
            .ok_or(RouteError::MissingImageLocator)?;

        let image = self.fetch_image(&locator).await?;
        info!(format = ?image.format, bytes = image.bytes.len(), "route image received");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_formats() {
        let mut png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR".to_vec();
        png.extend_from_slice(&640u32.to_be_bytes());
        png.extend_from_slice(&480u32.to_be_bytes());
        assert_eq!(ImageFormat::sniff(&png), Some(ImageFormat::Png));
        assert_eq!(png_dimensions(&png), Some((640, 480)));

        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::sniff(b"GIF89a...."), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageFormat::Webp));
        assert_eq!(
            ImageFormat::sniff(b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            Some(ImageFormat::Svg)
        );
    }

    #[test]
    fn test_sniff_rejects_non_images() {
        assert_eq!(ImageFormat::sniff(b"<html><body>not found</body></html>"), None);
        assert_eq!(ImageFormat::sniff(b""), None);
        // Truncated PNG header
        assert_eq!(ImageFormat::sniff(b"\x89PNG\r\n\x1a\n"), None);
    }

    #[test]
    fn test_locator_resolution() {
        let client = RxnRouteClient::new(
            SandboxClient::new(std::time::Duration::from_secs(1), std::time::Duration::from_secs(1)).unwrap(),
            "https://rxnmapper.ai/api/route",
        );
        assert_eq!(
            client.resolve_locator("https://cdn.example.org/r.png").unwrap(),
            "https://cdn.example.org/r.png"
        );
        assert_eq!(
            client.resolve_locator("/static/routes/1.png").unwrap(),
            "https://rxnmapper.ai/static/routes/1.png"
        );
    }

    #[test]
    fn test_security_error_maps_to_blocked() {
        let err: RouteError = SynrouteError::Security("nope".into()).into();
        assert!(matches!(err, RouteError::Blocked(_)));
    }
}
