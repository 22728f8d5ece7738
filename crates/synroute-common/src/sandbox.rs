use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use url::Url;
use crate::error::SynrouteError;

const MAX_REDIRECTS: usize = 10;

/// An HTTP client with explicit timeouts that only talks to approved hosts.
///
/// An empty allowlist leaves the client unrestricted. Route images are served
/// from whatever host the prediction service chooses, so deployments that want
/// to pin them list those hosts explicitly. Redirects are held to the same
/// allowlist as the first request.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: Arc<HashSet<String>>,
}

impl SandboxClient {
    /// Builds a client bounded by `timeout` overall and `connect_timeout` for the TCP/TLS handshake.
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, SynrouteError> {
        Self::build(timeout, connect_timeout, HashSet::new())
    }

    /// Builds a client restricted to `domains` (and their subdomains).
    pub fn with_allowlist<I, S>(
        timeout: Duration,
        connect_timeout: Duration,
        domains: I,
    ) -> Result<Self, SynrouteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowlist = domains
            .into_iter()
            .map(|d| d.into().to_ascii_lowercase())
            .collect();
        Self::build(timeout, connect_timeout, allowlist)
    }

    fn build(
        timeout: Duration,
        connect_timeout: Duration,
        allowlist: HashSet<String>,
    ) -> Result<Self, SynrouteError> {
        let allowlist = Arc::new(allowlist);
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("synroute/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect_policy(Arc::clone(&allowlist)))
            .build()
            .map_err(|e| SynrouteError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    pub fn is_restricted(&self) -> bool {
        !self.allowlist.is_empty()
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        Url::parse(url).is_ok_and(|parsed| host_allowed(&self.allowlist, &parsed))
    }

    fn check(&self, url: &str) -> Result<(), SynrouteError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            warn!(%url, "outbound request blocked by host allowlist");
            Err(SynrouteError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )))
        }
    }

    /// Exposes the inner `reqwest::Client` builder pattern safely for GET requests.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, SynrouteError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    /// Exposes the inner `reqwest::Client` builder pattern safely for POST requests.
    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, SynrouteError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }
}

fn host_allowed(allowlist: &HashSet<String>, url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    if allowlist.is_empty() {
        return true;
    }
    let host = host.to_ascii_lowercase();
    // Exact match or a subdomain of an allowed domain
    allowlist
        .iter()
        .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
}

/// Follows at most [`MAX_REDIRECTS`] hops, each of which must pass the allowlist.
fn redirect_policy(allowlist: Arc<HashSet<String>>) -> Policy {
    Policy::custom(move |attempt: Attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        if host_allowed(&allowlist, attempt.url()) {
            return attempt.follow();
        }
        let target = attempt.url().to_string();
        warn!(url = %target, "redirect blocked by host allowlist");
        attempt.error(format!("redirect to {} is not in the host allowlist", target))
    })
}
