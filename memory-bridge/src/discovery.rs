//! Resolution of the bridge URL.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{MemoryError, Result};

/// Environment variable that overrides tunnel discovery.
pub const BRIDGE_URL_ENV_VAR: &str = "AUTOLOGUE_BRIDGE_URL";

/// Local ngrok agent API listing the active tunnels.
pub const NGROK_API_URL: &str = "http://127.0.0.1:4040/api/tunnels";

const NGROK_ATTEMPTS: u32 = 10;
const NGROK_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct TunnelList {
    #[serde(default)]
    tunnels: Vec<Tunnel>,
}

#[derive(Debug, Deserialize)]
struct Tunnel {
    public_url: String,
}

/// Locates the knowledge-graph bridge.
///
/// Resolution order:
/// 1. `explicit_url` if provided and non-empty.
/// 2. The URL in the `AUTOLOGUE_BRIDGE_URL` environment variable.
/// 3. The first HTTPS tunnel reported by the local ngrok agent.
///
/// # Errors
///
/// Returns `MemoryError::Discovery` when no URL can be resolved.
pub async fn discover_bridge_url(explicit_url: Option<&str>) -> Result<String> {
    if let Some(url) = explicit_url.map(str::trim).filter(|url| !url.is_empty()) {
        return Ok(url.to_string());
    }

    if let Ok(url) = std::env::var(BRIDGE_URL_ENV_VAR) {
        let url = url.trim();
        if !url.is_empty() {
            return Ok(url.to_string());
        }
    }

    ngrok_tunnel_url(NGROK_API_URL, NGROK_ATTEMPTS, NGROK_RETRY_DELAY).await
}

/// Polls an ngrok agent API until it reports an HTTPS tunnel.
///
/// # Errors
///
/// Returns `MemoryError::Discovery` after `attempts` unsuccessful polls.
pub async fn ngrok_tunnel_url(api_url: &str, attempts: u32, delay: Duration) -> Result<String> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| MemoryError::Config(e.to_string()))?;

    for attempt in 1..=attempts {
        match fetch_tunnels(&http, api_url).await {
            Ok(tunnels) => {
                if let Some(url) = first_https_tunnel(&tunnels) {
                    tracing::info!(%url, "Found ngrok tunnel");
                    return Ok(url);
                }
                tracing::warn!(attempt, attempts, "No HTTPS tunnel found");
            }
            Err(e) => tracing::warn!(attempt, attempts, error = %e, "Failed to query ngrok"),
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::error!("Failed to retrieve ngrok URL after all attempts");
    Err(MemoryError::Discovery(format!(
        "no HTTPS tunnel reported by {api_url} after {attempts} attempts"
    )))
}

async fn fetch_tunnels(http: &reqwest::Client, api_url: &str) -> Result<TunnelList> {
    http.get(api_url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| MemoryError::Network(e.to_string()))?
        .json::<TunnelList>()
        .await
        .map_err(|e| MemoryError::Parse(e.to_string()))
}

fn first_https_tunnel(list: &TunnelList) -> Option<String> {
    list.tunnels
        .iter()
        .map(|tunnel| tunnel.public_url.as_str())
        .find(|url| url.starts_with("https://"))
        .map(ToString::to_string)
}
