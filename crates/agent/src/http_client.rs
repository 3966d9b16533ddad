//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with proxy support.

use crate::types::{AgentError, AgentResult};

/// Build a `reqwest::Client` with the given proxy URL.
///
/// - `Some(url)` -> route all traffic through the proxy
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(proxy_url: Option<&str>) -> AgentResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    match proxy_url {
        Some(url) => {
            let proxy = reqwest::Proxy::all(url)
                .map_err(|e| AgentError::config(format!("Invalid proxy URL {}: {}", url, e)))?;
            builder = builder.proxy(proxy);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    builder
        .build()
        .map_err(|e| AgentError::config(format!("Failed to build HTTP client: {}", e)))
}
