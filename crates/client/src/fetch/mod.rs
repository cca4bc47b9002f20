//! HTTP implementation of [`NetworkFetcher`].
//!
//! - Any method, request URL passed through as-is
//! - Non-2xx statuses come back as responses; only transport problems are errors
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Timeouts map to `FETCH_TIMEOUT`, everything else to `NETWORK_FAILURE`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};

use stash_core::{AppConfig, Error, NetworkFetcher, Request, Response};

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stash/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 5s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "stash/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(5000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.fetch_timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{url} after {}ms", self.config.timeout.as_millis()))
        } else {
            Error::NetworkFailure(format!("{url}: {err}"))
        }
    }
}

#[async_trait]
impl NetworkFetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let url = request.url.as_str();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await.map_err(|e| self.transport_error(url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `reply` verbatim to every connection on a loopback port.
    async fn serve(reply: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}")
    }

    fn fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(FetchConfig { timeout, ..Default::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "stash/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { fetch_timeout_ms: 1_500, max_bytes: 1024, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(1_500));
        assert_eq!(config.max_bytes, 1024);
    }

    #[tokio::test]
    async fn test_fetch_returns_response() {
        let base =
            serve("HTTP/1.1 200 OK\r\nContent-Type: text/css\r\nContent-Length: 6\r\nConnection: close\r\n\r\nbody{}")
                .await;
        let req = Request::parse("GET", &format!("{base}/css/style.css")).unwrap();

        let resp = fetcher(Duration::from_secs(5)).fetch(&req).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.status_text, "OK");
        assert_eq!(resp.body, b"body{}");
        assert_eq!(resp.header("content-type"), Some("text/css"));
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_failure() {
        let base = serve("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let req = Request::parse("GET", &format!("{base}/missing.png")).unwrap();

        let resp = fetcher(Duration::from_secs(5)).fetch(&req).await.unwrap();
        assert_eq!(resp.status, 404);
        assert!(!resp.is_cacheable());
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let base = serve("HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789").await;
        let req = Request::parse("GET", &format!("{base}/big.js")).unwrap();
        let fetcher = HttpFetcher::new(FetchConfig { max_bytes: 4, ..Default::default() }).unwrap();

        assert!(matches!(fetcher.fetch(&req).await, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let req = Request::parse("GET", &format!("http://{addr}/api/messages")).unwrap();

        let result = fetcher(Duration::from_secs(5)).fetch(&req).await;
        assert!(matches!(result, Err(Error::NetworkFailure(_))));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let req = Request::parse("GET", &format!("http://{addr}/pages/css.html")).unwrap();

        let result = fetcher(Duration::from_millis(200)).fetch(&req).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
    }
}
