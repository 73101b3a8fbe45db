use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, ServerAddress};
use crate::core::{Snapshot, DEFAULT_MAX_PLAYERS};
use crate::error::{FetchFailure, Result};
use crate::providers::StatsFetcher;

/// Steam `IGameServersService/GetServerList` client
pub struct SteamServerList {
    client: Client,
    api_base: String,
    api_key: String,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Deserialize)]
struct ServerListEnvelope {
    #[serde(default)]
    response: ServerListResponse,
}

#[derive(Debug, Deserialize, Default)]
struct ServerListResponse {
    #[serde(default)]
    servers: Vec<RawServer>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    #[serde(default, deserialize_with = "deserialize_count")]
    players: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_count")]
    max_players: Option<u32>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    map: Option<String>,
}

/// Accept counts as int, float, numeric string or null
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CountValue {
        Int(i64),
        Float(f64),
        String(String),
        Null,
    }

    let clamp = |n: i64| n.clamp(0, i64::from(u32::MAX)) as u32;

    Ok(match CountValue::deserialize(deserializer)? {
        CountValue::Int(i) => Some(clamp(i)),
        CountValue::Float(f) if f.is_finite() => Some(clamp(f.floor() as i64)),
        CountValue::Float(_) => None,
        CountValue::String(s) => s.trim().parse::<i64>().ok().map(clamp),
        CountValue::Null => None,
    })
}

/// Turn a GetServerList body into a snapshot stamped at `now`
///
/// Only `servers[0]` is considered; the address filter makes it unique.
pub fn parse_server_list(body: &str, now: i64) -> std::result::Result<Snapshot, FetchFailure> {
    let envelope: ServerListEnvelope =
        serde_json::from_str(body).map_err(|e| FetchFailure::Malformed(e.to_string()))?;

    let server = envelope
        .response
        .servers
        .into_iter()
        .next()
        .ok_or(FetchFailure::NoServers)?;

    Ok(Snapshot {
        players: server.players.unwrap_or(0),
        max_players: server.max_players.unwrap_or(DEFAULT_MAX_PLAYERS),
        server_name: server.name.unwrap_or_default(),
        map: server.map.unwrap_or_default(),
        timestamp: now,
    })
}

impl SteamServerList {
    /// Create a client from config with the wall clock
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchFailure::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            clock,
        })
    }

    /// Full request URL for `address`
    pub fn request_url(&self, address: &ServerAddress) -> String {
        format!(
            "{}/IGameServersService/GetServerList/v1/?key={}&filter={}",
            self.api_base,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&format!("addr\\{}", address)),
        )
    }

    fn classify(err: reqwest::Error) -> FetchFailure {
        if err.is_timeout() {
            FetchFailure::Timeout
        } else if err.is_decode() || err.is_body() {
            FetchFailure::Malformed(err.to_string())
        } else {
            FetchFailure::Network(err.to_string())
        }
    }
}

#[async_trait]
impl StatsFetcher for SteamServerList {
    async fn fetch(&self, address: &ServerAddress) -> Result<Snapshot> {
        let url = self.request_url(address);
        tracing::debug!("Fetching server list for {}", address);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::classify)?;

        if response.status() != StatusCode::OK {
            return Err(FetchFailure::Status(response.status().as_u16()).into());
        }

        let body = response.text().await.map_err(Self::classify)?;
        let snapshot = parse_server_list(&body, self.clock.now())?;

        tracing::debug!(
            "{} reports {}/{} on {}",
            snapshot.server_name,
            snapshot.players,
            snapshot.max_players,
            snapshot.map
        );

        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "steam"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_parse_server_list() {
        let body = r#"{"response":{"servers":[
            {"addr":"1.2.3.4:27015","players":42,"max_players":100,"name":"S","map":"M"},
            {"players":1,"max_players":2,"name":"other","map":"x"}
        ]}}"#;

        let snapshot = parse_server_list(body, 1_700_000_000).unwrap();
        assert_eq!(snapshot, Snapshot::new(42, 100, "S", "M", 1_700_000_000));
    }

    #[test]
    fn test_parse_missing_fields_use_defaults() {
        let body = r#"{"response":{"servers":[{"name":"S"}]}}"#;
        let snapshot = parse_server_list(body, 5).unwrap();
        assert_eq!(snapshot.players, 0);
        assert_eq!(snapshot.max_players, 100);
        assert_eq!(snapshot.server_name, "S");
        assert_eq!(snapshot.map, "");
    }

    #[test]
    fn test_parse_lenient_counts() {
        let body = r#"{"response":{"servers":[
            {"players":"17","max_players":64.0,"name":"S","map":"M"}
        ]}}"#;
        let snapshot = parse_server_list(body, 5).unwrap();
        assert_eq!(snapshot.players, 17);
        assert_eq!(snapshot.max_players, 64);

        let body = r#"{"response":{"servers":[{"players":-3,"max_players":null}]}}"#;
        let snapshot = parse_server_list(body, 5).unwrap();
        assert_eq!(snapshot.players, 0);
        assert_eq!(snapshot.max_players, 100);

        let body = r#"{"response":{"servers":[{"players":"lots"}]}}"#;
        assert_eq!(parse_server_list(body, 5).unwrap().players, 0);
    }

    #[test]
    fn test_parse_empty_results() {
        assert_eq!(
            parse_server_list(r#"{"response":{"servers":[]}}"#, 0),
            Err(FetchFailure::NoServers)
        );
        assert_eq!(
            parse_server_list(r#"{"response":{}}"#, 0),
            Err(FetchFailure::NoServers)
        );
        assert_eq!(parse_server_list("{}", 0), Err(FetchFailure::NoServers));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_server_list("<html>", 0),
            Err(FetchFailure::Malformed(_))
        ));
        assert!(matches!(
            parse_server_list(r#"{"response":{"servers":{"players":1}}}"#, 0),
            Err(FetchFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_request_url() {
        let mut config = Config::default();
        config.api_base = "https://api.example.com/".to_string();
        config.api_key = "KEY".to_string();

        let fetcher = SteamServerList::with_clock(&config, Arc::new(ManualClock::new(0))).unwrap();
        let address = ServerAddress::new("10.0.0.1", 27015);

        assert_eq!(
            fetcher.request_url(&address),
            "https://api.example.com/IGameServersService/GetServerList/v1/?key=KEY&filter=addr%5C10.0.0.1%3A27015"
        );
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_failure() {
        let mut config = Config::default();
        // Reserved port on loopback, nothing listens there
        config.api_base = "http://127.0.0.1:9".to_string();
        config.request_timeout_secs = 2;

        let fetcher = SteamServerList::new(&config).unwrap();
        let err = fetcher
            .fetch(&ServerAddress::new("10.0.0.1", 27015))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::error::StatsError::Fetch(FetchFailure::Network(_) | FetchFailure::Timeout)
        ));
    }

    /// Answer one request on a loopback listener with a canned response,
    /// yielding the raw request head
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    fn local_fetcher(base: String, now: i64) -> SteamServerList {
        let mut config = Config::default();
        config.api_base = base;
        config.api_key = "KEY".to_string();
        config.user_agent = "stats-test/1.0".to_string();
        config.request_timeout_secs = 5;
        SteamServerList::with_clock(&config, Arc::new(ManualClock::new(now))).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_ok_response() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"response":{"servers":[{"players":12,"max_players":48,"name":"Local","map":"gm_flat"}]}}"#,
        )
        .await;
        let fetcher = local_fetcher(base, 1_700_000_000);

        let snapshot = fetcher
            .fetch(&ServerAddress::new("10.0.0.1", 27015))
            .await
            .unwrap();
        assert_eq!(snapshot, Snapshot::new(12, 48, "Local", "gm_flat", 1_700_000_000));

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "GET /IGameServersService/GetServerList/v1/?key=KEY&filter=addr%5C10.0.0.1%3A27015 "
        ));
        assert!(request.to_ascii_lowercase().contains("user-agent: stats-test/1.0\r\n"));
    }

    #[tokio::test]
    async fn test_fetch_non_ok_status() {
        let (base, server) = serve_once("503 Service Unavailable", "{}").await;
        let fetcher = local_fetcher(base, 1_700_000_000);

        let err = fetcher
            .fetch(&ServerAddress::new("10.0.0.1", 27015))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::StatsError::Fetch(FetchFailure::Status(503))
        ));

        let request = server.await.unwrap();
        assert!(request.to_ascii_lowercase().contains("user-agent: stats-test/1.0\r\n"));
    }

    #[tokio::test]
    #[ignore] // Requires network access and STEAM_API_KEY
    async fn test_fetch_live() {
        let mut config = Config::default();
        config.api_key = std::env::var("STEAM_API_KEY").unwrap();
        let fetcher = SteamServerList::new(&config).unwrap();

        let result = fetcher.fetch(&config.server).await;
        assert!(result.is_ok() || matches!(result, Err(crate::error::StatsError::Fetch(_))));
    }
}
