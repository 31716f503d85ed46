//! TCP reachability probe used as the connectivity signal for `ditto watch`.

use std::time::Duration;

use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::error::CliError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Periodically checks whether the sync endpoint accepts TCP connections.
#[derive(Debug, Clone)]
pub struct ReachabilityProbe {
    host: String,
    port: u16,
    interval: Duration,
}

impl ReachabilityProbe {
    pub fn for_endpoint(endpoint: &str, interval: Duration) -> Result<Self, CliError> {
        let url = Url::parse(endpoint)
            .map_err(|error| CliError::Config(format!("invalid endpoint {endpoint}: {error}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| CliError::Config(format!("endpoint {endpoint} has no host")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| CliError::Config(format!("endpoint {endpoint} has no port")))?;
        if interval.is_zero() {
            return Err(CliError::Config("probe interval must be positive".into()));
        }

        Ok(Self {
            host,
            port,
            interval,
        })
    }

    pub fn target(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    /// One connection attempt.
    pub async fn check(&self) -> bool {
        matches!(
            time::timeout(
                CONNECT_TIMEOUT,
                TcpStream::connect((self.host.as_str(), self.port))
            )
            .await,
            Ok(Ok(_))
        )
    }

    /// Publish a reachability report every interval until the receiver goes away.
    pub async fn run(self, reports: mpsc::Sender<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let reachable = self.check().await;
            tracing::debug!(host = %self.host, port = self.port, reachable, "Reachability probe");
            if reports.send(reachable).await.is_err() {
                break;
            }
        }
    }
}
