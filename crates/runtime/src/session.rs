use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};
use uiaquery_script::{ElementRef, Query, RuntimeId, decode_ids};

use crate::channel::{ChannelError, CommandChannel};
use crate::error::QueryError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Upper bound for one round trip. `None` waits indefinitely.
    pub command_timeout_ms: Option<u64>,
    /// Default for whether `//` searches from a context element include the
    /// element itself.
    pub include_context_element_in_search: bool,
}

impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_include_context_element_in_search(mut self, include: bool) -> Self {
        self.include_context_element_in_search = include;
        self
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }
}

/// A scripting host reached through a [`CommandChannel`].
///
/// Round trips are serialized: callers queue on a fair async mutex, so at
/// most one command is outstanding per session and commands run in the
/// order they were issued.
pub struct RemoteSession {
    channel: Arc<dyn CommandChannel>,
    turn: Mutex<()>,
    config: SessionConfig,
    round_trips: AtomicU64,
}

impl RemoteSession {
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self::with_config(channel, SessionConfig::default())
    }

    pub fn with_config(channel: Arc<dyn CommandChannel>, config: SessionConfig) -> Self {
        Self { channel, turn: Mutex::new(()), config, round_trips: AtomicU64::new(0) }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of commands sent so far.
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Send one query and return the host's raw output.
    pub async fn execute(&self, query: &Query) -> Result<String, QueryError> {
        let _turn = self.turn.lock().await;
        let number = self.round_trips.fetch_add(1, Ordering::Relaxed) + 1;
        let command = query.to_command();
        trace!(round_trip = number, script = query.script(), "sending query");

        let start = Instant::now();
        let result = match self.config.command_timeout() {
            Some(limit) => match tokio::time::timeout(limit, self.channel.execute(&command)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        round_trip = number,
                        timeout_ms = self.config.command_timeout_ms,
                        "remote query timed out",
                    );
                    Err(ChannelError::Timeout(limit))
                }
            },
            None => self.channel.execute(&command).await,
        };
        debug!(
            round_trip = number,
            command_len = command.len(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            ok = result.is_ok(),
            "remote query finished",
        );
        Ok(result?)
    }

    /// Realize `element` and decode the runtime ids it produced.
    ///
    /// An empty group is answered without a round trip.
    pub async fn query_ids(&self, element: &ElementRef) -> Result<Vec<RuntimeId>, QueryError> {
        if element.is_empty() {
            return Ok(Vec::new());
        }
        let output = self.execute(&element.to_query()).await?;
        Ok(decode_ids(&output)?)
    }
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("config", &self.config)
            .field("round_trips", &self.round_trips())
            .finish_non_exhaustive()
    }
}
