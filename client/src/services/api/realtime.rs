//! # Realtime Profile Channel
//!
//! WebSocket client for row-change notifications. Each open channel owns one
//! connection: after connecting it sends a join frame scoped to a profile id, then
//! forwards every `profile_update` frame for that row to the channel's callback until
//! the channel is closed or the server hangs up.
//!
//! ```text
//! → {"type":"subscribe","channel":"profiles:<id>","key":"<id>"}
//! ← {"type":"subscribed","channel":"profiles:<id>"}
//! ← {"type":"profile_update","data":{"id":"<id>","balance":1250.75,...}}
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{mask_id, UserProfile};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::core::config::ClientConfig;
use crate::core::error::RemoteError;
use crate::core::service::{ChannelHandle, ProfileCallback, RealtimeProvider};

/// Frame sent to subscribe to a row
#[derive(Debug, Serialize)]
struct JoinFrame<'a> {
    #[serde(rename = "type")]
    message_type: &'static str,
    channel: String,
    key: &'a str,
}

/// Any frame received from the server
#[derive(Debug, Deserialize)]
struct ServerFrame {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    data: Value,
}

pub(crate) fn join_frame(key: &str) -> String {
    let frame = JoinFrame {
        message_type: "subscribe",
        channel: format!("profiles:{}", key),
        key,
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

/// Extract the profile carried by a text frame, if it is an update for `key`.
pub(crate) fn parse_profile_update(text: &str, key: &str) -> Option<UserProfile> {
    let frame = match serde_json::from_str::<ServerFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, message_length = text.len(), "Malformed realtime frame");
            return None;
        }
    };

    if frame.message_type != "profile_update" {
        trace!(message_type = %frame.message_type, "Ignoring realtime frame");
        return None;
    }

    match serde_json::from_value::<UserProfile>(frame.data) {
        Ok(profile) if profile.id == key => Some(profile),
        Ok(_) => {
            debug!("Realtime update for another row ignored");
            None
        }
        Err(e) => {
            warn!(error = %e, "Realtime profile payload did not parse");
            None
        }
    }
}

struct ChannelTask {
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// WebSocket realtime client.
pub struct RealtimeClient {
    url: String,
    connect_timeout: std::time::Duration,
    next_id: AtomicU64,
    channels: Arc<Mutex<HashMap<u64, ChannelTask>>>,
}

impl RealtimeClient {
    pub fn new(config: &ClientConfig) -> Self {
        let url = match &config.api_anon_key {
            Some(key) => format!("{}?apikey={}", config.realtime_url, key),
            None => config.realtime_url.clone(),
        };
        Self {
            url,
            connect_timeout: config.http_timeout,
            next_id: AtomicU64::new(1),
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Channels whose connection is still live.
    pub fn open_count(&self) -> usize {
        self.channels.lock().len()
    }
}

#[async_trait]
impl RealtimeProvider for RealtimeClient {
    async fn open_channel(
        &self,
        key: &str,
        on_update: ProfileCallback,
    ) -> Result<ChannelHandle, RemoteError> {
        let connect = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()));
        let (ws_stream, response) = match connect.await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                return Err(RemoteError::text(format!("Realtime connection failed: {}", e)))
            }
            Err(_) => return Err(RemoteError::text("Realtime connection timed out")),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(channel = id, user = %mask_id(key), status = ?response.status(), "Realtime channel connected");

        let (mut write, mut read) = ws_stream.split();
        write
            .send(Message::Text(join_frame(key).into()))
            .await
            .map_err(|e| RemoteError::text(format!("Realtime subscribe failed: {}", e)))?;

        let (close_tx, mut close_rx) = oneshot::channel::<()>();
        let row = key.to_string();
        let registry = Arc::clone(&self.channels);

        let run = async move {
            let mut updates = 0u64;
            let closed_locally = loop {
                tokio::select! {
                    _ = &mut close_rx => {
                        let _ = write.send(Message::Close(None)).await;
                        break true;
                    }
                    message = read.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(profile) = parse_profile_update(&text, &row) {
                                updates += 1;
                                on_update(profile);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                warn!(error = %e, "Failed to send pong response");
                                break false;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(code = ?frame.as_ref().map(|f| f.code), "Realtime channel closed by server");
                            break false;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "Realtime read error");
                            break false;
                        }
                        None => break false,
                    },
                }
            };

            if !closed_locally {
                registry.lock().remove(&id);
                warn!(channel = id, user = %mask_id(&row), "Realtime channel lost, live updates stopped until the next session");
            }
            debug!(channel = id, updates, "Realtime channel task ended");
        };

        // Spawned under the lock so a task that ends at once still finds its entry
        {
            let mut channels = self.channels.lock();
            let task = tokio::spawn(run);
            channels.insert(id, ChannelTask { close_tx, task });
        }

        Ok(ChannelHandle {
            id,
            key: key.to_string(),
        })
    }

    async fn close_channel(&self, handle: ChannelHandle) -> Result<(), RemoteError> {
        let removed = self.channels.lock().remove(&handle.id);
        let Some(channel) = removed else {
            if handle.id < self.next_id.load(Ordering::Relaxed) {
                debug!(channel = handle.id, "Realtime channel already ended");
                return Ok(());
            }
            return Err(RemoteError::text(format!("Unknown realtime channel {}", handle.id)));
        };

        // A task that already ended has dropped its receiver
        let _ = channel.close_tx.send(());
        match tokio::time::timeout(self.connect_timeout, channel.task).await {
            Ok(_) => {
                debug!(channel = handle.id, "Realtime channel closed");
                Ok(())
            }
            Err(_) => Err(RemoteError::text("Realtime channel did not close in time")),
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        for (_, channel) in self.channels.lock().drain() {
            channel.task.abort();
        }
    }
}
