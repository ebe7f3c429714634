//! Background state synchronization between the device and the hub.
//!
//! A single tokio task samples the device every interval and pushes
//! attribute updates for the media-player entity. Per-item metadata and
//! artwork are only pushed when the content hash changes.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use atvbridge_device::{DeviceError, DeviceSession};
use atvbridge_hub::{EntityAttributes, HubApi, HubError};

use crate::media::{artwork_data_uri, entity_state};

/// Entity ids the hub currently subscribes to.
pub type Subscriptions = Arc<RwLock<HashSet<String>>>;

/// Default interval between the end of one tick and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default artwork width in pixels; height follows the aspect ratio.
pub const DEFAULT_ARTWORK_WIDTH: u32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub artwork_width: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            artwork_width: DEFAULT_ARTWORK_WIDTH,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum TickError {
    #[error("device: {0}")]
    Device(#[from] DeviceError),

    #[error("hub: {0}")]
    Hub(#[from] HubError),
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// The entity has no hub subscriber; nothing was sampled.
    Skipped,
    /// State and position pushed.
    StateOnly,
    /// State, position and per-item metadata pushed.
    WithMetadata,
}

/// Per-task sampling state.
pub(crate) struct StateSync {
    session: Arc<dyn DeviceSession>,
    hub: Arc<dyn HubApi>,
    entity_id: String,
    subscriptions: Subscriptions,
    artwork_width: u32,
    prev_hash: Option<String>,
}

impl StateSync {
    pub(crate) fn new(
        session: Arc<dyn DeviceSession>,
        hub: Arc<dyn HubApi>,
        entity_id: String,
        subscriptions: Subscriptions,
        artwork_width: u32,
    ) -> Self {
        Self {
            session,
            hub,
            entity_id,
            subscriptions,
            artwork_width,
            prev_hash: None,
        }
    }

    fn is_subscribed(&self) -> bool {
        self.subscriptions
            .read()
            .map(|s| s.contains(&self.entity_id))
            .unwrap_or(false)
    }

    /// Samples the device once and pushes the resulting update.
    pub(crate) async fn tick(&mut self) -> Result<TickOutcome, TickError> {
        if !self.is_subscribed() {
            return Ok(TickOutcome::Skipped);
        }

        let playing = self.session.currently_playing().await?;
        let power = self.session.power_state();

        let mut attrs = EntityAttributes {
            state: Some(entity_state(power, playing.device_state)),
            media_position: Some(playing.position.unwrap_or(0)),
            ..Default::default()
        };

        let changed = self.prev_hash.as_deref() != Some(playing.content_hash.as_str());
        if changed {
            debug!(entity = %self.entity_id, hash = %playing.content_hash, "content changed");
            match self.session.fetch_artwork(self.artwork_width, None).await {
                Ok(Some(artwork)) => attrs.media_image_url = Some(artwork_data_uri(&artwork)),
                Ok(None) => attrs.media_image_url = Some(String::new()),
                Err(e) => warn!(entity = %self.entity_id, error = %e, "artwork fetch failed"),
            }
            attrs.media_duration = Some(playing.total_time.unwrap_or(0));
            attrs.media_title = Some(playing.title.clone().unwrap_or_default());
            attrs.media_artist = Some(playing.artist.clone().unwrap_or_default());
            attrs.media_album = Some(playing.album.clone().unwrap_or_default());
        }

        self.hub
            .update_entity_attributes(&self.entity_id, attrs)
            .await?;
        self.prev_hash = Some(playing.content_hash);

        Ok(if changed {
            TickOutcome::WithMetadata
        } else {
            TickOutcome::StateOnly
        })
    }
}

/// Owns the polling task.
///
/// At most one task runs at a time. [`stop`](Self::stop) cancels the task and
/// waits for it to exit, so no tick can touch the session afterwards.
#[derive(Default)]
pub struct StatePoller {
    task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl StatePoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Spawns the polling task. No-op if one is already running.
    pub fn start(
        &mut self,
        session: Arc<dyn DeviceSession>,
        hub: Arc<dyn HubApi>,
        entity_id: String,
        subscriptions: Subscriptions,
        config: PollerConfig,
    ) {
        if self.task.is_some() {
            return;
        }

        let interval = if config.interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            config.interval
        };

        let cancel = CancellationToken::new();
        let sync = StateSync::new(
            session,
            hub,
            entity_id.clone(),
            subscriptions,
            config.artwork_width,
        );
        let handle = tokio::spawn(poll_loop(sync, interval, cancel.clone()));
        self.task = Some((cancel, handle));

        info!(entity = %entity_id, ?interval, "polling started");
    }

    /// Cancels the polling task and waits for it to exit.
    pub async fn stop(&mut self) {
        if let Some((cancel, handle)) = self.task.take() {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "polling task ended abnormally");
            }
            info!("polling stopped");
        }
    }
}

/// Main polling loop. Each tick sleeps after finishing, so slow ticks
/// delay the next one rather than overlapping it.
async fn poll_loop(mut sync: StateSync, interval: Duration, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = sync.tick() => {
                if let Err(e) = result {
                    warn!(entity = %sync.entity_id, error = %e, "poll tick failed");
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
