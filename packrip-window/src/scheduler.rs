use crate::broadcast::ResultBroadcaster;
use crate::window::{EnrollOutcome, ParticipationWindow, WindowInfo};
use crate::{Result, WindowError};
use chrono::{DateTime, Utc};
use packrip_core::{
    draw_from_collection, CollectionLedger, ConfigStore, DrawResult, PackripError, WindowSettings,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Timing of the autonomous open/resolve cycle
#[derive(Debug, Clone, Copy)]
pub struct WindowSchedule {
    pub duration: Duration,
    pub period: Duration,
}

impl From<&WindowSettings> for WindowSchedule {
    fn from(settings: &WindowSettings) -> Self {
        Self {
            duration: settings.duration(),
            period: settings.period(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    EmptyPool,
    Persist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantFailure {
    pub viewer_id: String,
    pub kind: FailureKind,
    pub message: String,
}

/// What one resolution awarded, and to whom it could not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub channel_id: String,
    pub cycle_id: Option<Uuid>,
    pub results: Vec<DrawResult>,
    pub failures: Vec<ParticipantFailure>,
}

impl ResolutionReport {
    fn new(channel_id: &str, cycle_id: Option<Uuid>) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            cycle_id,
            results: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Chat-friendly one-liner
    pub fn summary(&self) -> String {
        if self.results.is_empty() && self.failures.is_empty() {
            return "Pack window closed. Nobody ripped a pack this time.".to_string();
        }

        if self.results.is_empty() {
            return "Pack window closed. No packs were successfully opened.".to_string();
        }

        let winners: Vec<String> = self
            .results
            .iter()
            .map(|r| format!("{} ({})", r.viewer_id, r.rarity))
            .collect();
        format!("Pack window closed! Congratulations: {}", winners.join(", "))
    }
}

/// Returns the window to `Closed` when dropped, including when the resolving
/// future is cancelled or unwinds part way through.
struct ResolveGuard<'a> {
    window: &'a Mutex<ParticipationWindow>,
    channel_id: &'a str,
    completed: bool,
}

impl<'a> ResolveGuard<'a> {
    fn new(window: &'a Mutex<ParticipationWindow>, channel_id: &'a str) -> Self {
        Self {
            window,
            channel_id,
            completed: false,
        }
    }
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(
                "Resolution for {} was interrupted, remaining participants were not awarded",
                self.channel_id
            );
        }
        self.window.lock().finish_resolve();
    }
}

/// Owns one channel's participation window and drives it through
/// open, collect and resolve.
///
/// The window is only touched under its mutex and the lock is never held
/// across an await. While a resolution is running the window sits in
/// `Resolving`: entries are refused and a new `open` fails with
/// `ResolveInProgress` until the resolution finishes.
pub struct WindowScheduler {
    channel_id: String,
    window: Mutex<ParticipationWindow>,
    config_store: Arc<dyn ConfigStore>,
    ledger: Arc<dyn CollectionLedger>,
    broadcaster: Option<Arc<ResultBroadcaster>>,
    pending_broadcasts: Mutex<Vec<JoinHandle<()>>>,
    last_rip_at: RwLock<Option<DateTime<Utc>>>,
}

impl WindowScheduler {
    pub fn new(
        channel_id: impl Into<String>,
        config_store: Arc<dyn ConfigStore>,
        ledger: Arc<dyn CollectionLedger>,
        broadcaster: Option<Arc<ResultBroadcaster>>,
    ) -> Self {
        let channel_id = channel_id.into();
        Self {
            window: Mutex::new(ParticipationWindow::new(channel_id.clone())),
            channel_id,
            config_store,
            ledger,
            broadcaster,
            pending_broadcasts: Mutex::new(Vec::new()),
            last_rip_at: RwLock::new(None),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn info(&self) -> WindowInfo {
        self.window.lock().info()
    }

    /// When a resolution last awarded at least one card
    pub fn last_rip_at(&self) -> Option<DateTime<Utc>> {
        *self.last_rip_at.read()
    }

    pub fn open(&self, duration: Duration) -> Result<Uuid> {
        self.open_at(duration, Utc::now())
    }

    pub fn open_at(&self, duration: Duration, now: DateTime<Utc>) -> Result<Uuid> {
        self.window.lock().open(duration, now)
    }

    pub fn enroll(&self, viewer_id: &str) -> Result<EnrollOutcome> {
        self.enroll_at(viewer_id, Utc::now())
    }

    pub fn enroll_at(&self, viewer_id: &str, now: DateTime<Utc>) -> Result<EnrollOutcome> {
        self.window.lock().enroll(viewer_id, now)
    }

    /// Close the window and award a card to every participant.
    ///
    /// A draw or ledger failure only costs that participant their card. A
    /// missing or broken collection config aborts the whole cycle.
    pub async fn resolve(&self) -> Result<ResolutionReport> {
        let (cycle_id, participants) = {
            let mut window = self.window.lock();
            let participants = window.begin_resolve()?;
            (window.cycle_id(), participants)
        };

        let mut guard = ResolveGuard::new(&self.window, &self.channel_id);
        let outcome = self.award_participants(cycle_id, participants).await;
        guard.completed = true;
        drop(guard);

        match &outcome {
            Ok(report) => {
                if !report.results.is_empty() {
                    *self.last_rip_at.write() = Some(Utc::now());
                }
                tracing::info!("{} [{}]", report.summary(), self.channel_id);
            }
            Err(e) => tracing::error!("Rip window for {} aborted: {}", self.channel_id, e),
        }

        outcome
    }

    async fn award_participants(
        &self,
        cycle_id: Option<Uuid>,
        participants: Vec<String>,
    ) -> Result<ResolutionReport> {
        let mut report = ResolutionReport::new(&self.channel_id, cycle_id);
        if participants.is_empty() {
            return Ok(report);
        }

        // Always re-read: the streamer may have synced a new config since the last window
        let collection = match self.config_store.active_collection(&self.channel_id).await {
            Ok(collection) => collection,
            Err(e) if e.is_configuration() => {
                return Err(WindowError::Configuration(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        for viewer_id in participants {
            let drawn = {
                let mut rng = rand::thread_rng();
                draw_from_collection(&collection, &viewer_id, &mut rng)
            };

            let result = match drawn {
                Ok(result) => result,
                Err(e) => {
                    report.failures.push(self.failure(viewer_id, FailureKind::EmptyPool, e));
                    continue;
                }
            };

            let appended = self
                .ledger
                .append(&self.channel_id, &viewer_id, &result.item)
                .await;
            if let Err(e) = appended {
                report.failures.push(self.failure(viewer_id, FailureKind::Persist, e));
                continue;
            }

            tracing::info!(
                "Awarded {} a {} card: {}",
                viewer_id,
                result.rarity,
                result.item.name
            );

            self.spawn_broadcast(&result);
            report.results.push(result);
        }

        Ok(report)
    }

    fn failure(&self, viewer_id: String, kind: FailureKind, error: PackripError) -> ParticipantFailure {
        tracing::warn!(
            "Failed to rip for {} in {}: {}",
            viewer_id,
            self.channel_id,
            error
        );
        ParticipantFailure {
            viewer_id,
            kind,
            message: error.to_string(),
        }
    }

    fn spawn_broadcast(&self, result: &DrawResult) {
        let Some(broadcaster) = self.broadcaster.clone() else {
            return;
        };

        let channel_id = self.channel_id.clone();
        let result = result.clone();
        let handle = tokio::spawn(async move {
            // publish logs its own failures
            let _ = broadcaster.publish(&channel_id, &result).await;
        });

        let mut pending = self.pending_broadcasts.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for broadcasts that are still in flight.
    pub async fn flush_broadcasts(&self) {
        let handles = std::mem::take(&mut *self.pending_broadcasts.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Broadcast task for {} failed: {}", self.channel_id, e);
            }
        }
    }

    /// Open, wait out the deadline, resolve.
    pub async fn run_cycle(&self, duration: Duration) -> Option<ResolutionReport> {
        if let Err(e) = self.open(duration) {
            tracing::warn!("Could not open rip window for {}: {}", self.channel_id, e);
            return None;
        }

        let info = self.info();
        if let Some(announcement) = info.announcement() {
            tracing::info!("{} [{}]", announcement, self.channel_id);
        }

        let closes_at = info.closes_at;
        if let Some(closes_at) = closes_at {
            let remaining = (closes_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(remaining).await;
        }

        self.resolve().await.ok()
    }

    /// Run cycles forever: the first window opens immediately, the next one
    /// every `period` after that. Abort the handle to stop.
    pub fn spawn_autonomous(self: &Arc<Self>, schedule: WindowSchedule) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(schedule.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                scheduler.run_cycle(schedule.duration).await;
            }
        })
    }
}
