use crate::{Result, WindowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

/// Lifecycle of a participation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowState {
    Closed,
    Open,
    /// Entries are frozen while cards are being awarded
    Resolving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled,
    AlreadyEnrolled,
}

/// Entries for one channel's current pack opening.
///
/// Callers own the window exclusively (the scheduler keeps it behind a mutex)
/// and pass `now` explicitly so deadlines stay deterministic.
#[derive(Debug)]
pub struct ParticipationWindow {
    channel_id: String,
    state: WindowState,
    cycle_id: Option<Uuid>,
    participants: Vec<String>,
    enrolled: HashSet<String>,
    opened_at: Option<DateTime<Utc>>,
    closes_at: Option<DateTime<Utc>>,
}

impl ParticipationWindow {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            state: WindowState::Closed,
            cycle_id: None,
            participants: Vec::new(),
            enrolled: HashSet::new(),
            opened_at: None,
            closes_at: None,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn cycle_id(&self) -> Option<Uuid> {
        self.cycle_id
    }

    pub fn closes_at(&self) -> Option<DateTime<Utc>> {
        self.closes_at
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_accepting(&self, now: DateTime<Utc>) -> bool {
        self.state == WindowState::Open && self.closes_at.map_or(false, |deadline| now < deadline)
    }

    /// Start a new window, dropping whatever the previous one collected.
    pub fn open(&mut self, duration: Duration, now: DateTime<Utc>) -> Result<Uuid> {
        if self.state == WindowState::Resolving {
            return Err(WindowError::ResolveInProgress {
                channel_id: self.channel_id.clone(),
            });
        }

        if self.state == WindowState::Open && !self.participants.is_empty() {
            tracing::warn!(
                "Reopening rip window for {} discards {} unresolved entr{}",
                self.channel_id,
                self.participants.len(),
                if self.participants.len() == 1 { "y" } else { "ies" }
            );
        }

        let duration = chrono::Duration::from_std(duration)
            .map_err(|e| WindowError::Internal(format!("Invalid window duration: {}", e)))?;

        let cycle_id = Uuid::new_v4();
        self.participants.clear();
        self.enrolled.clear();
        self.state = WindowState::Open;
        self.cycle_id = Some(cycle_id);
        self.opened_at = Some(now);
        self.closes_at = Some(now + duration);

        tracing::info!(
            "Rip window {} opened for {} until {}",
            cycle_id,
            self.channel_id,
            now + duration
        );
        Ok(cycle_id)
    }

    pub fn enroll(&mut self, viewer_id: &str, now: DateTime<Utc>) -> Result<EnrollOutcome> {
        if !self.is_accepting(now) {
            return Err(WindowError::WindowClosed {
                channel_id: self.channel_id.clone(),
            });
        }

        if !self.enrolled.insert(viewer_id.to_string()) {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        self.participants.push(viewer_id.to_string());
        tracing::debug!("Added {} to rip window for {}", viewer_id, self.channel_id);
        Ok(EnrollOutcome::Enrolled)
    }

    /// Freeze the window and hand back its participants in enrollment order.
    pub fn begin_resolve(&mut self) -> Result<Vec<String>> {
        if self.state != WindowState::Open {
            return Err(WindowError::NotOpen {
                channel_id: self.channel_id.clone(),
            });
        }

        self.state = WindowState::Resolving;
        self.enrolled.clear();
        Ok(std::mem::take(&mut self.participants))
    }

    pub fn finish_resolve(&mut self) {
        self.state = WindowState::Closed;
        tracing::info!("Rip window closed for {}", self.channel_id);
    }

    pub fn info(&self) -> WindowInfo {
        WindowInfo {
            channel_id: self.channel_id.clone(),
            state: self.state,
            cycle_id: self.cycle_id,
            participant_count: self.participants.len(),
            opened_at: self.opened_at,
            closes_at: self.closes_at,
        }
    }
}

/// Window snapshot for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowInfo {
    pub channel_id: String,
    pub state: WindowState,
    pub cycle_id: Option<Uuid>,
    pub participant_count: usize,
    pub opened_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
}

impl WindowInfo {
    /// Chat call to action for an open window
    pub fn announcement(&self) -> Option<String> {
        if self.state != WindowState::Open {
            return None;
        }

        let secs = (self.closes_at? - self.opened_at?).num_seconds();
        Some(format!(
            "Time to open a pack! Type !rip in chat within the next {} seconds!",
            secs
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEVENTY_SECONDS: Duration = Duration::from_secs(70);

    fn open_window(now: DateTime<Utc>) -> ParticipationWindow {
        let mut window = ParticipationWindow::new("chan");
        window.open(SEVENTY_SECONDS, now).unwrap();
        window
    }

    #[test]
    fn test_new_window_rejects_entries() {
        let mut window = ParticipationWindow::new("chan");
        assert_eq!(window.state(), WindowState::Closed);
        assert!(matches!(
            window.enroll("alice", Utc::now()),
            Err(WindowError::WindowClosed { .. })
        ));
    }

    #[test]
    fn test_enroll_is_idempotent() {
        let now = Utc::now();
        let mut window = open_window(now);

        assert_eq!(window.enroll("alice", now).unwrap(), EnrollOutcome::Enrolled);
        assert_eq!(window.enroll("alice", now).unwrap(), EnrollOutcome::AlreadyEnrolled);
        assert_eq!(window.enroll("bob", now).unwrap(), EnrollOutcome::Enrolled);
        assert_eq!(window.participants(), &["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn test_enroll_after_deadline_rejected() {
        let now = Utc::now();
        let mut window = open_window(now);
        let deadline = window.closes_at().unwrap();

        assert!(window.enroll("alice", deadline - chrono::Duration::seconds(1)).is_ok());
        assert!(matches!(
            window.enroll("bob", deadline),
            Err(WindowError::WindowClosed { .. })
        ));
        assert_eq!(window.participant_count(), 1);
    }

    #[test]
    fn test_reopen_discards_previous_entries() {
        let now = Utc::now();
        let mut window = open_window(now);
        let first_cycle = window.cycle_id().unwrap();
        window.enroll("alice", now).unwrap();

        let second_cycle = window.open(SEVENTY_SECONDS, now).unwrap();
        assert_ne!(first_cycle, second_cycle);
        assert_eq!(window.participant_count(), 0);
        assert_eq!(window.enroll("alice", now).unwrap(), EnrollOutcome::Enrolled);
    }

    #[test]
    fn test_resolve_lifecycle() {
        let now = Utc::now();
        let mut window = open_window(now);
        window.enroll("alice", now).unwrap();
        window.enroll("bob", now).unwrap();

        let participants = window.begin_resolve().unwrap();
        assert_eq!(participants, vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(window.state(), WindowState::Resolving);
        assert_eq!(window.participant_count(), 0);

        // Frozen while resolving
        assert!(matches!(
            window.enroll("carol", now),
            Err(WindowError::WindowClosed { .. })
        ));
        assert!(matches!(
            window.open(SEVENTY_SECONDS, now),
            Err(WindowError::ResolveInProgress { .. })
        ));
        assert!(matches!(window.begin_resolve(), Err(WindowError::NotOpen { .. })));

        window.finish_resolve();
        assert_eq!(window.state(), WindowState::Closed);
        assert!(window.enroll("alice", now).is_err());
    }

    #[test]
    fn test_info_snapshot() {
        let now = Utc::now();
        let mut window = open_window(now);
        window.enroll("alice", now).unwrap();

        let info = window.info();
        assert_eq!(info.channel_id, "chan");
        assert_eq!(info.state, WindowState::Open);
        assert_eq!(info.participant_count, 1);
        assert_eq!(info.opened_at, Some(now));
        assert_eq!(info.closes_at, Some(now + chrono::Duration::seconds(70)));
    }

    #[test]
    fn test_announcement_only_while_open() {
        let now = Utc::now();
        let mut window = open_window(now);
        assert_eq!(
            window.info().announcement().as_deref(),
            Some("Time to open a pack! Type !rip in chat within the next 70 seconds!")
        );

        window.begin_resolve().unwrap();
        assert_eq!(window.info().announcement(), None);
        window.finish_resolve();
        assert_eq!(window.info().announcement(), None);
        assert_eq!(ParticipationWindow::new("chan").info().announcement(), None);
    }
}
