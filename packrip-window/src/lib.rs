//! Timed pack windows for packrip
//!
//! Viewers enter an open window with `!rip`; when it closes every participant
//! gets one weighted-rarity draw, the card lands in their collection and the
//! result is pushed to the channel's overlay.

pub mod broadcast;
pub mod entry;
pub mod error;
pub mod scheduler;
pub mod window;

pub use broadcast::{
    BroadcastClaims, HttpPushTransport, PushRequest, PushTransport, ResultBroadcaster,
    RipResultEnvelope, TokenSigner,
};
pub use entry::{parse_entry, Entry};
pub use error::{BroadcastError, Result, WindowError};
pub use scheduler::{
    FailureKind, ParticipantFailure, ResolutionReport, WindowSchedule, WindowScheduler,
};
pub use window::{EnrollOutcome, ParticipationWindow, WindowInfo, WindowState};
