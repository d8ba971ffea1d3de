//! Sliding-window rate limiter backed by abuse event rows.
//!
//! Each limited action counts prior events of the same kind for one scope
//! over the last hour, day and week. The count-then-insert sequence is not
//! atomic; concurrent requests from one scope may overshoot a threshold by
//! the number of requests in flight.

use chrono::{Duration, Utc};
use askanai_common::{AppError, AppResult, IdGenerator, RateLimitWindow};
use askanai_db::{entities::abuse_event, repositories::AbuseEventRepository};
use tracing::{debug, warn};

use super::access::Caller;

/// Per-window thresholds. An action is refused once a window already holds
/// this many events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub per_hour: u64,
    pub per_day: u64,
    pub per_week: u64,
}

impl Limits {
    const fn new(per_hour: u64, per_day: u64, per_week: u64) -> Self {
        Self {
            per_hour,
            per_day,
            per_week,
        }
    }

    /// Threshold for one window.
    #[must_use]
    pub const fn for_window(self, window: RateLimitWindow) -> u64 {
        match window {
            RateLimitWindow::Hourly => self.per_hour,
            RateLimitWindow::Daily => self.per_day,
            RateLimitWindow::Weekly => self.per_week,
        }
    }
}

/// Kinds of recorded events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AuthRegister,
    AuthSignin,
    PollCreate,
    PollImageUpload,
    PollRespond,
    CommentCreate,
    TicketCreate,
    PollView,
    /// Audit trail: a poll was created.
    PollCreateOk,
    /// Audit trail: an upload URL was signed.
    PollImageUploadSigned,
    /// Audit trail: a poll was archived.
    PollArchive,
}

impl EventKind {
    /// Value stored in `abuse_events.event_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthRegister => "auth_register",
            Self::AuthSignin => "auth_signin",
            Self::PollCreate => "poll_create",
            Self::PollImageUpload => "poll_image_upload",
            Self::PollRespond => "poll_respond",
            Self::CommentCreate => "comment_create",
            Self::TicketCreate => "ticket_create",
            Self::PollView => "poll_view",
            Self::PollCreateOk => "poll_create_ok",
            Self::PollImageUploadSigned => "poll_image_upload_signed",
            Self::PollArchive => "poll_archive",
        }
    }

    /// Thresholds for limited kinds; `None` for audit-only kinds.
    #[must_use]
    pub const fn limits(self) -> Option<Limits> {
        match self {
            Self::AuthRegister => Some(Limits::new(20, 80, 200)),
            Self::AuthSignin => Some(Limits::new(30, 150, 500)),
            Self::PollCreate => Some(Limits::new(20, 100, 300)),
            Self::PollImageUpload => Some(Limits::new(40, 200, 600)),
            Self::PollRespond => Some(Limits::new(120, 400, 1200)),
            Self::CommentCreate => Some(Limits::new(40, 200, 600)),
            Self::TicketCreate => Some(Limits::new(10, 30, 80)),
            Self::PollView => Some(Limits::new(600, 5000, 20000)),
            Self::PollCreateOk | Self::PollImageUploadSigned | Self::PollArchive => None,
        }
    }
}

/// Identity an event is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    User(&'a str),
    Ip(&'a str),
    /// Neither user nor IP known; all such callers share one bucket.
    Anonymous,
}

impl<'a> Scope<'a> {
    /// User scope wins over IP scope; the two never combine.
    #[must_use]
    pub const fn resolve(user_id: Option<&'a str>, ip_hash: Option<&'a str>) -> Self {
        match (user_id, ip_hash) {
            (Some(user_id), _) => Self::User(user_id),
            (None, Some(ip_hash)) => Self::Ip(ip_hash),
            (None, None) => Self::Anonymous,
        }
    }

    /// Scope of a request.
    #[must_use]
    pub fn of(caller: &'a Caller) -> Self {
        Self::resolve(caller.user_id(), Some(caller.ip_hash.as_str()))
    }

    /// Scope of a request that must be limited per client regardless of sign-in.
    #[must_use]
    pub fn ip_only(caller: &'a Caller) -> Self {
        Self::Ip(caller.ip_hash.as_str())
    }

    const fn columns(self) -> (Option<&'a str>, Option<&'a str>) {
        match self {
            Self::User(user_id) => (Some(user_id), None),
            Self::Ip(ip_hash) => (None, Some(ip_hash)),
            Self::Anonymous => (None, None),
        }
    }
}

/// Rate limiter service.
#[derive(Clone)]
pub struct RateLimiter {
    events: AbuseEventRepository,
    id_gen: IdGenerator,
}

impl RateLimiter {
    /// Create a new rate limiter.
    #[must_use]
    pub const fn new(events: AbuseEventRepository) -> Self {
        Self {
            events,
            id_gen: IdGenerator::new(),
        }
    }

    /// Refuse the action if any window is full, otherwise record it.
    ///
    /// Windows are checked hourly, daily, then weekly and the first full one
    /// is reported. Audit-only kinds pass without being recorded.
    pub async fn enforce(&self, kind: EventKind, scope: Scope<'_>) -> AppResult<()> {
        let Some(limits) = kind.limits() else {
            return Ok(());
        };
        let (user_id, ip_hash) = scope.columns();
        let now = Utc::now();

        for window in RateLimitWindow::ALL {
            let since = (now - Duration::hours(window.hours())).fixed_offset();
            let count = self
                .events
                .count_since(kind.as_str(), user_id, ip_hash, since)
                .await?;
            if count >= limits.for_window(window) {
                warn!(
                    event_type = kind.as_str(),
                    scope = ?scope,
                    window = window.error_code(),
                    count,
                    "Rate limit exceeded"
                );
                return Err(AppError::RateLimited(window));
            }
        }

        self.record(kind, scope).await
    }

    /// Record an event without checking thresholds.
    pub async fn record(&self, kind: EventKind, scope: Scope<'_>) -> AppResult<()> {
        let (user_id, ip_hash) = scope.columns();
        debug!(event_type = kind.as_str(), scope = ?scope, "Recording event");

        self.events
            .create(abuse_event::Model {
                id: self.id_gen.generate(),
                event_type: kind.as_str().to_string(),
                user_id: user_id.map(str::to_string),
                ip_hash: ip_hash.map(str::to_string),
                created_at: Utc::now().fixed_offset(),
            })
            .await
    }
}
