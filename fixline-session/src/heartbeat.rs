/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Heartbeat and TestRequest timing.
//!
//! The timer ticks every half interval. Each tick evaluates, in order:
//! - outbound silence above the interval: send a Heartbeat
//! - inbound silence above 1.5 intervals: send a TestRequest
//! - inbound silence above 2 intervals: the counterparty is presumed dead
//!
//! The timer is a plain value owned by the session; it never runs on its
//! own. The connection driver sleeps until [`HeartbeatTimer::deadline`] and
//! then asks the session to tick.

use std::time::Duration;
use tokio::time::Instant;

/// Half-interval tick schedule for a logged-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatTimer {
    /// Negotiated heartbeat interval.
    interval: Duration,
    /// Time between ticks.
    period: Duration,
    /// When the next tick is due.
    next_tick: Instant,
}

impl HeartbeatTimer {
    /// Starts a timer whose first tick is half an interval after `now`.
    ///
    /// Returns `None` for a zero interval, which disables heartbeating, and
    /// for an interval whose first tick is not representable.
    #[must_use]
    pub fn start(interval: Duration, now: Instant) -> Option<Self> {
        if interval.is_zero() {
            return None;
        }
        let period = interval / 2;
        Some(Self {
            interval,
            period,
            next_tick: now.checked_add(period)?,
        })
    }

    /// Returns the negotiated interval.
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the tick period.
    #[inline]
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Returns when the next tick is due.
    #[inline]
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.next_tick
    }

    /// Schedules the tick after the current one.
    ///
    /// A driver that fell behind skips the missed ticks instead of firing
    /// them back to back.
    pub fn advance(&mut self, now: Instant) {
        let next = self
            .next_tick
            .checked_add(self.period)
            .filter(|next| *next > now)
            .or_else(|| now.checked_add(self.period));
        if let Some(next) = next {
            self.next_tick = next;
        }
    }

    /// Evaluates the three liveness checks for the given silences.
    #[must_use]
    pub fn check(
        &self,
        since_outgoing: Duration,
        since_incoming: Duration,
        send_heartbeats: bool,
        expect_heartbeats: bool,
    ) -> HeartbeatCheck {
        let interval = self.interval;
        HeartbeatCheck {
            send_heartbeat: send_heartbeats && since_outgoing > interval,
            send_test_request: expect_heartbeats
                && since_incoming > interval.saturating_add(interval / 2),
            timed_out: expect_heartbeats && since_incoming > interval.saturating_mul(2),
        }
    }
}

/// Actions a heartbeat tick calls for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatCheck {
    /// We have been silent for more than one interval.
    pub send_heartbeat: bool,
    /// The counterparty has been silent for more than 1.5 intervals.
    pub send_test_request: bool,
    /// The counterparty has been silent for more than 2 intervals.
    pub timed_out: bool,
}
