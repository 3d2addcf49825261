// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Consecutive-failure lockout for one-time code checks.
//!
//! The limiter is in-process and per user. It is consulted only after the
//! caller has passed the visibility, receiver and pending-status checks,
//! so a locked-out user still sees those errors first.
//!
//! Every check is reserved before the code is evaluated and counted as a
//! failure until it is settled, so parallel requests share one budget.

use custody_domain::UserId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use time::{Duration, OffsetDateTime};
use tracing::warn;

/// Lockout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpAttemptPolicy {
    /// Failures tolerated inside one window before locking.
    pub max_failures: u32,
    /// Length of the counting window and of the lockout.
    pub lockout: Duration,
}

impl Default for OtpAttemptPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            lockout: Duration::seconds(300),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AttemptState {
    failures: u32,
    window_start: OffsetDateTime,
    locked_until: Option<OffsetDateTime>,
}

/// Tracks failed one-time code checks per user.
#[derive(Debug, Default)]
pub struct OtpAttemptLimiter {
    policy: OtpAttemptPolicy,
    attempts: Mutex<HashMap<UserId, AttemptState>>,
}

impl OtpAttemptLimiter {
    /// Creates a limiter with the given policy.
    #[must_use]
    pub fn new(policy: OtpAttemptPolicy) -> Self {
        Self {
            policy,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the policy in force.
    #[must_use]
    pub const fn policy(&self) -> OtpAttemptPolicy {
        self.policy
    }

    /// Returns when the user's lockout ends, or `None` if they may try.
    #[must_use]
    pub fn locked_until(&self, user: UserId, now: OffsetDateTime) -> Option<OffsetDateTime> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .and_then(|state| state.locked_until)
            .filter(|until| *until > now)
    }

    /// Reserves one code check for the user.
    ///
    /// The lockout test and the reservation happen under one lock, and the
    /// attempt counts as a failure from this moment on. Concurrent callers
    /// therefore cannot evaluate more than `max_failures` codes per window.
    ///
    /// # Errors
    ///
    /// Returns the end of the lockout if the user is locked out.
    pub fn begin_attempt(
        &self,
        user: UserId,
        now: OffsetDateTime,
    ) -> Result<OtpAttempt<'_>, OffsetDateTime> {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);

        let state: &mut AttemptState = attempts.entry(user).or_insert(AttemptState {
            failures: 0,
            window_start: now,
            locked_until: None,
        });

        if let Some(until) = state.locked_until.filter(|until| *until > now) {
            return Err(until);
        }
        if state.locked_until.is_some() || now - state.window_start >= self.policy.lockout {
            *state = AttemptState {
                failures: 0,
                window_start: now,
                locked_until: None,
            };
        }

        state.failures += 1;
        if state.failures >= self.policy.max_failures {
            state.locked_until = Some(now + self.policy.lockout);
        }

        Ok(OtpAttempt {
            limiter: self,
            user,
            window_start: state.window_start,
            settled: false,
        })
    }

    fn clear(&self, user: UserId) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user);
    }

    fn lockout_engaged(&self, user: UserId) -> Option<OffsetDateTime> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .and_then(|state| state.locked_until)
    }

    /// Gives back a reservation whose code was never evaluated.
    fn release(&self, user: UserId, window_start: OffsetDateTime) {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(state) = attempts.get_mut(&user) else {
            return;
        };
        if state.window_start != window_start {
            return;
        }
        state.failures = state.failures.saturating_sub(1);
        if state.failures < self.policy.max_failures {
            state.locked_until = None;
        }
        if state.failures == 0 {
            attempts.remove(&user);
        }
    }
}

/// One reserved code check.
///
/// Settle it with [`OtpAttempt::passed`] or [`OtpAttempt::failed`]. An
/// attempt dropped unsettled is released, as if it never happened.
#[must_use = "an unsettled attempt is released on drop"]
pub struct OtpAttempt<'a> {
    limiter: &'a OtpAttemptLimiter,
    user: UserId,
    window_start: OffsetDateTime,
    settled: bool,
}

impl OtpAttempt<'_> {
    /// The code matched: clears the user's failures.
    pub fn passed(mut self) {
        self.settled = true;
        self.limiter.clear(self.user);
    }

    /// The code did not match: the reserved failure stands.
    pub fn failed(mut self) {
        self.settled = true;
        if let Some(until) = self.limiter.lockout_engaged(self.user) {
            warn!(
                user_id = self.user.value(),
                locked_until = %until,
                "One-time code lockout engaged"
            );
        }
    }
}

impl Drop for OtpAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.limiter.release(self.user, self.window_start);
        }
    }
}
