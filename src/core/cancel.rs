//! Hierarchical, deadline-aware cancellation tokens.
//!
//! A token fires when its own deadline passes, when [`CancellationToken::cancel`]
//! is called on it, or when any ancestor fires. Cancellation is cooperative:
//! work observes it by calling [`CancellationToken::signal`] or by sleeping through
//! [`CancellationToken::sleep`], which wakes early through a `Condvar` instead of
//! polling.
//!
//! # Lock order
//!
//! A waiter holds its own state lock while reading ancestor state, so locks are
//! always taken descendant-first. `cancel` releases its own state lock before
//! waking descendants.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Where a cancellation signal came from, relative to the observing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOrigin {
    /// The token's own deadline passed or it was cancelled directly.
    Local,
    /// An ancestor token fired first.
    Inherited,
}

/// A fired cancellation, as seen from one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelSignal {
    /// Which level of the token chain fired first.
    pub origin: CancelOrigin,
    /// When it fired.
    pub at: Instant,
}

struct Inner {
    deadline: Option<Instant>,
    effective_deadline: Option<Instant>,
    parent: Option<Arc<Inner>>,
    cancelled_at: Mutex<Option<Instant>>,
    condvar: Condvar,
    children: Mutex<Vec<Weak<Inner>>>,
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl Inner {
    fn new(deadline: Option<Instant>, parent: Option<Arc<Self>>) -> Self {
        let inherited = parent.as_ref().and_then(|p| p.effective_deadline);
        Self {
            deadline,
            effective_deadline: earliest(deadline, inherited),
            parent,
            cancelled_at: Mutex::new(None),
            condvar: Condvar::new(),
            children: Mutex::new(Vec::new()),
        }
    }

    fn local_fired_at(&self, now: Instant, cancelled_at: Option<Instant>) -> Option<Instant> {
        earliest(cancelled_at, self.deadline.filter(|d| *d <= now))
    }

    /// Earliest firing anywhere on the chain from this node up.
    fn fired_at(&self, now: Instant) -> Option<Instant> {
        let cancelled_at = *self.cancelled_at.lock();
        let local = self.local_fired_at(now, cancelled_at);
        let inherited = self.parent.as_ref().and_then(|p| p.fired_at(now));
        earliest(local, inherited)
    }

    fn signal_with(&self, now: Instant, cancelled_at: Option<Instant>) -> Option<CancelSignal> {
        let local = self.local_fired_at(now, cancelled_at);
        let inherited = self.parent.as_ref().and_then(|p| p.fired_at(now));
        match (local, inherited) {
            (Some(l), Some(i)) if i < l => Some(CancelSignal {
                origin: CancelOrigin::Inherited,
                at: i,
            }),
            (Some(l), _) => Some(CancelSignal {
                origin: CancelOrigin::Local,
                at: l,
            }),
            (None, Some(i)) => Some(CancelSignal {
                origin: CancelOrigin::Inherited,
                at: i,
            }),
            (None, None) => None,
        }
    }

    fn wake(&self) {
        {
            let _guard = self.cancelled_at.lock();
            self.condvar.notify_all();
        }
        let children = self.children.lock();
        for child in children.iter().filter_map(Weak::upgrade) {
            child.wake();
        }
    }
}

/// Cooperative cancellation handle. Cloning shares the same token.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Root token with no deadline; fires only through [`cancel`](Self::cancel).
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(None, None)),
        }
    }

    /// Root token that fires once `timeout` has elapsed from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline_opt(Instant::now().checked_add(timeout))
    }

    /// Root token that fires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::with_deadline_opt(Some(deadline))
    }

    fn with_deadline_opt(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner::new(deadline, None)),
        }
    }

    /// Derived token without its own deadline.
    #[must_use]
    pub fn child(&self) -> Self {
        self.child_with_timeout(None)
    }

    /// Derived token that additionally fires after `timeout`, if given.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Option<Duration>) -> Self {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let inner = Arc::new(Inner::new(deadline, Some(Arc::clone(&self.inner))));
        {
            let mut children = self.inner.children.lock();
            children.retain(|w| w.strong_count() > 0);
            children.push(Arc::downgrade(&inner));
        }
        Self { inner }
    }

    /// Fire this token and every descendant. Idempotent.
    pub fn cancel(&self) {
        {
            let mut cancelled_at = self.inner.cancelled_at.lock();
            if cancelled_at.is_some() {
                return;
            }
            *cancelled_at = Some(Instant::now());
        }
        self.inner.wake();
    }

    /// The earliest firing visible from this token, if any.
    #[must_use]
    pub fn signal(&self) -> Option<CancelSignal> {
        let cancelled_at = *self.inner.cancelled_at.lock();
        self.inner.signal_with(Instant::now(), cancelled_at)
    }

    /// Whether this token or any ancestor has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal().is_some()
    }

    /// Earliest deadline on the chain.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.effective_deadline
    }

    /// Time left until the earliest deadline on the chain.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .effective_deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Block for `duration`, returning early if the token fires.
    ///
    /// # Errors
    ///
    /// Returns the [`CancelSignal`] that interrupted the sleep.
    pub fn sleep(&self, duration: Duration) -> Result<(), CancelSignal> {
        let until = Instant::now().checked_add(duration);
        let mut cancelled_at = self.inner.cancelled_at.lock();
        loop {
            let now = Instant::now();
            if let Some(signal) = self.inner.signal_with(now, *cancelled_at) {
                return Err(signal);
            }
            if until.is_some_and(|u| now >= u) {
                return Ok(());
            }
            match earliest(until, self.inner.effective_deadline) {
                Some(wake_at) => {
                    self.inner.condvar.wait_until(&mut cancelled_at, wake_at);
                }
                None => self.inner.condvar.wait(&mut cancelled_at),
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("deadline", &self.inner.effective_deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
