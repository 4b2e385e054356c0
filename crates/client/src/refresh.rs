//! Single-flight token refresh coordination.
//!
//! At most one refresh is in flight per client. Requests that hit a 401 while
//! it runs are queued and receive its outcome in the order they arrived.
//!
//! The in-flight flag and the waiter queue share one mutex, so clearing the
//! flag and draining the queue happen atomically: a request either joins the
//! queue before the drain or sees no refresh in flight afterwards. The mutex
//! is never held across an `.await`.
//!
//! After a successful refresh the queue is released one request at a time:
//! each queued request holds a [`Turn`] and the next one is woken only after
//! that turn is dropped, once its retry has been handed to the transport.
//! Retries therefore reach the network in queue order regardless of how the
//! runtime schedules the woken tasks.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sahha_core::AccessToken;
use tokio::sync::oneshot;

use crate::error::RefreshError;
use crate::store::CredentialStore;

/// Result of a refresh cycle, shared with every waiter.
pub type RefreshOutcome = Result<AccessToken, RefreshError>;

/// Coordinates token refreshes for one client.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<Grant>>,
}

/// What a queued request receives when the refresh settles.
pub struct Grant {
    pub outcome: RefreshOutcome,
    pub turn: Turn,
}

/// A queued request's place in the retry order.
///
/// Dropping it releases the next queued request.
#[derive(Default)]
pub struct Turn(Option<oneshot::Sender<()>>);

/// What a request that received a 401 should do next.
pub enum Ticket<'a> {
    /// No refresh is running: perform it, then settle the guard.
    Leader(RefreshGuard<'a>),
    /// A refresh is running: wait for its outcome.
    Follower(oneshot::Receiver<Grant>),
    /// A refresh finished after this request was sent; retry with this token.
    AlreadyRefreshed(AccessToken),
}

impl RefreshCoordinator {
    /// Create an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the refresh or join the queue.
    ///
    /// `used` is the access token the failed request carried. If the store
    /// already holds a different token, another request refreshed it in the
    /// meantime and no new cycle is started.
    pub fn begin(&self, store: &dyn CredentialStore, used: Option<&AccessToken>) -> Ticket<'_> {
        let mut state = self.lock();

        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            return Ticket::Follower(rx);
        }

        if let Some(current) = store.access_token()
            && used.is_none_or(|used| !used.matches(&current))
        {
            return Ticket::AlreadyRefreshed(current);
        }

        state.in_flight = true;
        Ticket::Leader(RefreshGuard {
            coordinator: self,
            settled: false,
        })
    }

    /// Whether a refresh is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of requests waiting on the running refresh.
    pub fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Clear the flag and take the queue in one step.
    fn drain(&self) -> VecDeque<oneshot::Sender<Grant>> {
        let mut state = self.lock();
        state.in_flight = false;
        std::mem::take(&mut state.waiters)
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ownership of the in-flight refresh.
///
/// Releases the flag on every exit path: explicitly through [`settle`], or on
/// drop, in which case queued requests are rejected with
/// [`RefreshError::Abandoned`].
///
/// [`settle`]: RefreshGuard::settle
#[must_use = "dropping the guard abandons the refresh"]
pub struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Release the flag and publish the outcome to every queued request.
    ///
    /// On success this resolves once each queued request has released its
    /// [`Turn`]. Returns how many queued requests received the outcome.
    pub async fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        let release = Release {
            waiters: self.coordinator.drain(),
            outcome: outcome.clone(),
        };
        release.run().await
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            drop(Release {
                waiters: self.coordinator.drain(),
                outcome: Err(RefreshError::Abandoned),
            });
        }
    }
}

/// Queue drained from the coordinator, delivered in FIFO order.
///
/// Whatever is still queued when this is dropped gets the outcome at once.
struct Release {
    waiters: VecDeque<oneshot::Sender<Grant>>,
    outcome: RefreshOutcome,
}

impl Release {
    async fn run(mut self) -> usize {
        let mut released = 0;

        while let Some(waiter) = self.waiters.pop_front() {
            let (tx, done) = oneshot::channel();
            let grant = Grant {
                outcome: self.outcome.clone(),
                turn: Turn(Some(tx)),
            };
            // Receiver is gone if the waiter timed out or was dropped.
            if waiter.send(grant).is_err() {
                continue;
            }
            released += 1;

            if self.outcome.is_ok() {
                let _ = done.await;
            }
        }

        released
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(Grant {
                outcome: self.outcome.clone(),
                turn: Turn::default(),
            });
        }
    }
}
