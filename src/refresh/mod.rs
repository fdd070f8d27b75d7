//! Live snapshots of query results.
//!
//! A [`RefreshController`] owns one change subscription and re-runs its
//! fetch whenever a watched table changes. Results are published on a
//! `watch` channel as [`ViewState`]s.
//!
//! At most one fetch runs at a time. Changes that arrive while it runs mark
//! the view dirty, and exactly one more fetch follows once it completes.
//!
//! Every fetch carries the epoch it was issued in and a per-epoch ticket.
//! A result is applied only if its epoch is still current and its ticket is
//! newer than the last applied one, so a slow response can never overwrite
//! a fresher snapshot or leak into a re-keyed view.

pub mod views;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::error::AppResult;
use crate::realtime::{ChangeFilter, ChangeHub, Subscription, SubscriptionError};

type Fetcher<S, T> = Arc<dyn Fn(S) -> BoxFuture<'static, AppResult<T>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No subject, or nothing loaded yet after a failed fetch.
    Idle,
    Loading,
    Ready,
    TornDown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    pub phase: Phase,
    pub data: Option<T>,
    pub epoch: u64,
}

struct Shared<T> {
    state: watch::Sender<ViewState<T>>,
    epoch: AtomicU64,
}

impl<T> Shared<T> {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }
}

struct Run {
    listener: JoinHandle<()>,
    trigger: mpsc::UnboundedSender<()>,
}

struct Inner<S, T> {
    changes: ChangeHub,
    filters: Vec<ChangeFilter>,
    fetch: Fetcher<S, T>,
    shared: Arc<Shared<T>>,
    subject: Mutex<Option<S>>,
    run: Mutex<Option<Run>>,
    follower: Mutex<Option<JoinHandle<()>>>,
}

/// Keeps a snapshot of type `T` for a subject of type `S` up to date.
///
/// Cloning yields another handle to the same controller. Dropping the last
/// handle tears it down.
pub struct RefreshController<S, T> {
    inner: Arc<Inner<S, T>>,
}

impl<S, T> Clone for RefreshController<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, T> RefreshController<S, T>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<I, F, Fut>(changes: &ChangeHub, filters: I, fetch: F) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ChangeFilter>,
        F: Fn(S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let (state, _) = watch::channel(ViewState {
            phase: Phase::Idle,
            data: None,
            epoch: 0,
        });

        let fetch: Fetcher<S, T> =
            Arc::new(move |subject: S| -> BoxFuture<'static, AppResult<T>> {
                Box::pin(fetch(subject))
            });

        Self {
            inner: Arc::new(Inner {
                changes: changes.clone(),
                filters: filters.into_iter().map(Into::into).collect(),
                fetch,
                shared: Arc::new(Shared {
                    state,
                    epoch: AtomicU64::new(0),
                }),
                subject: Mutex::new(None),
                run: Mutex::new(None),
                follower: Mutex::new(None),
            }),
        }
    }

    /// Start watching `subject`, replacing any previous one.
    ///
    /// `None` leaves the view idle without fetching. Must be called from
    /// within a Tokio runtime.
    pub fn initialize(&self, subject: Option<S>) {
        self.inner.initialize(subject);
    }

    /// Re-run the fetch for the current subject.
    pub fn refresh(&self) {
        if let Some(run) = lock(&self.inner.run).as_ref() {
            // A closed channel means the listener is already gone
            let _ = run.trigger.send(());
        }
    }

    /// Stop listening for good. In-flight fetches are aborted.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    pub fn state(&self) -> ViewState<T> {
        self.inner.shared.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ViewState<T>> {
        self.inner.shared.state.subscribe()
    }

    /// Track a changing subject, re-keying whenever its value changes.
    pub fn follow(&self, mut subjects: watch::Receiver<Option<S>>)
    where
        S: PartialEq,
    {
        let current = subjects.borrow_and_update().clone();
        self.inner.initialize(current);

        let weak: Weak<Inner<S, T>> = Arc::downgrade(&self.inner);
        let follower = tokio::spawn(async move {
            while subjects.changed().await.is_ok() {
                let subject = subjects.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else { break };
                let unchanged = *lock(&inner.subject) == subject;
                if !unchanged {
                    tracing::debug!("subject changed, re-keying view");
                    inner.initialize(subject);
                }
            }
        });

        if let Some(previous) = lock(&self.inner.follower).replace(follower) {
            previous.abort();
        }
    }
}

impl<S, T> Inner<S, T>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn initialize(&self, subject: Option<S>) {
        let mut run = lock(&self.run);
        if self.shared.state.borrow().phase == Phase::TornDown {
            tracing::debug!("initialize ignored after teardown");
            return;
        }
        if let Some(previous) = run.take() {
            previous.listener.abort();
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.subject) = subject.clone();

        let Some(subject) = subject else {
            self.shared.state.send_replace(ViewState {
                phase: Phase::Idle,
                data: None,
                epoch,
            });
            return;
        };

        // Subscribe before the first fetch so no change slips in between
        let subscription = self.changes.subscribe(self.filters.iter().copied());
        self.shared.state.send_replace(ViewState {
            phase: Phase::Loading,
            data: None,
            epoch,
        });

        let (trigger, triggers) = mpsc::unbounded_channel();
        let listener = tokio::spawn(listen(
            self.shared.clone(),
            self.fetch.clone(),
            subject,
            epoch,
            subscription,
            triggers,
        ));
        *run = Some(Run { listener, trigger });
    }

    fn teardown(&self) {
        let mut run = lock(&self.run);
        if let Some(previous) = run.take() {
            previous.listener.abort();
        }
        if let Some(follower) = lock(&self.follower).take() {
            follower.abort();
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state.send_modify(|state| {
            state.phase = Phase::TornDown;
            state.epoch = epoch;
        });
    }
}

impl<S, T> Drop for Inner<S, T> {
    fn drop(&mut self) {
        let run = self.run.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = run.take() {
            run.listener.abort();
        }
        let follower = self
            .follower
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(follower) = follower.take() {
            follower.abort();
        }
    }
}

async fn listen<S, T>(
    shared: Arc<Shared<T>>,
    fetch: Fetcher<S, T>,
    subject: S,
    epoch: u64,
    mut subscription: Subscription,
    mut triggers: mpsc::UnboundedReceiver<()>,
) where
    S: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    let mut fetches = JoinSet::new();
    let mut issued = 0u64;
    let mut applied = 0u64;
    let mut dirty = false;
    let mut hub_open = true;

    let mut issue = |fetches: &mut JoinSet<(u64, AppResult<T>)>| {
        issued += 1;
        let ticket = issued;
        let pending = fetch(subject.clone());
        fetches.spawn(async move { (ticket, pending.await) });
        shared.state.send_if_modified(|state| {
            if !shared.is_current(epoch) || state.phase == Phase::Loading {
                return false;
            }
            state.phase = Phase::Loading;
            true
        });
    };

    issue(&mut fetches);

    loop {
        let wanted = tokio::select! {
            event = subscription.recv(), if hub_open => match event {
                Ok(event) => {
                    tracing::debug!(table = %event.table, kind = ?event.kind, "change received");
                    true
                }
                Err(SubscriptionError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "change subscription lagged");
                    true
                }
                Err(SubscriptionError::Closed) => {
                    tracing::debug!("change hub closed");
                    hub_open = false;
                    false
                }
            },
            trigger = triggers.recv() => match trigger {
                Some(()) => true,
                None => break,
            },
            Some(joined) = fetches.join_next() => {
                if dirty {
                    dirty = false;
                    tracing::debug!("changes arrived during fetch, refetching");
                    issue(&mut fetches);
                }
                let in_flight = !fetches.is_empty();
                let outcome = match joined {
                    Ok((ticket, result)) => Some((ticket, result)),
                    Err(err) => {
                        tracing::warn!(error = %err, "refresh fetch did not complete");
                        None
                    }
                };
                apply(&shared, epoch, &mut applied, outcome, in_flight);
                false
            }
        };

        if wanted {
            if fetches.is_empty() {
                issue(&mut fetches);
            } else {
                dirty = true;
            }
        }
    }
}

fn apply<T>(
    shared: &Shared<T>,
    epoch: u64,
    applied: &mut u64,
    outcome: Option<(u64, AppResult<T>)>,
    in_flight: bool,
) {
    shared.state.send_if_modified(|state| {
        if !shared.is_current(epoch) || state.phase == Phase::TornDown {
            return false;
        }

        match outcome {
            Some((ticket, Ok(data))) if ticket > *applied => {
                *applied = ticket;
                state.data = Some(data);
            }
            Some((ticket, Ok(_))) => {
                tracing::debug!(ticket, applied = *applied, "discarding stale snapshot");
            }
            Some((ticket, Err(err))) => {
                tracing::warn!(ticket, error = %err, "refresh failed, keeping previous snapshot");
            }
            None => {}
        }

        state.phase = if in_flight {
            Phase::Loading
        } else if state.data.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        };
        true
    });
}

fn lock<M>(mutex: &Mutex<M>) -> MutexGuard<'_, M> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
