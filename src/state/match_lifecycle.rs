//! Match lifecycle state machine and the registry holding every known match.
//!
//! Statuses only move forward (`scheduled -> live -> finished`, or `scheduled -> postponed`).
//! The registry is fed exclusively by fixture refreshes and notifies subscribed
//! [`TransitionObserver`]s after each applied step.

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use tokio::{sync::RwLock, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    state::{
        fixture::{Match, MatchId, MatchStatus, Score},
        league::{League, Season},
    },
};

/// Guarded writes running longer than this are reported as stalled.
pub const DEFAULT_STALL_WARNING: Duration = Duration::from_secs(5);

/// Events that move a match through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// The match kicked off; predictions lock.
    Kickoff,
    /// Final whistle with the full-time score.
    FullTime(Score),
    /// The fixture will not be played under this id.
    Postpone,
}

/// Reasons a reported match update is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The reported status cannot be reached from the recorded one.
    #[error("cannot move match from {from} to {to}")]
    Invalid { from: MatchStatus, to: MatchStatus },
    /// A finished match was reported without its final score.
    #[error("finished match reported without a final score")]
    MissingScore,
    /// The final score of a finished match changed after the fact.
    #[error("final score already recorded as {recorded:?}, provider reported {reported:?}")]
    ScoreChanged { recorded: Score, reported: Score },
}

/// One applied status step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub match_id: MatchId,
    pub league: League,
    pub season: Season,
    pub from: MatchStatus,
    pub to: MatchStatus,
}

/// Result of merging a reported match into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First time this fixture id was seen.
    Inserted,
    /// Nothing changed.
    Unchanged,
    /// Display metadata changed, status did not.
    Refreshed,
    /// One or more transitions were applied, in order.
    Advanced(Vec<Transition>),
    /// The update was refused and the recorded match left as is.
    Rejected(TransitionError),
}

/// Subscriber notified after transitions are applied.
pub trait TransitionObserver: Send + Sync {
    /// Whether this observer wants to hear about `from -> to`.
    fn interested(&self, from: MatchStatus, to: MatchStatus) -> bool;
    /// Called once per applied transition the observer is interested in.
    fn on_transition(&self, transition: &Transition);
}

/// Compute the status reached by applying `event` from `status`.
pub fn next_status(status: MatchStatus, event: MatchEvent) -> Result<MatchStatus, TransitionError> {
    let next = match (status, event) {
        (MatchStatus::Scheduled, MatchEvent::Kickoff) => MatchStatus::Live,
        (MatchStatus::Scheduled, MatchEvent::Postpone) => MatchStatus::Postponed,
        (MatchStatus::Live, MatchEvent::FullTime(_)) => MatchStatus::Finished,
        (from, event) => {
            return Err(TransitionError::Invalid {
                from,
                to: target_of(event),
            });
        }
    };
    Ok(next)
}

fn target_of(event: MatchEvent) -> MatchStatus {
    match event {
        MatchEvent::Kickoff => MatchStatus::Live,
        MatchEvent::FullTime(_) => MatchStatus::Finished,
        MatchEvent::Postpone => MatchStatus::Postponed,
    }
}

/// Events needed to move a match recorded as `current` to the reported state.
///
/// Skipped intermediate steps are filled in (a match first seen as finished after being
/// scheduled goes through `Kickoff` then `FullTime`) so observers always see the lock.
pub fn events_between(
    current: &Match,
    reported_status: MatchStatus,
    reported_score: Option<Score>,
) -> Result<Vec<MatchEvent>, TransitionError> {
    let full_time = || reported_score.map(MatchEvent::FullTime).ok_or(TransitionError::MissingScore);

    let events = match (current.status, reported_status) {
        (from, to) if from == to => {
            if let (MatchStatus::Finished, Some(recorded)) = (from, current.score) {
                let reported = reported_score.ok_or(TransitionError::MissingScore)?;
                if reported != recorded {
                    return Err(TransitionError::ScoreChanged { recorded, reported });
                }
            }
            Vec::new()
        }
        (MatchStatus::Scheduled, MatchStatus::Live) => vec![MatchEvent::Kickoff],
        (MatchStatus::Scheduled, MatchStatus::Finished) => vec![MatchEvent::Kickoff, full_time()?],
        (MatchStatus::Live, MatchStatus::Finished) => vec![full_time()?],
        (MatchStatus::Scheduled, MatchStatus::Postponed) => vec![MatchEvent::Postpone],
        (from, to) => return Err(TransitionError::Invalid { from, to }),
    };
    Ok(events)
}

/// Registry of every match known to the process, one guarded slot per fixture id.
pub struct MatchLifecycle {
    slots: DashMap<MatchId, Arc<RwLock<Match>>>,
    observers: Vec<Arc<dyn TransitionObserver>>,
    stall_warning: Duration,
}

impl MatchLifecycle {
    pub fn new(observers: Vec<Arc<dyn TransitionObserver>>) -> Self {
        Self {
            slots: DashMap::new(),
            observers,
            stall_warning: DEFAULT_STALL_WARNING,
        }
    }

    /// Override the delay after which a guarded write is reported as stalled.
    pub fn with_stall_warning(mut self, after: Duration) -> Self {
        self.stall_warning = after;
        self
    }

    /// Current status of a match, if known.
    pub async fn current_status(&self, id: MatchId) -> Option<MatchStatus> {
        let slot = self.slot(id)?;
        let guard = slot.read().await;
        Some(guard.status)
    }

    /// Clone of the recorded match.
    pub async fn get(&self, id: MatchId) -> Option<Match> {
        let slot = self.slot(id)?;
        let guard = slot.read().await;
        Some(guard.clone())
    }

    /// Clones of the recorded matches among `ids`, skipping unknown ids.
    pub async fn get_many(&self, ids: impl IntoIterator<Item = MatchId>) -> Vec<Match> {
        let mut matches = Vec::new();
        for id in ids {
            if let Some(found) = self.get(id).await {
                matches.push(found);
            }
        }
        matches
    }

    /// Merge a reported match into the registry, applying any forward transitions.
    pub async fn upsert(&self, reported: Match) -> UpsertOutcome {
        let id = reported.id;
        let slot = match self.slot(id) {
            Some(slot) => slot,
            None => {
                if reported.status == MatchStatus::Finished && reported.score.is_none() {
                    return UpsertOutcome::Rejected(TransitionError::MissingScore);
                }
                let mut fresh = reported.clone();
                if fresh.status != MatchStatus::Finished {
                    fresh.score = None;
                }
                match self.slots.entry(id) {
                    Entry::Vacant(vacant) => {
                        vacant.insert(Arc::new(RwLock::new(fresh)));
                        debug!(match_id = id, status = %reported.status, "match registered");
                        return UpsertOutcome::Inserted;
                    }
                    Entry::Occupied(occupied) => occupied.get().clone(),
                }
            }
        };

        let transitions = {
            // Waits for in-flight guarded writes on this match before changing status.
            let mut recorded = slot.write().await;
            let events = match events_between(&recorded, reported.status, reported.score) {
                Ok(events) => events,
                Err(err) => return UpsertOutcome::Rejected(err),
            };

            let refreshed = recorded.refresh_metadata(&reported);
            if events.is_empty() {
                return if refreshed {
                    UpsertOutcome::Refreshed
                } else {
                    UpsertOutcome::Unchanged
                };
            }

            let mut transitions = Vec::with_capacity(events.len());
            for event in events {
                let from = recorded.status;
                let to = match next_status(from, event) {
                    Ok(to) => to,
                    Err(err) => return UpsertOutcome::Rejected(err),
                };
                recorded.status = to;
                if let MatchEvent::FullTime(score) = event {
                    recorded.score = Some(score);
                }
                transitions.push(Transition {
                    match_id: id,
                    league: recorded.league,
                    season: recorded.season,
                    from,
                    to,
                });
            }
            transitions
        };

        for transition in &transitions {
            info!(
                match_id = transition.match_id,
                from = %transition.from,
                to = %transition.to,
                "match transition applied"
            );
            self.notify(transition);
        }

        UpsertOutcome::Advanced(transitions)
    }

    /// Run `work` only while the match is `scheduled`, keeping the status frozen until it
    /// completes.
    ///
    /// The slot's read side is held across the status check and `work`, and transitions take
    /// the write side, so no write started here can land after the match locked. `work` is
    /// never cancelled: a slow write keeps the slot until it settles and its own outcome is
    /// returned. Store operations are bounded by the backend's timeouts.
    pub async fn write_if_scheduled<F, Fut, T>(&self, id: MatchId, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(Match) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let slot = self
            .slot(id)
            .ok_or_else(|| ServiceError::NotFound(format!("match `{id}` not found")))?;
        let guard = slot.read().await;
        if guard.status != MatchStatus::Scheduled {
            return Err(ServiceError::Locked {
                match_id: id,
                status: guard.status,
            });
        }

        let work = work(guard.clone());
        tokio::pin!(work);
        let outcome = match timeout(self.stall_warning, &mut work).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    match_id = id,
                    after_ms = self.stall_warning.as_millis() as u64,
                    "guarded write stalled; holding the match until it settles"
                );
                work.await
            }
        };
        drop(guard);
        outcome
    }

    fn slot(&self, id: MatchId) -> Option<Arc<RwLock<Match>>> {
        self.slots.get(&id).map(|entry| entry.value().clone())
    }

    fn notify(&self, transition: &Transition) {
        for observer in &self.observers {
            if observer.interested(transition.from, transition.to) {
                observer.on_transition(transition);
            }
        }
    }
}
