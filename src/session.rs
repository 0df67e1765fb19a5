use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pattern::{classify, Classification, Dot, Pattern};
use crate::store::{PatternStorage, RejectedSet, RejectedStore};

pub const DEFAULT_DISMISS_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a duplicate or invalid result stays on screen.
    pub dismiss_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dismiss_delay: DEFAULT_DISMISS_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Outcome {
    Valid,
    Invalid,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Drawing,
    AwaitingValidation,
    Resolved(Outcome),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub tested: usize,
    pub invalid: usize,
}

/// Answer from whoever asked the user before wiping history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Notifications for passive observers such as the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged { from: Phase, to: Phase },
    DotAdded { dot: Dot, len: usize },
    HistoryReset,
}

/// Pending return to `Idle` after a result has been shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct DismissTimer {
    deadline: Option<Instant>,
}

impl DismissTimer {
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// The test / judge / record loop around a single pointer.
///
/// All operations are synchronous and never fail; calls that make no sense in
/// the current phase return `false` and change nothing.
#[derive(Debug)]
pub struct Session<S: PatternStorage> {
    config: SessionConfig,
    store: RejectedStore<S>,
    stats: Stats,
    phase: Phase,
    pattern: Pattern,
    dismiss: DismissTimer,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl<S: PatternStorage> Session<S> {
    pub fn new(store: RejectedStore<S>, config: SessionConfig) -> Self {
        // Every stored pattern was tested once and found invalid.
        let stats = Stats {
            tested: store.len(),
            invalid: store.len(),
        };

        Self {
            config,
            store,
            stats,
            phase: Phase::Idle,
            pattern: Pattern::new(),
            dismiss: DismissTimer::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn open(storage: S, config: SessionConfig) -> Self {
        Self::new(RejectedStore::open(storage), config)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn rejected(&self) -> &RejectedSet {
        self.store.set()
    }

    pub fn remaining(&self) -> usize {
        self.store.remaining()
    }

    pub fn dismiss_pending(&self) -> bool {
        self.dismiss.is_pending()
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Starts a new drawing at `dot`. Allowed from any phase; a pending
    /// judgment or a displayed result is discarded.
    pub fn pointer_down(&mut self, dot: Option<Dot>) -> bool {
        let Some(dot) = dot else {
            return false;
        };

        self.dismiss.cancel();
        self.pattern = Pattern::starting_at(dot);
        self.transition(Phase::Drawing);
        self.emit(SessionEvent::DotAdded { dot, len: 1 });
        true
    }

    /// Extends the drawing when the pointer passes over a dot.
    pub fn pointer_move(&mut self, dot: Option<Dot>) -> bool {
        if self.phase != Phase::Drawing {
            return false;
        }
        let Some(dot) = dot else {
            return false;
        };

        let before = self.pattern.len();
        if !self.pattern.append_dot(dot) {
            return false;
        }

        let added: Vec<Dot> = self.pattern.dots()[before..].to_vec();
        for (offset, dot) in added.into_iter().enumerate() {
            self.emit(SessionEvent::DotAdded {
                dot,
                len: before + offset + 1,
            });
        }
        true
    }

    /// Finishes the drawing and classifies it against history.
    ///
    /// Returns `None` when no drawing was in progress.
    pub fn pointer_up(&mut self, now: Instant) -> Option<Classification> {
        if self.phase != Phase::Drawing {
            return None;
        }

        let classification = classify(&self.pattern, self.store.set());
        debug!(pattern = %self.pattern, %classification, "drawing released");

        match classification {
            Classification::TooShort => {
                self.pattern.clear();
                self.transition(Phase::Idle);
            }
            Classification::Duplicate => {
                self.dismiss.schedule(now, self.config.dismiss_delay);
                self.transition(Phase::Resolved(Outcome::Duplicate));
            }
            Classification::Pending => {
                self.transition(Phase::AwaitingValidation);
            }
        }

        Some(classification)
    }

    /// The user says the displayed pattern is not theirs.
    pub fn mark_invalid(&mut self, now: Instant) -> bool {
        if self.phase != Phase::AwaitingValidation {
            debug!(phase = ?self.phase, "ignoring invalid judgment");
            return false;
        }

        let key = self.pattern.key();
        info!(pattern = %key, "pattern marked invalid");
        self.store.insert(key);
        self.stats.tested += 1;
        self.stats.invalid += 1;

        self.dismiss.schedule(now, self.config.dismiss_delay);
        self.transition(Phase::Resolved(Outcome::Invalid));
        true
    }

    /// The user says the displayed pattern is the right one. The result
    /// stays up until dismissed.
    pub fn mark_valid(&mut self) -> bool {
        if self.phase != Phase::AwaitingValidation {
            debug!(phase = ?self.phase, "ignoring valid judgment");
            return false;
        }

        info!(pattern = %self.pattern, tested = self.stats.tested + 1, "pattern found");
        self.stats.tested += 1;
        self.transition(Phase::Resolved(Outcome::Valid));
        true
    }

    /// Background tap: clears whatever is displayed. Ignored mid-draw.
    pub fn dismiss(&mut self) -> bool {
        if self.phase == Phase::Drawing {
            return false;
        }
        if self.phase == Phase::Idle && self.pattern.is_empty() {
            return false;
        }

        self.dismiss.cancel();
        self.pattern.clear();
        self.transition(Phase::Idle);
        true
    }

    /// Fires the scheduled dismissal once its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.dismiss.is_due(now) {
            return false;
        }

        self.dismiss.cancel();
        self.pattern.clear();
        self.transition(Phase::Idle);
        true
    }

    /// Irreversibly forgets every rejected pattern and zeroes the counters.
    pub fn reset(&mut self, confirmation: Confirmation) -> bool {
        if confirmation == Confirmation::Declined {
            return false;
        }

        info!(rejected = self.store.len(), "clearing rejected pattern history");
        self.store.clear();
        self.stats = Stats::default();
        self.dismiss.cancel();
        self.pattern.clear();
        self.transition(Phase::Idle);
        self.emit(SessionEvent::HistoryReset);
        true
    }

    fn transition(&mut self, to: Phase) {
        let from = self.phase;
        if from == to {
            return;
        }
        debug!(?from, ?to, "session phase changed");
        self.phase = to;
        self.emit(SessionEvent::PhaseChanged { from, to });
    }

    fn emit(&mut self, event: SessionEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{PatternKey, TOTAL_PATTERNS};
    use crate::store::MemoryStorage;
    use assert_matches::assert_matches;

    fn dot(id: u8) -> Option<Dot> {
        Dot::new(id)
    }

    fn session() -> Session<MemoryStorage> {
        Session::open(MemoryStorage::new(), SessionConfig::default())
    }

    fn draw<S: PatternStorage>(session: &mut Session<S>, ids: &[u8], now: Instant) -> Option<Classification> {
        let (first, rest) = ids.split_first().unwrap();
        session.pointer_down(dot(*first));
        for &id in rest {
            session.pointer_move(dot(id));
        }
        session.pointer_up(now)
    }

    fn key(raw: &str) -> PatternKey {
        raw.parse().unwrap()
    }

    #[test]
    fn end_to_end_invalid_then_duplicate() {
        let mut session = session();
        let now = Instant::now();

        assert_eq!(draw(&mut session, &[0, 1, 2, 5, 8], now), Some(Classification::Pending));
        assert_eq!(session.phase(), Phase::AwaitingValidation);

        assert!(session.mark_invalid(now));
        assert!(session.rejected().contains(&key("0-1-2-5-8")));
        assert_eq!(session.stats(), Stats { tested: 1, invalid: 1 });
        assert_eq!(session.phase(), Phase::Resolved(Outcome::Invalid));

        assert_eq!(draw(&mut session, &[0, 1, 2, 5, 8], now), Some(Classification::Duplicate));
        assert_eq!(session.phase(), Phase::Resolved(Outcome::Duplicate));
        assert_eq!(session.stats(), Stats { tested: 1, invalid: 1 });
        assert_eq!(session.rejected().len(), 1);
    }

    #[test]
    fn skipped_dots_are_included_while_drawing() {
        let mut session = session();
        session.pointer_down(dot(0));
        session.pointer_move(dot(8));
        session.pointer_move(dot(2));
        let ids: Vec<u8> = session.pattern().dots().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec![0, 4, 8, 5, 2]);
    }

    #[test]
    fn short_drawing_returns_to_idle() {
        let mut session = session();
        assert_eq!(draw(&mut session, &[0, 1, 4], Instant::now()), Some(Classification::TooShort));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.pattern().is_empty());
        assert_eq!(session.stats(), Stats::default());
    }

    #[test]
    fn pointer_down_off_grid_does_nothing() {
        let mut session = session();
        assert!(!session.pointer_down(None));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn move_and_release_outside_drawing_are_ignored() {
        let mut session = session();
        assert!(!session.pointer_move(dot(3)));
        assert_eq!(session.pointer_up(Instant::now()), None);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn judgments_outside_awaiting_validation_are_ignored() {
        let mut session = session();
        let now = Instant::now();
        assert!(!session.mark_invalid(now));
        assert!(!session.mark_valid());

        session.pointer_down(dot(0));
        assert!(!session.mark_invalid(now));
        assert!(!session.mark_valid());
        assert_eq!(session.phase(), Phase::Drawing);
        assert_eq!(session.stats(), Stats::default());
    }

    #[test]
    fn mark_valid_counts_tested_only_and_stays() {
        let mut session = session();
        let now = Instant::now();
        draw(&mut session, &[6, 4, 2, 5], now);
        assert!(session.mark_valid());

        assert_eq!(session.phase(), Phase::Resolved(Outcome::Valid));
        assert_eq!(session.stats(), Stats { tested: 1, invalid: 0 });
        assert!(session.rejected().is_empty());
        assert!(!session.dismiss_pending());
        assert!(!session.tick(now + Duration::from_secs(60)));
        assert_eq!(session.phase(), Phase::Resolved(Outcome::Valid));
    }

    #[test]
    fn invalid_result_auto_dismisses_after_delay() {
        let mut session = session();
        let now = Instant::now();
        draw(&mut session, &[0, 3, 6, 7], now);
        session.mark_invalid(now);

        assert!(!session.tick(now + Duration::from_millis(1499)));
        assert_eq!(session.phase(), Phase::Resolved(Outcome::Invalid));
        assert!(session.tick(now + DEFAULT_DISMISS_DELAY));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.pattern().is_empty());
    }

    #[test]
    fn new_draw_cancels_pending_dismissal() {
        let mut session = session();
        let now = Instant::now();
        draw(&mut session, &[0, 3, 6, 7], now);
        session.mark_invalid(now);
        assert!(session.dismiss_pending());

        session.pointer_down(dot(2));
        assert!(!session.dismiss_pending());
        assert!(!session.tick(now + Duration::from_secs(5)));
        assert_eq!(session.phase(), Phase::Drawing);
        assert_eq!(session.pattern().len(), 1);
    }

    #[test]
    fn redraw_discards_pending_judgment() {
        let mut session = session();
        let now = Instant::now();
        draw(&mut session, &[0, 1, 2, 5], now);
        assert_eq!(session.phase(), Phase::AwaitingValidation);

        draw(&mut session, &[8, 7, 6, 3], now);
        assert_eq!(session.phase(), Phase::AwaitingValidation);
        session.mark_invalid(now);

        assert!(session.rejected().contains(&key("8-7-6-3")));
        assert!(!session.rejected().contains(&key("0-1-2-5")));
        assert_eq!(session.stats(), Stats { tested: 1, invalid: 1 });
    }

    #[test]
    fn dismiss_clears_display_but_not_mid_draw() {
        let mut session = session();
        let now = Instant::now();
        assert!(!session.dismiss());

        session.pointer_down(dot(0));
        session.pointer_move(dot(1));
        assert!(!session.dismiss());
        assert_eq!(session.phase(), Phase::Drawing);

        session.pointer_move(dot(2));
        session.pointer_move(dot(5));
        session.pointer_up(now);
        assert!(session.dismiss());
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.pattern().is_empty());
        assert_eq!(session.stats(), Stats::default());
    }

    #[test]
    fn stats_seeded_from_stored_history() {
        let storage = MemoryStorage::with_contents(r#"["0-1-2-5","3-4-5-8"]"#);
        let session = Session::open(storage, SessionConfig::default());
        assert_eq!(session.stats(), Stats { tested: 2, invalid: 2 });
        assert_eq!(session.remaining(), TOTAL_PATTERNS - 2);
    }

    #[test]
    fn invalid_never_exceeds_tested() {
        let mut session = session();
        let now = Instant::now();
        let attempts: [(&[u8], bool); 4] = [
            (&[0, 1, 2, 5], false),
            (&[0, 1, 2, 5], false),
            (&[2, 5, 8, 7], true),
            (&[6, 3, 0, 1], false),
        ];
        for (ids, valid) in attempts {
            draw(&mut session, ids, now);
            if valid {
                session.mark_valid();
            } else {
                session.mark_invalid(now);
            }
            let stats = session.stats();
            assert!(stats.invalid <= stats.tested);
        }
        assert_eq!(session.stats(), Stats { tested: 3, invalid: 2 });
    }

    #[test]
    fn reset_requires_confirmation() {
        let storage = MemoryStorage::with_contents(r#"["0-1-2-5"]"#);
        let mut session = Session::open(storage.clone(), SessionConfig::default());

        assert!(!session.reset(Confirmation::Declined));
        assert_eq!(session.rejected().len(), 1);

        assert!(session.reset(Confirmation::Confirmed));
        assert!(session.rejected().is_empty());
        assert_eq!(session.stats(), Stats::default());
        assert_eq!(session.remaining(), TOTAL_PATTERNS);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(storage.contents().as_deref(), Some("[]"));
    }

    #[test]
    fn invalid_judgment_is_persisted() {
        let storage = MemoryStorage::new();
        let mut session = Session::open(storage.clone(), SessionConfig::default());
        let now = Instant::now();
        draw(&mut session, &[4, 0, 1, 2], now);
        session.mark_invalid(now);

        let reopened = Session::open(storage, SessionConfig::default());
        assert!(reopened.rejected().contains(&key("4-0-1-2")));
        assert_eq!(reopened.stats(), Stats { tested: 1, invalid: 1 });
    }

    #[test]
    fn subscribers_see_transitions_and_dots() {
        let mut session = session();
        let rx = session.subscribe();
        let now = Instant::now();

        session.pointer_down(dot(0));
        session.pointer_move(dot(2));

        assert_matches!(
            rx.try_recv(),
            Ok(SessionEvent::PhaseChanged { from: Phase::Idle, to: Phase::Drawing })
        );
        let dots: Vec<SessionEvent> = rx.try_iter().collect();
        assert_eq!(
            dots,
            vec![
                SessionEvent::DotAdded { dot: Dot::new(0).unwrap(), len: 1 },
                SessionEvent::DotAdded { dot: Dot::new(1).unwrap(), len: 2 },
                SessionEvent::DotAdded { dot: Dot::new(2).unwrap(), len: 3 },
            ]
        );

        session.pointer_up(now);
        assert_matches!(
            rx.try_recv(),
            Ok(SessionEvent::PhaseChanged { to: Phase::Idle, .. })
        );

        session.reset(Confirmation::Confirmed);
        assert_matches!(rx.try_recv(), Ok(SessionEvent::HistoryReset));
    }

    #[test]
    fn dropped_subscriber_is_forgotten() {
        let mut session = session();
        drop(session.subscribe());
        session.pointer_down(dot(4));
        assert!(session.subscribers.is_empty());
    }
}
