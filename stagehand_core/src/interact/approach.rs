use crate::hotspot::{DoubleClickReaction, InteractionKind, SequenceSource};
use crate::providers::{Gait, Navigator};
use crate::types::Pos;

/// The interaction waiting at the end of a walk-then-interact sequence.
#[derive(Debug, Clone)]
pub struct PendingInteraction {
    pub hotspot: String,
    pub kind: InteractionKind,
    pub source: SequenceSource,
    pub target: Pos,
    pub face_after: bool,
    pub double_click: DoubleClickReaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproachPhase {
    Idle,
    Turning,
    Walking,
    Arriving,
    Cancelled,
}

#[derive(Debug)]
pub enum ApproachTick {
    Idle,
    InFlight,
    Arrived(PendingInteraction),
}

/// The walk-then-interact coroutine as an explicit resumable state machine,
/// advanced once per scheduler tick. Cancellation is a state transition: the
/// pending record is dropped and the next tick is a no-op.
#[derive(Default)]
pub struct ApproachSequence {
    phase: ApproachPhase,
    pending: Option<PendingInteraction>,
    started_frame: u64,
}

impl Default for ApproachPhase {
    fn default() -> Self {
        ApproachPhase::Idle
    }
}

impl ApproachSequence {
    pub fn phase(&self) -> ApproachPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.phase,
            ApproachPhase::Turning | ApproachPhase::Walking | ApproachPhase::Arriving
        )
    }

    pub fn is_active_for(&self, hotspot: &str) -> bool {
        self.is_active()
            && self
                .pending
                .as_ref()
                .map(|pending| pending.hotspot == hotspot)
                .unwrap_or(false)
    }

    pub fn started_frame(&self) -> u64 {
        self.started_frame
    }

    /// The caller issues the movement; this only arms the state machine.
    pub fn start(&mut self, pending: PendingInteraction, frame: u64) {
        self.pending = Some(pending);
        self.phase = ApproachPhase::Turning;
        self.started_frame = frame;
    }

    /// Aborts without side effects beyond halting movement. Returns a journal
    /// message when something was actually cancelled.
    pub fn cancel(&mut self, navigator: &mut dyn Navigator) -> Option<String> {
        if !self.is_active() {
            return None;
        }
        navigator.stop();
        let pending = self.pending.take();
        self.phase = ApproachPhase::Cancelled;
        pending.map(|pending| format!("approach.cancel {}", pending.hotspot))
    }

    /// Double-click pre-emption: completes the movement instantly and hands
    /// the pending interaction back so it can run this same tick.
    pub fn snap(&mut self, navigator: &mut dyn Navigator) -> Option<PendingInteraction> {
        if !self.is_active() {
            return None;
        }
        let pending = self.pending.take()?;
        navigator.teleport(pending.target);
        self.phase = ApproachPhase::Idle;
        Some(pending)
    }

    /// Double-click gait elevation: the walk continues at a run.
    pub fn elevate(&mut self, navigator: &mut dyn Navigator) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(pending) = self.pending.as_ref() else {
            return false;
        };
        navigator.move_along(vec![pending.target], Gait::Run);
        true
    }

    pub fn tick(&mut self, navigator: &mut dyn Navigator) -> ApproachTick {
        match self.phase {
            ApproachPhase::Idle => ApproachTick::Idle,
            ApproachPhase::Cancelled => {
                self.phase = ApproachPhase::Idle;
                ApproachTick::Idle
            }
            ApproachPhase::Turning => {
                self.phase = ApproachPhase::Walking;
                ApproachTick::InFlight
            }
            ApproachPhase::Walking => {
                if navigator.is_moving() {
                    ApproachTick::InFlight
                } else {
                    self.phase = ApproachPhase::Arriving;
                    ApproachTick::InFlight
                }
            }
            ApproachPhase::Arriving => {
                self.phase = ApproachPhase::Idle;
                match self.pending.take() {
                    Some(pending) => ApproachTick::Arrived(pending),
                    None => {
                        log::warn!("approach arrived with no pending interaction");
                        ApproachTick::Idle
                    }
                }
            }
        }
    }
}
