//! Drag Session Controller.
//!
//! Turns pointer and keyboard gestures into stage transitions. A move is
//! shown on the board as soon as the card hovers a new column, then either
//! confirmed by the backing store or undone:
//!
//! ```text
//! Idle -> Pending -> Dragging -> drop -> Commit -> settle -> Committed
//!                                    |                   \-> RolledBack
//!                                    \-> Cancelled | Unchanged
//! ```

use crm_core::{AppConfig, CrmError, CrmResult};
use serde::Serialize;
use std::collections::HashMap;

use crate::board::BoardStore;
use crate::deal::{Deal, DealId};
use crate::notification::{NotificationCenter, NotificationId};
use crate::reconcile::StageCommitter;
use crate::stage::{StageId, StageOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// What the pointer is over when hovering or releasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Another card; resolves to that card's stage.
    Deal(DealId),
    Column(StageId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub deal_id: DealId,
    pub original_stage: StageId,
    pub tentative_stage: StageId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer is down but has not travelled far enough to count as a drag.
    Pending { deal_id: DealId, origin: Point },
    Dragging(DragSession),
}

/// A move that is on the board but not yet in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingCommit {
    pub deal_id: DealId,
    pub original_stage: StageId,
    pub target_stage: StageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropDecision {
    /// No drag was in progress.
    Ignored,
    Cancelled { deal_id: DealId },
    Unchanged { deal_id: DealId },
    Commit(PendingCommit),
}

#[derive(Debug)]
pub enum DragOutcome {
    Ignored,
    Cancelled {
        deal_id: DealId,
    },
    Unchanged {
        deal_id: DealId,
    },
    Committed(Deal),
    RolledBack {
        deal_id: DealId,
        restored_stage: StageId,
        notification: NotificationId,
        error: CrmError,
    },
}

#[derive(Debug)]
pub struct DragController {
    activation_distance: f64,
    state: DragState,
    reconciling: HashMap<DealId, PendingCommit>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(AppConfig::default().effective_activation_distance())
    }
}

impl DragController {
    pub fn new(activation_distance: f64) -> Self {
        Self {
            activation_distance,
            state: DragState::Idle,
            reconciling: HashMap::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.effective_activation_distance())
    }

    pub fn activation_distance(&self) -> f64 {
        self.activation_distance
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DragState::Idle)
    }

    pub fn is_reconciling(&self, deal_id: DealId) -> bool {
        self.reconciling.contains_key(&deal_id)
    }

    /// Deal to target stage for every commit still in flight, plus the
    /// hovered column of the card being dragged.
    pub fn optimistic_overlay(&self) -> HashMap<DealId, StageId> {
        let mut overlay: HashMap<DealId, StageId> = self
            .reconciling
            .iter()
            .map(|(id, pending)| (*id, pending.target_stage.clone()))
            .collect();
        if let DragState::Dragging(session) = &self.state {
            overlay.insert(session.deal_id, session.tentative_stage.clone());
        }
        overlay
    }

    fn ensure_available(&self, deal_id: DealId) -> CrmResult<()> {
        if !self.is_idle() {
            tracing::warn!(%deal_id, "Refusing drag: another gesture is active");
            return Err(CrmError::SessionBusy(
                "another gesture is already active".into(),
            ));
        }
        if self.is_reconciling(deal_id) {
            tracing::warn!(%deal_id, "Refusing drag: previous move still saving");
            return Err(CrmError::SessionBusy(format!(
                "deal {} is still being saved",
                deal_id
            )));
        }
        Ok(())
    }

    fn begin(&mut self, deal_id: DealId, board: &BoardStore) -> CrmResult<()> {
        let deal = board.deal(deal_id).ok_or(CrmError::DealNotFound(deal_id))?;
        tracing::debug!(%deal_id, stage = %deal.stage, "Drag started");
        self.state = DragState::Dragging(DragSession {
            deal_id,
            original_stage: deal.stage.clone(),
            tentative_stage: deal.stage.clone(),
        });
        Ok(())
    }

    pub fn press(&mut self, deal_id: DealId, origin: Point) -> CrmResult<()> {
        self.ensure_available(deal_id)?;
        self.state = DragState::Pending { deal_id, origin };
        Ok(())
    }

    /// Returns whether a drag is in progress after this move.
    pub fn pointer_move(&mut self, point: Point, board: &BoardStore) -> CrmResult<bool> {
        match self.state {
            DragState::Pending { deal_id, origin } => {
                if origin.distance_to(point) < self.activation_distance {
                    return Ok(false);
                }
                if let Err(e) = self.begin(deal_id, board) {
                    self.state = DragState::Idle;
                    return Err(e);
                }
                Ok(true)
            }
            DragState::Dragging(_) => Ok(true),
            DragState::Idle => Ok(false),
        }
    }

    /// Keyboard sensor: picks the card up without any displacement.
    pub fn start_keyboard(&mut self, deal_id: DealId, board: &BoardStore) -> CrmResult<()> {
        self.ensure_available(deal_id)?;
        self.begin(deal_id, board)
    }

    /// Stage a hover or release target stands for, if it is a valid one.
    fn resolve(session: &DragSession, target: &DropTarget, board: &BoardStore) -> Option<StageId> {
        match target {
            DropTarget::Deal(id) if *id == session.deal_id => {
                Some(session.tentative_stage.clone())
            }
            DropTarget::Deal(id) => board.deal(*id).map(|d| d.stage.clone()),
            DropTarget::Column(stage) if board.has_stage(stage) => Some(stage.clone()),
            DropTarget::Column(_) => None,
        }
    }

    /// Moves the card to the hovered column on the board only.
    pub fn drag_over(&mut self, target: &DropTarget, board: &mut BoardStore) -> CrmResult<()> {
        let DragState::Dragging(session) = &self.state else {
            return Ok(());
        };
        let Some(stage) = Self::resolve(session, target, board) else {
            return Ok(());
        };
        if stage == session.tentative_stage {
            return Ok(());
        }

        let deal_id = session.deal_id;
        board.set_deal_stage(deal_id, &stage)?;
        tracing::debug!(%deal_id, stage = %stage, "Optimistic move");
        if let DragState::Dragging(session) = &mut self.state {
            session.tentative_stage = stage;
        }
        Ok(())
    }

    fn revert(session: &DragSession, board: &mut BoardStore) -> CrmResult<()> {
        let current = board.deal(session.deal_id).map(|d| d.stage.as_str());
        if current != Some(session.original_stage.as_str()) {
            board.set_deal_stage(session.deal_id, &session.original_stage)?;
        }
        Ok(())
    }

    /// Ends the gesture. Only `Commit` needs a round trip to the store.
    pub fn drop(
        &mut self,
        target: Option<&DropTarget>,
        board: &mut BoardStore,
    ) -> CrmResult<DropDecision> {
        let session = match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => session,
            DragState::Pending { .. } | DragState::Idle => return Ok(DropDecision::Ignored),
        };
        let deal_id = session.deal_id;

        let Some(target_stage) = target.and_then(|t| Self::resolve(&session, t, board)) else {
            Self::revert(&session, board)?;
            tracing::debug!(%deal_id, "Drag released outside any column");
            return Ok(DropDecision::Cancelled { deal_id });
        };

        if target_stage == session.original_stage {
            Self::revert(&session, board)?;
            return Ok(DropDecision::Unchanged { deal_id });
        }

        // A reload may have replaced the board since the last hover.
        if board.deal(deal_id).map(|d| d.stage.as_str()) != Some(target_stage.as_str()) {
            board.set_deal_stage(deal_id, &target_stage)?;
        }
        let pending = PendingCommit {
            deal_id,
            original_stage: session.original_stage,
            target_stage,
        };
        self.reconciling.insert(deal_id, pending.clone());
        Ok(DropDecision::Commit(pending))
    }

    /// Escape key: abandon the gesture and put the card back.
    pub fn cancel(&mut self, board: &mut BoardStore) -> CrmResult<Option<DealId>> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => {
                Self::revert(&session, board)?;
                Ok(Some(session.deal_id))
            }
            DragState::Pending { deal_id, .. } => Ok(Some(deal_id)),
            DragState::Idle => Ok(None),
        }
    }

    /// Applies the store's answer to a pending move.
    pub fn settle(
        &mut self,
        pending: PendingCommit,
        result: CrmResult<Deal>,
        board: &mut BoardStore,
        notifications: &mut NotificationCenter,
    ) -> DragOutcome {
        self.reconciling.remove(&pending.deal_id);
        let PendingCommit {
            deal_id,
            original_stage,
            target_stage,
        } = pending;

        match result {
            Ok(deal) => {
                if deal.stage == target_stage {
                    board.replace_deal(deal.clone());
                }
                if board
                    .stage(&target_stage)
                    .is_some_and(|s| s.outcome == StageOutcome::Won)
                {
                    tracing::info!(
                        %deal_id,
                        title = %deal.title,
                        stage = %target_stage,
                        "Deal won, triggering automation"
                    );
                }
                DragOutcome::Committed(deal)
            }
            Err(error) => {
                if let Err(e) = board.set_deal_stage(deal_id, &original_stage) {
                    tracing::warn!(%deal_id, error = %e, "Could not restore deal after failed move");
                }
                let title = board
                    .deal(deal_id)
                    .map(|d| d.title.clone())
                    .unwrap_or_else(|| deal_id.to_string());
                let notification = notifications.rollback(
                    deal_id,
                    format!(
                        "Could not move '{}' to {}; it was returned to {}",
                        title, target_stage, original_stage
                    ),
                );
                tracing::warn!(
                    %deal_id,
                    target = %target_stage,
                    restored = %original_stage,
                    error = %error,
                    "Rolled back optimistic move"
                );
                DragOutcome::RolledBack {
                    deal_id,
                    restored_stage: original_stage,
                    notification,
                    error,
                }
            }
        }
    }

    /// Drops and, when needed, waits for the store before settling.
    pub async fn finish<C: StageCommitter + ?Sized>(
        &mut self,
        target: Option<&DropTarget>,
        board: &mut BoardStore,
        committer: &C,
        notifications: &mut NotificationCenter,
    ) -> CrmResult<DragOutcome> {
        let outcome = match self.drop(target, board)? {
            DropDecision::Ignored => DragOutcome::Ignored,
            DropDecision::Cancelled { deal_id } => DragOutcome::Cancelled { deal_id },
            DropDecision::Unchanged { deal_id } => DragOutcome::Unchanged { deal_id },
            DropDecision::Commit(pending) => {
                let result = committer
                    .commit_stage(pending.deal_id, &pending.target_stage)
                    .await;
                self.settle(pending, result, board, notifications)
            }
        };
        Ok(outcome)
    }
}
