//! Falling-piece animation queue.
//!
//! The scheduler owns the local board mirror. It is driven by an external
//! tick source and knows nothing about the UI that draws it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use super::recorder::ReplayRecorder;
use crate::games::connect_four::{Board, Placement};

/// Distance below which a falling piece counts as arrived.
const LANDING_EPSILON: f64 = 1e-6;

/// Pixel layout of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardGeometry {
    /// Side of one square cell.
    pub cell_size: i32,
    /// Gap between the window edge and the board.
    pub margin: i32,
    /// Gap between a cell's edge and its disc.
    pub piece_padding: i32,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            cell_size: 70,
            margin: 8,
            piece_padding: 10,
        }
    }
}

impl BoardGeometry {
    /// Diameter of a disc.
    pub fn disc_size(&self) -> i32 {
        self.cell_size - 2 * self.piece_padding
    }

    /// Left edge of a disc in `column`.
    pub fn disc_x(&self, column: usize) -> i32 {
        self.margin + column as i32 * self.cell_size + self.piece_padding
    }

    /// Top edge of a disc resting in `row`.
    pub fn disc_y(&self, row: usize) -> i32 {
        self.margin + row as i32 * self.cell_size + self.piece_padding
    }

    /// Top edge of a disc just above the board.
    pub fn entry_y(&self) -> i32 {
        self.margin - self.disc_size()
    }
}

/// Pacing of the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTiming {
    /// Milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Live-mode fall speed.
    pub pixels_per_tick: u32,
    /// Wall-clock time of every replayed move.
    pub replay_move_duration_ms: u64,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            pixels_per_tick: 24,
            replay_move_duration_ms: 350,
        }
    }
}

impl AnimationTiming {
    /// Ticks a replayed move lasts, at least one.
    pub fn replay_ticks(&self) -> u64 {
        (self.replay_move_duration_ms / self.tick_interval_ms.max(1)).max(1)
    }
}

/// Whether committed pieces come from the server or from a stored log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Pieces come from server replies and are mirrored locally.
    #[default]
    Live,
    /// Pieces come from a stored session and are never recorded.
    Replay,
}

/// A piece on its way down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallingPiece {
    /// Where it will land.
    pub placement: Placement,
    /// Left edge.
    pub x: i32,
    /// Current top edge. Fractional so replay steps accumulate exactly.
    pub y: f64,
    /// Top edge at rest.
    pub target_y: f64,
    /// Disc diameter.
    pub size: i32,
    /// Pixels per tick.
    pub step: f64,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Nothing queued.
    Idle,
    /// The active piece moved but has not landed.
    Falling,
    /// The active piece landed and was committed to the mirror.
    Landed {
        /// The committed placement.
        placement: Placement,
        /// True when the queue is now empty.
        drained: bool,
    },
}

/// One-at-a-time FIFO of falling pieces over a local board mirror.
#[derive(Debug)]
pub struct AnimationScheduler {
    geometry: BoardGeometry,
    timing: AnimationTiming,
    mode: PlaybackMode,
    queue: VecDeque<FallingPiece>,
    board: Board,
    recorder: Option<ReplayRecorder>,
}

impl AnimationScheduler {
    /// Creates an idle live-mode scheduler over an empty board.
    #[instrument]
    pub fn new(geometry: BoardGeometry, timing: AnimationTiming) -> Self {
        Self {
            geometry,
            timing,
            mode: PlaybackMode::Live,
            queue: VecDeque::new(),
            board: Board::new(),
            recorder: None,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Local board mirror.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Layout in use.
    pub fn geometry(&self) -> &BoardGeometry {
        &self.geometry
    }

    /// Pacing in use.
    pub fn timing(&self) -> &AnimationTiming {
        &self.timing
    }

    /// The piece currently falling, if any.
    pub fn active(&self) -> Option<&FallingPiece> {
        self.queue.front()
    }

    /// True while any piece is queued or falling.
    pub fn is_busy(&self) -> bool {
        !self.queue.is_empty()
    }

    /// The attached live recorder.
    pub fn recorder_mut(&mut self) -> Option<&mut ReplayRecorder> {
        self.recorder.as_mut()
    }

    /// Clears the board and queue and switches to live mode with `recorder`.
    ///
    /// Returns any recorder that was attached before.
    #[instrument(skip(self, recorder))]
    pub fn enter_live(&mut self, recorder: Option<ReplayRecorder>) -> Option<ReplayRecorder> {
        self.reset();
        self.mode = PlaybackMode::Live;
        debug!(recording = recorder.is_some(), "Entered live mode");
        std::mem::replace(&mut self.recorder, recorder)
    }

    /// Clears the board and queue and switches to replay mode.
    ///
    /// The live recorder is detached and handed back so the caller can
    /// finalize it.
    #[instrument(skip(self))]
    pub fn enter_replay(&mut self) -> Option<ReplayRecorder> {
        self.reset();
        self.mode = PlaybackMode::Replay;
        debug!("Entered replay mode");
        self.recorder.take()
    }

    /// Empties the queue and the board mirror. Mode and recorder are kept.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.queue.clear();
        self.board = Board::new();
    }

    /// Replaces the board mirror wholesale, dropping anything queued.
    #[instrument(skip(self, board))]
    pub fn restore(&mut self, board: Board) {
        self.queue.clear();
        self.board = board;
    }

    /// Queues a piece to fall to `placement`.
    ///
    /// Live pieces fall at a fixed speed. Replayed pieces get a step that
    /// makes every move last the same number of ticks whatever the drop
    /// distance.
    #[instrument(skip(self))]
    pub fn enqueue(&mut self, placement: Placement) {
        let entry_y = f64::from(self.geometry.entry_y());
        let target_y = f64::from(self.geometry.disc_y(placement.row));
        let step = match self.mode {
            PlaybackMode::Live => f64::from(self.timing.pixels_per_tick.max(1)),
            PlaybackMode::Replay => {
                let distance = (target_y - entry_y).max(1.0);
                distance / self.timing.replay_ticks() as f64
            }
        };
        self.queue.push_back(FallingPiece {
            placement,
            x: self.geometry.disc_x(placement.column),
            y: entry_y,
            target_y,
            size: self.geometry.disc_size(),
            step,
        });
        debug!(step, queued = self.queue.len(), "Piece queued");
    }

    /// Advances the active piece by one step.
    ///
    /// On landing the piece is committed to the mirror and, in live mode,
    /// handed to the recorder before the next piece becomes active.
    #[instrument(skip(self), level = "trace")]
    pub fn tick(&mut self) -> Tick {
        let Some(active) = self.queue.front_mut() else {
            return Tick::Idle;
        };

        active.y += active.step;
        // Tolerate float drift so the last replay step lands exactly on time.
        if active.target_y - active.y > LANDING_EPSILON {
            trace!(y = active.y, target_y = active.target_y, "Piece falling");
            return Tick::Falling;
        }
        active.y = active.target_y;
        let placement = active.placement;

        if let Err(e) = self
            .board
            .place(placement.row, placement.column, placement.mover)
        {
            warn!(error = e, ?placement, "Landed piece is off the board");
        }
        if self.mode == PlaybackMode::Live {
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.append(placement);
            }
        }
        self.queue.pop_front();

        let drained = self.queue.is_empty();
        debug!(?placement, drained, "Piece landed");
        Tick::Landed { placement, drained }
    }

    /// Ticks until the queue drains, returning the landed placements in order.
    pub fn run_to_idle(&mut self) -> Vec<Placement> {
        let mut landed = Vec::new();
        loop {
            match self.tick() {
                Tick::Idle => return landed,
                Tick::Falling => {}
                Tick::Landed { placement, .. } => landed.push(placement),
            }
        }
    }
}
