//! Input command queue for externally-submitted mutations.
//!
//! The lifecycle controller, order intake and layout tool all talk to the
//! engine by queueing commands. Commands execute at the start of the next
//! tick so identical command scripts replay to identical state. Rejected
//! commands surface as `CommandRejected` events, never as panics.

use crate::fixed::Ticks;
use crate::grid::TilePos;
use crate::id::StageId;
use crate::order::OrderLine;

/// A single command that can be submitted to the engine.
#[derive(Debug, Clone)]
pub enum Command {
    /// Hire one worker into a department.
    HireWorker { stage: StageId },
    /// Remove one worker from a department.
    FireWorker { stage: StageId },
    /// Accept an order: spawns one item per unit quantity at the first stage.
    AcceptOrder { lines: Vec<OrderLine> },
    /// Change a department's staffing ceiling.
    SetMaxWorkers { stage: StageId, max: u32 },
    /// Add a drop point to a department (layout repair).
    AddDropPoint { stage: StageId, pos: TilePos },
    /// Move an existing drop point.
    MoveDropPoint { stage: StageId, from: TilePos, to: TilePos },
}

/// A queue of commands waiting to be executed at the next tick boundary.
///
/// Supports optional history tracking for replay and debugging.
#[derive(Debug)]
pub struct CommandQueue {
    /// Commands waiting to be executed.
    pending: Vec<Command>,
    /// History of executed commands: (tick, command).
    history: Vec<(Ticks, Command)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    /// Create a new empty command queue with no history tracking.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            max_history: 0,
        }
    }

    /// Create a queue that retains up to `max_history` executed commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            max_history,
        }
    }

    /// Push a single command onto the queue.
    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    /// Push multiple commands onto the queue at once.
    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Drain all pending commands, moving them to history with the given
    /// tick. Returns the drained commands in submission order.
    pub fn drain(&mut self, tick: Ticks) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            for cmd in &commands {
                self.history.push((tick, cmd.clone()));
            }
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    /// Number of commands waiting to be executed.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether the queue has no pending commands.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Get the command history (tick, command) pairs.
    pub fn history(&self) -> &[(Ticks, Command)] {
        &self.history
    }

    /// Clear all history entries.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
