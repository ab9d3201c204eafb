//! Shopfloor Core -- the scheduling and agent-coordination engine for
//! factory-floor simulations.
//!
//! Discrete work items move through an ordered pipeline of departments,
//! processed and carried by autonomous worker agents on a tile grid. The
//! engine guarantees liveness (a buffered item is retried every tick),
//! capacity correctness (one live PROCESS task per workstation) and eventual
//! progress under churn -- all from a frame-by-frame tick, not a batch
//! solver.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::advance`] runs, in fixed order:
//!
//! 1. **Commands** -- drain externally queued mutations (hire/fire, orders,
//!    layout repairs) at the tick boundary.
//! 2. **Schedule** -- the scheduler retry pass re-attempts task creation
//!    that earlier capacity races skipped.
//! 3. **Agents** -- every worker's state machine steps once, in hire order.
//! 4. **Post-tick** -- buffered event delivery to passive listeners.
//! 5. **Bookkeeping** -- tick counter, elapsed time, state hash.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- owns all floor state and the tick pipeline.
//! - [`scheduler::Scheduler`] -- task table, pending queue, claim
//!   arbitration, completion/failure handling.
//! - [`worker::Worker`] -- the per-agent state machine (idle, moving,
//!   working, carrying, delivering, returning).
//! - [`department::Department`] -- per-stage workstations, drop points and
//!   item buffer.
//! - [`grid::FloorGrid`] / [`path`] -- flat tile arena and deterministic A*.
//! - [`registry::StageRegistry`] -- the frozen stage sequence.
//! - [`event::EventBus`] -- typed events with post-tick delivery.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point for deterministic math.

pub mod command_queue;
pub mod crew;
pub mod department;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod grid;
pub mod id;
pub mod item;
pub mod order;
pub mod path;
pub mod query;
pub mod registry;
pub mod scheduler;
pub mod sim;
pub mod task;
pub mod validation;
pub mod worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
