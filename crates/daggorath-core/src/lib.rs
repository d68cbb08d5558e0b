//! Task scheduler, fixed-tick clock, and audio channel synchronization.
//!
//! The scheduler owns a fixed table of task control blocks and fires them
//! from a fixed-tick simulated clock that the host drives with wall-clock
//! time once per rendered frame. Nothing here blocks except
//! [`ChannelSync::wait_for_channel`] in blocking mode, which hosts opt into.
//!
//! # Modules
//!
//! - [`clock`] -- Accumulator that turns frame deltas into capped fixed ticks.
//! - [`task`] -- Task control blocks, the table, and the baseline task set.
//! - [`scheduler`] -- [`Scheduler`] and the [`TaskDispatcher`] trait.
//! - [`channel`] -- Per-channel completion signals with bounded waits.
//! - [`config`] -- YAML configuration into strongly-typed structs.
//!
//! [`ChannelSync::wait_for_channel`]: channel::ChannelSync::wait_for_channel
//! [`Scheduler`]: scheduler::Scheduler
//! [`TaskDispatcher`]: scheduler::TaskDispatcher

pub mod channel;
pub mod clock;
pub mod config;
pub mod scheduler;
pub mod task;
