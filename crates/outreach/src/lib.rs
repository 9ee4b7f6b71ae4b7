//! Outreach runtimes.
//!
//! Two interchangeable implementations sit behind the `/run` trigger:
//! - `engine` - the real send -> poll -> schedule state machine against live
//!   providers
//! - `demo` - a scripted replay with artificial pauses and no provider I/O,
//!   used when the process runs offline
//!
//! Both emit the identical event vocabulary (`log`, `candidates`,
//! `candidate_status`, `done`) so dashboard subscribers cannot tell which one
//! ran.

pub mod demo;
pub mod engine;
pub mod template;

pub use demo::DemoSequencer;
pub use engine::OutreachFlowEngine;
pub use template::render_body;
