//! Deterministic input recording for rerecording emulators.
//!
//! The crate keeps per-frame controller input for a two-port console in a
//! compact paged buffer and runs the record / playback state machine on top
//! of it:
//!
//! - [`port`]: port types (gamepad, multitap, mouse, light guns) and the
//!   registry that maps kinds and names to them.
//! - [`frame`]: controller frames, their binary layout and text form.
//! - [`vector`]: paged storage for the subframes of a movie.
//! - [`poll`]: per-control poll counters and DRDY bits.
//! - [`controls`]: live input with autohold and autofire.
//! - [`movie`]: the state machine, savestate positions and compatibility checks.
//! - [`logic`]: the bridge an emulator core drives once per frame and poll.

pub mod config;
pub mod controls;
pub mod error;
pub mod events;
pub mod frame;
pub mod logic;
pub mod movie;
pub mod poll;
pub mod port;
pub mod project;
pub mod vector;

mod text;

pub use config::{MovieConfig, PageConfig};
pub use controls::ControllerState;
pub use error::{Error, Result};
pub use events::InputObserver;
pub use frame::{ControllerFrame, FrameLayout, FrameMut, FrameRef, FrameView, FrameViewMut};
pub use logic::{InputSource, MovieLogic};
pub use movie::{Movie, MovieState};
pub use poll::PollCounters;
pub use port::{PortKind, PortType, PortTypeRegistry, StandardPort};
pub use project::{Clock, SystemClock, generate_project_id};
pub use vector::FrameVector;
