//! Outbound notifications for UI and scripting layers.

use crate::frame::ControllerFrame;
use crate::port::{MAX_PORTS, PortKind};

/// Receives state changes from a [`ControllerState`](crate::controls::ControllerState).
///
/// Every method defaults to doing nothing, so an observer only implements
/// what it displays.
pub trait InputObserver: Send {
    /// Autohold on one control was switched.
    fn autohold_changed(&mut self, _port: usize, _controller: usize, _control: usize, _held: bool) {}

    /// A new autofire pattern was installed. An empty pattern means autofire
    /// is off.
    fn autofire_changed(&mut self, _pattern: &[ControllerFrame]) {}

    /// Port types changed. `set_as_core` tells whether the emulated machine
    /// should be reconfigured as well.
    fn ports_reconfigured(&mut self, _types: [PortKind; MAX_PORTS], _set_as_core: bool) {}
}
