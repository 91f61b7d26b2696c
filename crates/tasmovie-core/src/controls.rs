//! Live controller input as seen by the front-end.
//!
//! Three frames of the same shape are kept: the buttons currently held, the
//! autohold mask and the last committed value. The effective input for a
//! frame is `held ^ autohold ^ autofire[frame % len]`.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::events::InputObserver;
use crate::frame::{ControllerFrame, FrameLayout, FrameView, FrameViewMut};
use crate::logic::InputSource;
use crate::port::{
    DeviceType, LogicalButton, MAX_CONTROLLERS_PER_PORT, MAX_PORTS, PortKind, PortTypeRegistry,
};

/// Number of mouse / light gun style devices that get an analog slot.
pub const MAX_ANALOG: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnalogSlot {
    port: usize,
    controller: usize,
    mouse: bool,
}

pub struct ControllerState {
    held: ControllerFrame,
    autohold: ControllerFrame,
    committed: ControllerFrame,
    autofire: Vec<ControllerFrame>,
    analog: [Option<AnalogSlot>; MAX_ANALOG],
    observer: Option<Box<dyn InputObserver>>,
}

impl ControllerState {
    pub fn new(layout: Arc<FrameLayout>) -> Self {
        let blank = ControllerFrame::new(layout);
        let mut state = Self {
            held: blank.clone(),
            autohold: blank.clone(),
            committed: blank,
            autofire: Vec::new(),
            analog: [None; MAX_ANALOG],
            observer: None,
        };
        state.rebuild_analog();
        state
    }

    pub fn with_ports(registry: &PortTypeRegistry, kinds: [PortKind; MAX_PORTS]) -> Result<Self> {
        Ok(Self::new(Arc::new(FrameLayout::new(registry, kinds)?)))
    }

    pub fn set_observer(&mut self, observer: Box<dyn InputObserver>) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn InputObserver>> {
        self.observer.take()
    }

    pub fn layout(&self) -> &Arc<FrameLayout> {
        self.held.layout()
    }

    pub fn types(&self) -> [PortKind; MAX_PORTS] {
        self.held.types()
    }

    /// Switches the type plugged into `port`. Held, autohold and committed
    /// input for that port is cleared and the autofire pattern is dropped
    /// when the type actually changes.
    pub fn set_port(
        &mut self,
        registry: &PortTypeRegistry,
        port: usize,
        kind: PortKind,
        set_as_core: bool,
    ) -> Result<()> {
        if port >= MAX_PORTS {
            return Err(Error::out_of_range("port", port, MAX_PORTS));
        }
        registry.lookup_for_port(kind, port)?;
        if self.types()[port] != kind {
            let mut held = self.held.clone();
            let mut autohold = self.autohold.clone();
            let mut committed = self.committed.clone();
            held.set_port_type(registry, port, kind)?;
            autohold.set_port_type(registry, port, kind)?;
            committed.set_port_type(registry, port, kind)?;
            self.held = held;
            self.autohold = autohold;
            self.committed = committed;
            if !self.autofire.is_empty() {
                self.autofire.clear();
                if let Some(observer) = self.observer.as_mut() {
                    observer.autofire_changed(&[]);
                }
            }
        }
        self.rebuild_analog();
        debug!(port, kind = %kind, set_as_core, "controller port reconfigured");
        let types = self.types();
        if let Some(observer) = self.observer.as_mut() {
            observer.ports_reconfigured(types, set_as_core);
        }
        Ok(())
    }

    fn rebuild_analog(&mut self) {
        self.analog = [None; MAX_ANALOG];
        let mut slots = self.analog.iter_mut();
        for port in 0..MAX_PORTS {
            for controller in 0..MAX_CONTROLLERS_PER_PORT {
                let mouse = match self.held.device_type(port, controller) {
                    DeviceType::Mouse => true,
                    DeviceType::Lightgun => false,
                    DeviceType::None | DeviceType::Gamepad => continue,
                };
                match slots.next() {
                    Some(slot) => {
                        *slot = Some(AnalogSlot {
                            port,
                            controller,
                            mouse,
                        })
                    }
                    None => return,
                }
            }
        }
    }

    /// Effective input for `frame_number` with autohold and autofire applied.
    pub fn get(&self, frame_number: u64) -> ControllerFrame {
        let mut out = self.held.clone();
        xor_into(&mut out, &self.autohold);
        if !self.autofire.is_empty() {
            let len = self.autofire.len() as u64;
            // the remainder is below len, which is a usize
            let phase = (frame_number % len) as usize;
            xor_into(&mut out, &self.autofire[phase]);
        }
        out
    }

    /// Commits the effective input for `frame_number`.
    pub fn commit(&mut self, frame_number: u64) -> ControllerFrame {
        self.committed = self.get(frame_number);
        self.committed.clone()
    }

    /// Commits `controls` as given, ignoring autohold and autofire.
    pub fn commit_frame(&mut self, controls: ControllerFrame) -> Result<ControllerFrame> {
        if !controls.types_match(&self.held) {
            return Err(Error::TypeMismatch);
        }
        self.committed = controls;
        Ok(self.committed.clone())
    }

    pub fn get_committed(&self) -> &ControllerFrame {
        &self.committed
    }

    pub fn get_blank(&self) -> ControllerFrame {
        self.held.blank_frame()
    }

    /// Number of logical controllers across both ports.
    pub fn lcid_count(&self) -> usize {
        let layout = self.layout();
        (0..MAX_PORTS)
            .filter_map(|port| layout.port(port).ok())
            .map(|p| p.controllers())
            .sum()
    }

    /// Maps a logical controller number to `(port, controller)`.
    ///
    /// Logical controller 0 is the first controller on port 0; the next ones
    /// are the controllers on port 1, followed by the remaining ones on
    /// port 0. With nothing on port 0 everything maps to port 1.
    pub fn lcid_to_pcid(&self, lcid: usize) -> Option<(usize, usize)> {
        let layout = self.layout();
        let p0 = layout.port(0).ok()?.controllers();
        let p1 = layout.port(1).ok()?.controllers();
        if lcid >= p0 + p1 {
            return None;
        }
        if p0 == 0 {
            return Some((1, lcid));
        }
        match lcid {
            0 => Some((0, 0)),
            n if n <= p1 => Some((1, n - 1)),
            n => Some((0, n - p1)),
        }
    }

    pub fn pcid_device_type(&self, port: usize, controller: usize) -> DeviceType {
        self.held.device_type(port, controller)
    }

    /// `(port, controller)` of analog slot `acid`.
    pub fn acid_to_pcid(&self, acid: usize) -> Option<(usize, usize)> {
        self.analog
            .get(acid)
            .copied()
            .flatten()
            .map(|slot| (slot.port, slot.controller))
    }

    pub fn acid_is_mouse(&self, acid: usize) -> bool {
        self.analog
            .get(acid)
            .copied()
            .flatten()
            .is_some_and(|slot| slot.mouse)
    }

    /// Sets the pointer position of analog slot `acid`.
    pub fn analog(&mut self, acid: usize, x: i16, y: i16) -> Result<()> {
        let (port, controller) = self
            .acid_to_pcid(acid)
            .ok_or_else(|| Error::out_of_range("analog controller", acid, MAX_ANALOG))?;
        self.held.set_axis(port, controller, 0, x)?;
        self.held.set_axis(port, controller, 1, y)
    }

    /// Requests a reset. `delay` is split into `delay / 10000` and
    /// `delay % 10000`; a negative delay cancels the request.
    pub fn reset(&mut self, delay: i32) {
        if delay >= 0 {
            self.held.set_reset(true);
            // the high part saturates for delays past i16::MAX * 10000
            let hi = i16::try_from(delay / 10000).unwrap_or(i16::MAX);
            let lo = (delay % 10000) as i16;
            self.held.set_delay((hi, lo));
        } else {
            self.held.set_reset(false);
            self.held.set_delay((0, 0));
        }
    }

    pub fn set_autohold(
        &mut self,
        port: usize,
        controller: usize,
        control: usize,
        held: bool,
    ) -> Result<()> {
        self.autohold
            .set_axis(port, controller, control, i16::from(held))?;
        if let Some(observer) = self.observer.as_mut() {
            observer.autohold_changed(port, controller, control, held);
        }
        Ok(())
    }

    pub fn autohold(&self, port: usize, controller: usize, control: usize) -> Result<bool> {
        Ok(self.autohold.axis(port, controller, control)? != 0)
    }

    pub fn set_button(
        &mut self,
        port: usize,
        controller: usize,
        control: usize,
        pressed: bool,
    ) -> Result<()> {
        self.held
            .set_axis(port, controller, control, i16::from(pressed))
    }

    pub fn button(&self, port: usize, controller: usize, control: usize) -> Result<bool> {
        Ok(self.held.axis(port, controller, control)? != 0)
    }

    /// Installs an autofire pattern; every frame must have the current shape.
    pub fn set_autofire(&mut self, pattern: Vec<ControllerFrame>) -> Result<()> {
        if pattern.iter().any(|frame| !frame.types_match(&self.held)) {
            return Err(Error::TypeMismatch);
        }
        self.autofire = pattern;
        if let Some(observer) = self.observer.as_mut() {
            observer.autofire_changed(&self.autofire);
        }
        Ok(())
    }

    pub fn autofire(&self) -> &[ControllerFrame] {
        &self.autofire
    }

    pub fn button_id(&self, port: usize, controller: usize, button: LogicalButton) -> Option<usize> {
        self.held.button_id(port, controller, button)
    }

    pub fn is_analog(&self, port: usize, controller: usize) -> bool {
        self.held.is_analog(port, controller)
    }

    pub fn is_mouse(&self, port: usize, controller: usize) -> bool {
        self.held.is_mouse(port, controller)
    }
}

impl InputSource for ControllerState {
    fn update_controls(&mut self, frame_number: u64, _subframe: bool) -> ControllerFrame {
        self.commit(frame_number)
    }
}

impl fmt::Debug for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerState")
            .field("held", &self.held)
            .field("autohold", &self.autohold)
            .field("committed", &self.committed)
            .field("autofire", &self.autofire.len())
            .field("analog", &self.analog)
            .finish_non_exhaustive()
    }
}

/// XORs `other` into `frame`. Both frames must have the same shape.
fn xor_into(frame: &mut ControllerFrame, other: &ControllerFrame) {
    for (a, b) in frame.bytes_mut().iter_mut().zip(other.bytes()) {
        *a ^= b;
    }
}
