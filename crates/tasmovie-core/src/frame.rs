//! Controller frames: one sub-step worth of input for both ports.
//!
//! A frame is `SYSTEM_BYTES` of system state followed by each port's packed
//! input. The shape of a frame is described by a shared [`FrameLayout`].
//!
//! Frames come in three flavors:
//! - [`ControllerFrame`] owns an inline buffer and can be reshaped.
//! - [`FrameRef`] / [`FrameMut`] borrow bytes from elsewhere (usually a page
//!   of a [`FrameVector`](crate::vector::FrameVector)) and keep that storage
//!   borrowed for as long as they live. They can never change shape.
//!
//! Read access is shared through [`FrameView`], write access through
//! [`FrameViewMut`].
//!
//! System bytes:
//! ```text
//! [0] flags: bit 0 = sync (first subframe of a frame), bit 1 = reset
//! [1..3] reset delay high part, i16 BE
//! [3..5] reset delay low part, i16 BE
//! ```

use std::fmt::{self, Write as _};
use std::ops::Range;
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::port::{
    Consumed, DeviceType, LogicalButton, MAX_PORTS, PortKind, PortType, PortTypeRegistry,
    control_index, split_control_index,
};
use crate::text::FieldReader;

/// Bytes of system state at the start of every frame.
pub const SYSTEM_BYTES: usize = 5;
/// Capacity of an owned frame's inline buffer.
pub const MAX_FRAME_SIZE: usize = 32;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct SystemFlags: u8 {
        const SYNC = 1 << 0;
        const RESET = 1 << 1;
    }
}

/// Shape of a controller frame: the port type on each port and where its
/// bytes live.
#[derive(Debug, Clone)]
pub struct FrameLayout {
    ports: [Arc<dyn PortType>; MAX_PORTS],
    offsets: [usize; MAX_PORTS],
    size: usize,
}

impl FrameLayout {
    /// Builds a layout from registered kinds, checking port legality.
    pub fn new(registry: &PortTypeRegistry, kinds: [PortKind; MAX_PORTS]) -> Result<Self> {
        let ports = [
            registry.lookup_for_port(kinds[0], 0)?,
            registry.lookup_for_port(kinds[1], 1)?,
        ];
        Self::from_port_types(ports)
    }

    pub fn from_port_types(ports: [Arc<dyn PortType>; MAX_PORTS]) -> Result<Self> {
        let mut offsets = [0; MAX_PORTS];
        let mut offset = SYSTEM_BYTES;
        for (port, port_type) in ports.iter().enumerate() {
            if !port_type.legal(port) {
                return Err(Error::IllegalPortType {
                    port,
                    kind: port_type.kind(),
                });
            }
            offsets[port] = offset;
            offset += port_type.storage_size();
        }
        if offset > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size: offset,
                capacity: MAX_FRAME_SIZE,
            });
        }
        Ok(Self {
            ports,
            offsets,
            size: offset,
        })
    }

    /// Same layout with `port` switched to `port_type`.
    pub fn with_port(&self, port: usize, port_type: Arc<dyn PortType>) -> Result<Self> {
        if port >= MAX_PORTS {
            return Err(Error::out_of_range("port", port, MAX_PORTS));
        }
        let mut ports = self.ports.clone();
        ports[port] = port_type;
        Self::from_port_types(ports)
    }

    pub fn kinds(&self) -> [PortKind; MAX_PORTS] {
        [self.ports[0].kind(), self.ports[1].kind()]
    }

    pub fn port(&self, port: usize) -> Result<&Arc<dyn PortType>> {
        self.ports
            .get(port)
            .ok_or_else(|| Error::out_of_range("port", port, MAX_PORTS))
    }

    /// Total bytes of one frame.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Byte range of `port` inside a frame. `port` must be below `MAX_PORTS`.
    pub fn port_range(&self, port: usize) -> Range<usize> {
        self.offsets[port]..self.offsets[port] + self.ports[port].storage_size()
    }

    pub fn same_shape(&self, other: &FrameLayout) -> bool {
        self.kinds() == other.kinds()
    }

    /// Number of controls actually present across both ports.
    pub fn control_count(&self) -> usize {
        self.ports
            .iter()
            .map(|p| p.controllers() * p.controls())
            .sum()
    }
}

impl PartialEq for FrameLayout {
    fn eq(&self, other: &Self) -> bool {
        self.same_shape(other)
    }
}

impl Eq for FrameLayout {}

/// Read access to a controller frame.
pub trait FrameView {
    fn layout(&self) -> &Arc<FrameLayout>;

    /// The frame bytes, exactly `layout().size()` long.
    fn bytes(&self) -> &[u8];

    fn types(&self) -> [PortKind; MAX_PORTS] {
        self.layout().kinds()
    }

    fn types_match<F: FrameView + ?Sized>(&self, other: &F) -> bool {
        self.layout().same_shape(other.layout())
    }

    fn size(&self) -> usize {
        self.layout().size()
    }

    fn flags(&self) -> SystemFlags {
        SystemFlags::from_bits_truncate(self.bytes()[0])
    }

    fn sync(&self) -> bool {
        self.flags().contains(SystemFlags::SYNC)
    }

    fn reset(&self) -> bool {
        self.flags().contains(SystemFlags::RESET)
    }

    fn delay(&self) -> (i16, i16) {
        let b = self.bytes();
        (
            i16::from_be_bytes([b[1], b[2]]),
            i16::from_be_bytes([b[3], b[4]]),
        )
    }

    /// Reads a control. Slots the port type does not populate read as 0.
    fn axis(&self, port: usize, controller: usize, control: usize) -> Result<i16> {
        control_index(port, controller, control)?;
        let layout = self.layout();
        let range = layout.port_range(port);
        Ok(layout.ports[port].read(&self.bytes()[range], controller, control))
    }

    /// Reads a control by flat control index.
    fn axis_by_index(&self, index: usize) -> Result<i16> {
        let (port, controller, control) =
            split_control_index(index).ok_or(Error::InvalidControlIndex(index))?;
        self.axis(port, controller, control)
    }

    fn display(&self, port: usize, controller: usize) -> Result<String> {
        let layout = self.layout();
        let port_type = layout.port(port)?;
        Ok(port_type.display(&self.bytes()[layout.port_range(port)], controller))
    }

    fn device_type(&self, port: usize, controller: usize) -> DeviceType {
        self.layout()
            .port(port)
            .map_or(DeviceType::None, |p| p.device_type(controller))
    }

    fn button_id(&self, port: usize, controller: usize, button: LogicalButton) -> Option<usize> {
        self.layout().port(port).ok()?.button_id(controller, button)
    }

    fn is_analog(&self, port: usize, controller: usize) -> bool {
        self.layout()
            .port(port)
            .is_ok_and(|p| p.is_analog(controller))
    }

    fn is_mouse(&self, port: usize, controller: usize) -> bool {
        self.layout()
            .port(port)
            .is_ok_and(|p| p.is_mouse(controller))
    }

    /// Text form: system field, then each port's fields.
    fn serialize_text(&self) -> String {
        let bytes = self.bytes();
        let layout = self.layout();
        let mut out = String::new();
        let flags = self.flags();
        out.push(if flags.contains(SystemFlags::SYNC) {
            'F'
        } else {
            '.'
        });
        out.push(if flags.contains(SystemFlags::RESET) {
            'R'
        } else {
            '.'
        });
        if bytes[1..SYSTEM_BYTES].iter().any(|&b| b != 0) {
            let (hi, lo) = self.delay();
            let _ = write!(out, " {hi} {lo}");
        }
        for port in 0..MAX_PORTS {
            layout.ports[port].serialize(&bytes[layout.port_range(port)], &mut out);
        }
        out
    }

    fn to_owned_frame(&self) -> ControllerFrame {
        let mut data = [0u8; MAX_FRAME_SIZE];
        data[..self.size()].copy_from_slice(self.bytes());
        ControllerFrame {
            layout: Arc::clone(self.layout()),
            data,
        }
    }

    /// Owned copy with the sync flag forced to `sync`.
    fn copy(&self, sync: bool) -> ControllerFrame {
        let mut frame = self.to_owned_frame();
        frame.set_sync(sync);
        frame
    }

    /// Owned blank frame of the same shape.
    fn blank_frame(&self) -> ControllerFrame {
        ControllerFrame::new(Arc::clone(self.layout()))
    }

    /// Bytewise XOR of both frames, system bytes included.
    fn xor<F: FrameView + ?Sized>(&self, other: &F) -> Result<ControllerFrame> {
        if !self.types_match(other) {
            return Err(Error::TypeMismatch);
        }
        let mut out = self.to_owned_frame();
        for (a, b) in out.data.iter_mut().zip(other.bytes()) {
            *a ^= b;
        }
        Ok(out)
    }

    /// Byte equality, failing on shape mismatch.
    fn try_eq<F: FrameView + ?Sized>(&self, other: &F) -> Result<bool> {
        if !self.types_match(other) {
            return Err(Error::TypeMismatch);
        }
        Ok(self.bytes() == other.bytes())
    }

    /// Byte equality; frames of different shape are never equal.
    fn frame_eq<F: FrameView + ?Sized>(&self, other: &F) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

/// Write access to a controller frame.
pub trait FrameViewMut: FrameView {
    fn bytes_mut(&mut self) -> &mut [u8];

    fn set_flags(&mut self, flags: SystemFlags) {
        self.bytes_mut()[0] = flags.bits();
    }

    fn set_sync(&mut self, sync: bool) {
        let mut flags = self.flags();
        flags.set(SystemFlags::SYNC, sync);
        self.set_flags(flags);
    }

    fn set_reset(&mut self, reset: bool) {
        let mut flags = self.flags();
        flags.set(SystemFlags::RESET, reset);
        self.set_flags(flags);
    }

    fn set_delay(&mut self, delay: (i16, i16)) {
        let b = self.bytes_mut();
        b[1..3].copy_from_slice(&delay.0.to_be_bytes());
        b[3..5].copy_from_slice(&delay.1.to_be_bytes());
    }

    /// Writes a control. Writes to slots the port type does not populate are
    /// dropped.
    fn set_axis(&mut self, port: usize, controller: usize, control: usize, value: i16) -> Result<()> {
        control_index(port, controller, control)?;
        let layout = Arc::clone(self.layout());
        let range = layout.port_range(port);
        layout.ports[port].write(&mut self.bytes_mut()[range], controller, control, value);
        Ok(())
    }

    fn set_axis_by_index(&mut self, index: usize, value: i16) -> Result<()> {
        let (port, controller, control) =
            split_control_index(index).ok_or(Error::InvalidControlIndex(index))?;
        self.set_axis(port, controller, control, value)
    }

    /// Zeroes every byte.
    fn clear(&mut self) {
        self.bytes_mut().fill(0);
    }

    /// Copies `other` into this frame. Borrowed frames cannot change shape,
    /// so the types have to match.
    fn assign<F: FrameView + ?Sized>(&mut self, other: &F) -> Result<()> {
        if !self.types_match(other) {
            return Err(Error::TypeMismatch);
        }
        self.bytes_mut().copy_from_slice(other.bytes());
        Ok(())
    }

    /// Parses the text form. On error the frame is left untouched.
    fn deserialize_text(&mut self, text: &str) -> Result<()> {
        let layout = Arc::clone(self.layout());
        let mut scratch = [0u8; MAX_FRAME_SIZE];
        let mut reader = FieldReader::new(text.as_bytes());

        let mut flags = SystemFlags::empty();
        flags.set(SystemFlags::SYNC, reader.read_button());
        flags.set(SystemFlags::RESET, reader.read_button());
        scratch[0] = flags.bits();
        scratch[1..3].copy_from_slice(&reader.read_axis()?.to_be_bytes());
        scratch[3..5].copy_from_slice(&reader.read_axis()?.to_be_bytes());
        reader.finish_field(false)?;
        reader.eat_pipe();

        for port in 0..MAX_PORTS {
            let range = layout.port_range(port);
            match layout.ports[port].deserialize(&mut scratch[range], reader.rest())? {
                Consumed::Blank => {}
                Consumed::Bytes(n) => {
                    reader.advance(n);
                    reader.eat_pipe();
                }
            }
        }
        if !matches!(reader.peek(), b'\r' | b'\n' | 0) {
            return Err(Error::BadSerialization(format!(
                "trailing data at offset {}",
                reader.pos()
            )));
        }

        self.bytes_mut().copy_from_slice(&scratch[..layout.size()]);
        Ok(())
    }
}

/// A frame that owns its bytes.
#[derive(Clone)]
pub struct ControllerFrame {
    layout: Arc<FrameLayout>,
    data: [u8; MAX_FRAME_SIZE],
}

impl ControllerFrame {
    /// Zero-filled frame of the given shape.
    pub fn new(layout: Arc<FrameLayout>) -> Self {
        Self {
            layout,
            data: [0; MAX_FRAME_SIZE],
        }
    }

    pub fn from_kinds(registry: &PortTypeRegistry, kinds: [PortKind; MAX_PORTS]) -> Result<Self> {
        Ok(Self::new(Arc::new(FrameLayout::new(registry, kinds)?)))
    }

    pub fn from_text(layout: Arc<FrameLayout>, text: &str) -> Result<Self> {
        let mut frame = Self::new(layout);
        frame.deserialize_text(text)?;
        Ok(frame)
    }

    /// Replaces this frame with a copy of `other`, taking over its shape.
    pub fn assign_from<F: FrameView + ?Sized>(&mut self, other: &F) {
        self.layout = Arc::clone(other.layout());
        self.data = [0; MAX_FRAME_SIZE];
        self.data[..other.size()].copy_from_slice(other.bytes());
    }

    /// Switches the type on `port`. Input for that port is zeroed; system
    /// bytes and the other port are kept.
    pub fn set_port_type(
        &mut self,
        registry: &PortTypeRegistry,
        port: usize,
        kind: PortKind,
    ) -> Result<()> {
        if port >= MAX_PORTS {
            return Err(Error::out_of_range("port", port, MAX_PORTS));
        }
        let port_type = registry.lookup_for_port(kind, port)?;
        let layout = self.layout.with_port(port, port_type)?;
        let mut data = [0u8; MAX_FRAME_SIZE];
        data[..SYSTEM_BYTES].copy_from_slice(&self.data[..SYSTEM_BYTES]);
        for other in (0..MAX_PORTS).filter(|&p| p != port) {
            data[layout.port_range(other)].copy_from_slice(&self.data[self.layout.port_range(other)]);
        }
        self.layout = Arc::new(layout);
        self.data = data;
        Ok(())
    }

    pub fn view(&self) -> FrameRef<'_> {
        FrameRef {
            layout: &self.layout,
            data: &self.data[..self.layout.size],
        }
    }

    pub fn view_mut(&mut self) -> FrameMut<'_> {
        let size = self.layout.size;
        FrameMut {
            layout: &self.layout,
            data: &mut self.data[..size],
        }
    }
}

impl FrameView for ControllerFrame {
    fn layout(&self) -> &Arc<FrameLayout> {
        &self.layout
    }

    fn bytes(&self) -> &[u8] {
        &self.data[..self.layout.size]
    }
}

impl FrameViewMut for ControllerFrame {
    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.layout.size]
    }

    /// Owned frames take over the shape of `other`.
    fn assign<F: FrameView + ?Sized>(&mut self, other: &F) -> Result<()> {
        self.assign_from(other);
        Ok(())
    }
}

impl PartialEq for ControllerFrame {
    fn eq(&self, other: &Self) -> bool {
        self.frame_eq(other)
    }
}

impl Eq for ControllerFrame {}

impl fmt::Debug for ControllerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerFrame")
            .field("types", &self.types())
            .field("text", &self.serialize_text())
            .finish()
    }
}

/// Read-only frame over borrowed bytes.
#[derive(Clone, Copy)]
pub struct FrameRef<'a> {
    layout: &'a Arc<FrameLayout>,
    data: &'a [u8],
}

impl<'a> FrameRef<'a> {
    /// Views `data` as a frame of shape `layout`. Only the first
    /// `layout.size()` bytes are used.
    pub fn new(layout: &'a Arc<FrameLayout>, data: &'a [u8]) -> Result<Self> {
        let needed = layout.size();
        let data = data.get(..needed).ok_or(Error::BackingTooSmall {
            needed,
            actual: data.len(),
        })?;
        Ok(Self { layout, data })
    }
}

impl FrameView for FrameRef<'_> {
    fn layout(&self) -> &Arc<FrameLayout> {
        self.layout
    }

    fn bytes(&self) -> &[u8] {
        self.data
    }
}

impl fmt::Debug for FrameRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrameRef")
            .field(&self.serialize_text())
            .finish()
    }
}

/// Mutable frame over borrowed bytes.
pub struct FrameMut<'a> {
    layout: &'a Arc<FrameLayout>,
    data: &'a mut [u8],
}

impl<'a> FrameMut<'a> {
    pub fn new(layout: &'a Arc<FrameLayout>, data: &'a mut [u8]) -> Result<Self> {
        let needed = layout.size();
        let actual = data.len();
        let data = data
            .get_mut(..needed)
            .ok_or(Error::BackingTooSmall { needed, actual })?;
        Ok(Self { layout, data })
    }
}

impl FrameView for FrameMut<'_> {
    fn layout(&self) -> &Arc<FrameLayout> {
        self.layout
    }

    fn bytes(&self) -> &[u8] {
        self.data
    }
}

impl FrameViewMut for FrameMut<'_> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }
}

impl fmt::Debug for FrameMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FrameMut")
            .field(&self.serialize_text())
            .finish()
    }
}
