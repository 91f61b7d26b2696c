//! Controller port types.
//!
//! A port type describes everything that can be plugged into one of the two
//! controller ports: how many controllers it provides, how one frame worth of
//! their input is packed into bytes, and how that packed input is rendered to
//! and parsed from the movie text format.
//!
//! The built-in SNES family lives in [`standard`]; additional types can be
//! registered on a [`PortTypeRegistry`] at startup.

pub mod generic;
pub mod registry;
pub mod standard;

use std::fmt;

use crate::error::Result;

pub use generic::GenericLayout;
pub use registry::PortTypeRegistry;
pub use standard::StandardPort;

/// Number of controller ports on the emulated machine.
pub const MAX_PORTS: usize = 2;
/// Upper bound on controllers behind one port (a multitap has four).
pub const MAX_CONTROLLERS_PER_PORT: usize = 4;
/// Upper bound on controls (axes + buttons) on one controller.
pub const MAX_CONTROLS_PER_CONTROLLER: usize = 12;
/// Size of the flat control index space shared by every frame shape.
pub const TOTAL_CONTROLS: usize =
    MAX_PORTS * MAX_CONTROLLERS_PER_PORT * MAX_CONTROLS_PER_CONTROLLER;

/// Integer identifier of a port type.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortKind(pub u32);

impl PortKind {
    pub const NONE: PortKind = PortKind(0);
    pub const GAMEPAD: PortKind = PortKind(1);
    pub const MULTITAP: PortKind = PortKind(2);
    pub const MOUSE: PortKind = PortKind(3);
    pub const SUPERSCOPE: PortKind = PortKind(4);
    pub const JUSTIFIER: PortKind = PortKind(5);
    pub const JUSTIFIERS: PortKind = PortKind(6);
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match StandardPort::from_kind(*self) {
            Some(port) => f.write_str(port.name()),
            None => write!(f, "#{}", self.0),
        }
    }
}

/// Device class of a single controller behind a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    None,
    Gamepad,
    Mouse,
    Lightgun,
}

impl DeviceType {
    pub fn name(self) -> &'static str {
        match self {
            DeviceType::None => "disconnected",
            DeviceType::Gamepad => "gamepad",
            DeviceType::Mouse => "mouse",
            DeviceType::Lightgun => "lightgun",
        }
    }
}

/// Device-independent button names used by front-ends for key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalButton {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
    A = 4,
    B = 5,
    X = 6,
    Y = 7,
    L = 8,
    R = 9,
    Select = 10,
    Start = 11,
    Trigger = 12,
    Cursor = 13,
    Turbo = 14,
    Pause = 15,
}

impl LogicalButton {
    pub const ALL: [LogicalButton; 16] = [
        LogicalButton::Left,
        LogicalButton::Right,
        LogicalButton::Up,
        LogicalButton::Down,
        LogicalButton::A,
        LogicalButton::B,
        LogicalButton::X,
        LogicalButton::Y,
        LogicalButton::L,
        LogicalButton::R,
        LogicalButton::Select,
        LogicalButton::Start,
        LogicalButton::Trigger,
        LogicalButton::Cursor,
        LogicalButton::Turbo,
        LogicalButton::Pause,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            LogicalButton::Left => "left",
            LogicalButton::Right => "right",
            LogicalButton::Up => "up",
            LogicalButton::Down => "down",
            LogicalButton::A => "A",
            LogicalButton::B => "B",
            LogicalButton::X => "X",
            LogicalButton::Y => "Y",
            LogicalButton::L => "L",
            LogicalButton::R => "R",
            LogicalButton::Select => "select",
            LogicalButton::Start => "start",
            LogicalButton::Trigger => "trigger",
            LogicalButton::Cursor => "cursor",
            LogicalButton::Turbo => "turbo",
            LogicalButton::Pause => "pause",
        }
    }
}

/// Result of parsing one port's text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    /// The port has no controllers and took no input; no `|` is expected after it.
    Blank,
    /// Number of bytes read, not counting the trailing terminator.
    Bytes(usize),
}

/// Behavior of one port type.
///
/// `buf` arguments are exactly `storage_size()` bytes long: the slice of a
/// controller frame that belongs to the port.
pub trait PortType: fmt::Debug + Send + Sync {
    fn kind(&self) -> PortKind;

    fn name(&self) -> &str;

    /// Bytes needed to store one frame of this port's input.
    fn storage_size(&self) -> usize;

    /// Number of controllers this port provides.
    fn controllers(&self) -> usize;

    /// Number of controls (axes followed by buttons) on each controller.
    fn controls(&self) -> usize;

    /// Whether this type may be plugged into `port`.
    fn legal(&self, port: usize) -> bool;

    /// Writes `value` into a control. Buttons only care about zero/nonzero.
    /// Controls the type does not have are ignored.
    fn write(&self, buf: &mut [u8], controller: usize, control: usize, value: i16);

    /// Reads a control. Buttons read as 0 or 1, missing controls as 0.
    fn read(&self, buf: &[u8], controller: usize, control: usize) -> i16;

    /// Human-readable input display for one controller.
    fn display(&self, buf: &[u8], controller: usize) -> String;

    /// Appends the text form of the port, including each controller's leading `|`.
    fn serialize(&self, buf: &[u8], out: &mut String);

    /// Parses the text form produced by [`PortType::serialize`] (without the
    /// first `|`), overwriting `buf`. Parsing stops at `|`, CR, LF or NUL in
    /// the last field.
    fn deserialize(&self, buf: &mut [u8], text: &[u8]) -> Result<Consumed>;

    fn device_type(&self, controller: usize) -> DeviceType;

    /// Maps a logical button to the physical control index on `controller`.
    fn button_id(&self, controller: usize, button: LogicalButton) -> Option<usize>;

    fn is_analog(&self, controller: usize) -> bool {
        matches!(
            self.device_type(controller),
            DeviceType::Mouse | DeviceType::Lightgun
        )
    }

    fn is_mouse(&self, controller: usize) -> bool {
        self.device_type(controller) == DeviceType::Mouse
    }
}

/// Flat control index of `(port, controller, control)`.
pub fn control_index(port: usize, controller: usize, control: usize) -> Result<usize> {
    use crate::error::Error;
    if port >= MAX_PORTS {
        return Err(Error::out_of_range("port", port, MAX_PORTS));
    }
    if controller >= MAX_CONTROLLERS_PER_PORT {
        return Err(Error::out_of_range(
            "controller",
            controller,
            MAX_CONTROLLERS_PER_PORT,
        ));
    }
    if control >= MAX_CONTROLS_PER_CONTROLLER {
        return Err(Error::out_of_range(
            "control",
            control,
            MAX_CONTROLS_PER_CONTROLLER,
        ));
    }
    Ok((port * MAX_CONTROLLERS_PER_PORT + controller) * MAX_CONTROLS_PER_CONTROLLER + control)
}

/// Inverse of [`control_index`]. Returns `None` past [`TOTAL_CONTROLS`].
pub fn split_control_index(index: usize) -> Option<(usize, usize, usize)> {
    if index >= TOTAL_CONTROLS {
        return None;
    }
    let control = index % MAX_CONTROLS_PER_CONTROLLER;
    let pcid = index / MAX_CONTROLS_PER_CONTROLLER;
    Some((
        pcid / MAX_CONTROLLERS_PER_PORT,
        pcid % MAX_CONTROLLERS_PER_PORT,
        control,
    ))
}
