//! Built-in SNES port types.

use crate::error::Result;
use crate::port::{Consumed, DeviceType, GenericLayout, LogicalButton, PortKind, PortType};

/// Button symbols shared by all built-in types; each type takes a window.
const SYMBOLS: &[u8; 18] = b"BYsSudlrAXLRTSTCUP";

/// Gamepad control order: B Y select start up down left right A X L R.
const GAMEPAD_BUTTONS: [(LogicalButton, usize); 12] = [
    (LogicalButton::B, 0),
    (LogicalButton::Y, 1),
    (LogicalButton::Select, 2),
    (LogicalButton::Start, 3),
    (LogicalButton::Up, 4),
    (LogicalButton::Down, 5),
    (LogicalButton::Left, 6),
    (LogicalButton::Right, 7),
    (LogicalButton::A, 8),
    (LogicalButton::X, 9),
    (LogicalButton::L, 10),
    (LogicalButton::R, 11),
];

const MOUSE_BUTTONS: [(LogicalButton, usize); 2] = [(LogicalButton::L, 2), (LogicalButton::R, 3)];

const SUPERSCOPE_BUTTONS: [(LogicalButton, usize); 4] = [
    (LogicalButton::Trigger, 2),
    (LogicalButton::Cursor, 3),
    (LogicalButton::Turbo, 4),
    (LogicalButton::Pause, 5),
];

const JUSTIFIER_BUTTONS: [(LogicalButton, usize); 2] =
    [(LogicalButton::Trigger, 2), (LogicalButton::Start, 3)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardPort {
    None,
    Gamepad,
    Multitap,
    Mouse,
    Superscope,
    Justifier,
    Justifiers,
}

impl StandardPort {
    pub const ALL: [StandardPort; 7] = [
        StandardPort::None,
        StandardPort::Gamepad,
        StandardPort::Multitap,
        StandardPort::Mouse,
        StandardPort::Superscope,
        StandardPort::Justifier,
        StandardPort::Justifiers,
    ];

    pub fn from_kind(kind: PortKind) -> Option<Self> {
        Self::ALL.into_iter().find(|port| port.port_kind() == kind)
    }

    pub const fn port_kind(self) -> PortKind {
        match self {
            StandardPort::None => PortKind::NONE,
            StandardPort::Gamepad => PortKind::GAMEPAD,
            StandardPort::Multitap => PortKind::MULTITAP,
            StandardPort::Mouse => PortKind::MOUSE,
            StandardPort::Superscope => PortKind::SUPERSCOPE,
            StandardPort::Justifier => PortKind::JUSTIFIER,
            StandardPort::Justifiers => PortKind::JUSTIFIERS,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            StandardPort::None => "none",
            StandardPort::Gamepad => "gamepad",
            StandardPort::Multitap => "multitap",
            StandardPort::Mouse => "mouse",
            StandardPort::Superscope => "superscope",
            StandardPort::Justifier => "justifier",
            StandardPort::Justifiers => "justifiers",
        }
    }

    pub const fn layout(self) -> GenericLayout {
        match self {
            StandardPort::None => GenericLayout::new(0, 0, 0),
            StandardPort::Gamepad => GenericLayout::new(1, 0, 12),
            StandardPort::Multitap => GenericLayout::new(4, 0, 12),
            StandardPort::Mouse => GenericLayout::new(1, 2, 2),
            StandardPort::Superscope => GenericLayout::new(1, 2, 4),
            StandardPort::Justifier => GenericLayout::new(1, 2, 2),
            StandardPort::Justifiers => GenericLayout::new(2, 2, 2),
        }
    }

    fn symbols(self) -> &'static [u8] {
        let start = match self {
            StandardPort::None | StandardPort::Gamepad | StandardPort::Multitap => 0,
            StandardPort::Mouse => 10,
            StandardPort::Justifier | StandardPort::Justifiers => 12,
            StandardPort::Superscope => 14,
        };
        &SYMBOLS[start..start + self.layout().buttons]
    }

    /// Bit `n` set means the type may sit on port `n`.
    const fn legal_mask(self) -> u32 {
        match self {
            StandardPort::Superscope | StandardPort::Justifier | StandardPort::Justifiers => 0b10,
            _ => 0b11,
        }
    }

    fn device(self) -> DeviceType {
        match self {
            StandardPort::None => DeviceType::None,
            StandardPort::Gamepad | StandardPort::Multitap => DeviceType::Gamepad,
            StandardPort::Mouse => DeviceType::Mouse,
            StandardPort::Superscope | StandardPort::Justifier | StandardPort::Justifiers => {
                DeviceType::Lightgun
            }
        }
    }

    fn button_table(self) -> &'static [(LogicalButton, usize)] {
        match self {
            StandardPort::None => &[],
            StandardPort::Gamepad | StandardPort::Multitap => &GAMEPAD_BUTTONS,
            StandardPort::Mouse => &MOUSE_BUTTONS,
            StandardPort::Superscope => &SUPERSCOPE_BUTTONS,
            StandardPort::Justifier | StandardPort::Justifiers => &JUSTIFIER_BUTTONS,
        }
    }
}

impl PortType for StandardPort {
    fn kind(&self) -> PortKind {
        self.port_kind()
    }

    fn name(&self) -> &str {
        StandardPort::name(*self)
    }

    fn storage_size(&self) -> usize {
        self.layout().storage_size()
    }

    fn controllers(&self) -> usize {
        self.layout().controllers
    }

    fn controls(&self) -> usize {
        self.layout().controls()
    }

    fn legal(&self, port: usize) -> bool {
        let port = port.min(u32::BITS as usize - 1);
        (self.legal_mask() >> port) & 1 != 0
    }

    fn write(&self, buf: &mut [u8], controller: usize, control: usize, value: i16) {
        self.layout().write(buf, controller, control, value);
    }

    fn read(&self, buf: &[u8], controller: usize, control: usize) -> i16 {
        self.layout().read(buf, controller, control)
    }

    fn display(&self, buf: &[u8], controller: usize) -> String {
        self.layout().display(buf, controller, self.symbols())
    }

    fn serialize(&self, buf: &[u8], out: &mut String) {
        self.layout().serialize(buf, self.symbols(), out);
    }

    fn deserialize(&self, buf: &mut [u8], text: &[u8]) -> Result<Consumed> {
        self.layout().deserialize(buf, text)
    }

    fn device_type(&self, controller: usize) -> DeviceType {
        if controller < self.layout().controllers {
            self.device()
        } else {
            DeviceType::None
        }
    }

    fn button_id(&self, controller: usize, button: LogicalButton) -> Option<usize> {
        if controller >= self.layout().controllers {
            return None;
        }
        self.button_table()
            .iter()
            .find(|(logical, _)| *logical == button)
            .map(|&(_, physical)| physical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_fit_the_largest_pairing() {
        // multitap on port 0 plus justifiers on port 1 is the largest frame
        assert_eq!(StandardPort::Multitap.storage_size(), 6);
        assert_eq!(StandardPort::Justifiers.storage_size(), 9);
        assert_eq!(StandardPort::Mouse.storage_size(), 5);
        assert_eq!(StandardPort::None.storage_size(), 0);
    }

    #[test]
    fn lightguns_only_on_second_port() {
        for port in [
            StandardPort::Superscope,
            StandardPort::Justifier,
            StandardPort::Justifiers,
        ] {
            assert!(!port.legal(0));
            assert!(port.legal(1));
        }
        assert!(StandardPort::Gamepad.legal(0));
        assert!(StandardPort::Mouse.legal(1));
        assert!(!StandardPort::Superscope.legal(usize::MAX));
    }

    #[test]
    fn button_ids() {
        let pad = StandardPort::Gamepad;
        assert_eq!(pad.button_id(0, LogicalButton::Left), Some(6));
        assert_eq!(pad.button_id(0, LogicalButton::A), Some(8));
        assert_eq!(pad.button_id(0, LogicalButton::Trigger), None);
        assert_eq!(pad.button_id(1, LogicalButton::A), None);
        assert_eq!(
            StandardPort::Multitap.button_id(3, LogicalButton::Start),
            Some(3)
        );
        assert_eq!(
            StandardPort::Superscope.button_id(0, LogicalButton::Pause),
            Some(5)
        );
        assert_eq!(StandardPort::Mouse.button_id(0, LogicalButton::R), Some(3));
    }

    #[test]
    fn device_types() {
        assert_eq!(StandardPort::Multitap.device_type(3), DeviceType::Gamepad);
        assert_eq!(StandardPort::Multitap.device_type(4), DeviceType::None);
        assert_eq!(StandardPort::Justifiers.device_type(1), DeviceType::Lightgun);
        assert!(StandardPort::Mouse.is_mouse(0));
        assert!(StandardPort::Superscope.is_analog(0));
        assert!(!StandardPort::Gamepad.is_analog(0));
    }

    #[test]
    fn gamepad_symbols() {
        let mut buf = [0u8; 2];
        for control in 0..12 {
            StandardPort::Gamepad.write(&mut buf, 0, control, 1);
        }
        let mut out = String::new();
        StandardPort::Gamepad.serialize(&buf, &mut out);
        assert_eq!(out, "|BYsSudlrAXLR");
        assert_eq!(StandardPort::Superscope.symbols(), b"TCUP");
        assert_eq!(StandardPort::Mouse.symbols(), b"LR");
    }
}
