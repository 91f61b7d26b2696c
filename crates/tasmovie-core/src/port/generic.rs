//! Table-driven codec shared by every built-in port type.
//!
//! Storage layout for `c` controllers with `a` axes and `b` buttons each:
//!
//! ```text
//! [axis 0 of controller 0: i16 BE][axis 1 ...]...[axis a-1 of controller c-1]
//! [button bitfield: c * b bits, LSB first, controller-major]
//! ```
//!
//! Control numbering puts axes first (`0..a`) and buttons after (`a..a+b`).
//! The text form puts buttons first and axes after, one `|` per controller.

use std::fmt::Write as _;

use crate::error::Result;
use crate::port::Consumed;
use crate::text::FieldReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericLayout {
    pub controllers: usize,
    pub axes: usize,
    pub buttons: usize,
}

impl GenericLayout {
    pub const fn new(controllers: usize, axes: usize, buttons: usize) -> Self {
        Self {
            controllers,
            axes,
            buttons,
        }
    }

    pub const fn storage_size(&self) -> usize {
        2 * self.controllers * self.axes + (self.controllers * self.buttons).div_ceil(8)
    }

    pub const fn controls(&self) -> usize {
        self.axes + self.buttons
    }

    #[inline]
    fn axis_offset(&self, controller: usize, axis: usize) -> usize {
        2 * controller * self.axes + 2 * axis
    }

    #[inline]
    fn button_bit(&self, controller: usize, button: usize) -> usize {
        16 * self.controllers * self.axes + controller * self.buttons + button
    }

    fn get_axis(&self, buf: &[u8], controller: usize, axis: usize) -> i16 {
        let at = self.axis_offset(controller, axis);
        i16::from_be_bytes([buf[at], buf[at + 1]])
    }

    fn put_axis(&self, buf: &mut [u8], controller: usize, axis: usize, value: i16) {
        let at = self.axis_offset(controller, axis);
        buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }

    fn get_button(&self, buf: &[u8], controller: usize, button: usize) -> bool {
        let bit = self.button_bit(controller, button);
        buf[bit / 8] & (1 << (bit % 8)) != 0
    }

    fn put_button(&self, buf: &mut [u8], controller: usize, button: usize, pressed: bool) {
        let bit = self.button_bit(controller, button);
        if pressed {
            buf[bit / 8] |= 1 << (bit % 8);
        } else {
            buf[bit / 8] &= !(1 << (bit % 8));
        }
    }

    pub fn write(&self, buf: &mut [u8], controller: usize, control: usize, value: i16) {
        if controller >= self.controllers {
            return;
        }
        if control < self.axes {
            self.put_axis(buf, controller, control, value);
        } else if control < self.controls() {
            self.put_button(buf, controller, control - self.axes, value != 0);
        }
    }

    pub fn read(&self, buf: &[u8], controller: usize, control: usize) -> i16 {
        if controller >= self.controllers {
            return 0;
        }
        if control < self.axes {
            self.get_axis(buf, controller, control)
        } else if control < self.controls() {
            i16::from(self.get_button(buf, controller, control - self.axes))
        } else {
            0
        }
    }

    pub fn display(&self, buf: &[u8], controller: usize, symbols: &[u8]) -> String {
        let mut out = String::new();
        if controller >= self.controllers {
            return out;
        }
        for axis in 0..self.axes {
            let _ = write!(out, "{} ", self.get_axis(buf, controller, axis));
        }
        for button in 0..self.buttons {
            out.push(if self.get_button(buf, controller, button) {
                char::from(symbols[button])
            } else {
                '-'
            });
        }
        out
    }

    pub fn serialize(&self, buf: &[u8], symbols: &[u8], out: &mut String) {
        for controller in 0..self.controllers {
            out.push('|');
            for button in 0..self.buttons {
                out.push(if self.get_button(buf, controller, button) {
                    char::from(symbols[button])
                } else {
                    '.'
                });
            }
            for axis in 0..self.axes {
                let _ = write!(out, " {}", self.get_axis(buf, controller, axis));
            }
        }
    }

    pub fn deserialize(&self, buf: &mut [u8], text: &[u8]) -> Result<Consumed> {
        if self.controllers == 0 {
            return Ok(Consumed::Blank);
        }
        buf[..self.storage_size()].fill(0);
        let mut reader = FieldReader::new(text);
        for controller in 0..self.controllers {
            for button in 0..self.buttons {
                if reader.read_button() {
                    self.put_button(buf, controller, button, true);
                }
            }
            for axis in 0..self.axes {
                let value = reader.read_axis()?;
                self.put_axis(buf, controller, axis, value);
            }
            reader.finish_field(controller + 1 < self.controllers)?;
        }
        Ok(Consumed::Bytes(reader.pos()))
    }
}
