//! Catalog of port types available to a session.
//!
//! The registry is built once at startup and handed by reference to whatever
//! needs to turn a [`PortKind`] or a port type name into its behavior.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::frame::{MAX_FRAME_SIZE, SYSTEM_BYTES};
use crate::port::{
    MAX_CONTROLLERS_PER_PORT, MAX_CONTROLS_PER_CONTROLLER, PortKind, PortType, StandardPort,
};

#[derive(Debug, Clone, Default)]
pub struct PortTypeRegistry {
    types: Vec<Arc<dyn PortType>>,
}

impl PortTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every [`StandardPort`].
    pub fn with_standard_types() -> Self {
        let types = StandardPort::ALL
            .into_iter()
            .map(|port| Arc::new(port) as Arc<dyn PortType>)
            .collect();
        Self { types }
    }

    /// Adds a port type. Kinds and names must be unique, and the type has to
    /// fit the fixed control address space and frame capacity.
    pub fn register(&mut self, port_type: Arc<dyn PortType>) -> Result<()> {
        if self
            .types
            .iter()
            .any(|t| t.kind() == port_type.kind() || t.name() == port_type.name())
        {
            return Err(Error::DuplicatePortType(port_type.name().to_string()));
        }
        if port_type.controllers() > MAX_CONTROLLERS_PER_PORT {
            return Err(Error::out_of_range(
                "controller",
                port_type.controllers(),
                MAX_CONTROLLERS_PER_PORT,
            ));
        }
        if port_type.controls() > MAX_CONTROLS_PER_CONTROLLER {
            return Err(Error::out_of_range(
                "control",
                port_type.controls(),
                MAX_CONTROLS_PER_CONTROLLER,
            ));
        }
        // Any two registered types must fit side by side in one frame.
        let capacity = (MAX_FRAME_SIZE - SYSTEM_BYTES) / 2;
        if port_type.storage_size() > capacity {
            return Err(Error::FrameTooLarge {
                size: port_type.storage_size(),
                capacity,
            });
        }
        debug!(
            kind = port_type.kind().0,
            name = port_type.name(),
            size = port_type.storage_size(),
            "registered port type"
        );
        self.types.push(port_type);
        Ok(())
    }

    /// Removes a port type, returning it if it was registered.
    pub fn unregister(&mut self, kind: PortKind) -> Option<Arc<dyn PortType>> {
        let index = self.types.iter().position(|t| t.kind() == kind)?;
        Some(self.types.remove(index))
    }

    pub fn lookup(&self, kind: PortKind) -> Result<Arc<dyn PortType>> {
        self.types
            .iter()
            .find(|t| t.kind() == kind)
            .cloned()
            .ok_or_else(|| Error::UnknownPortType(kind.to_string()))
    }

    pub fn lookup_name(&self, name: &str) -> Result<Arc<dyn PortType>> {
        self.types
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| Error::UnknownPortType(name.to_string()))
    }

    /// Looks up `kind` and checks that it may occupy `port`.
    pub fn lookup_for_port(&self, kind: PortKind, port: usize) -> Result<Arc<dyn PortType>> {
        let port_type = self.lookup(kind)?;
        if !port_type.legal(port) {
            return Err(Error::IllegalPortType { port, kind });
        }
        Ok(port_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PortType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{Consumed, DeviceType, GenericLayout, LogicalButton};

    /// A two-paddle port used to exercise custom registration.
    #[derive(Debug)]
    struct Paddles;

    const PADDLES: GenericLayout = GenericLayout::new(2, 1, 1);

    impl PortType for Paddles {
        fn kind(&self) -> PortKind {
            PortKind(100)
        }
        fn name(&self) -> &str {
            "paddles"
        }
        fn storage_size(&self) -> usize {
            PADDLES.storage_size()
        }
        fn controllers(&self) -> usize {
            PADDLES.controllers
        }
        fn controls(&self) -> usize {
            PADDLES.controls()
        }
        fn legal(&self, port: usize) -> bool {
            port == 0
        }
        fn write(&self, buf: &mut [u8], controller: usize, control: usize, value: i16) {
            PADDLES.write(buf, controller, control, value)
        }
        fn read(&self, buf: &[u8], controller: usize, control: usize) -> i16 {
            PADDLES.read(buf, controller, control)
        }
        fn display(&self, buf: &[u8], controller: usize) -> String {
            PADDLES.display(buf, controller, b"F")
        }
        fn serialize(&self, buf: &[u8], out: &mut String) {
            PADDLES.serialize(buf, b"F", out)
        }
        fn deserialize(&self, buf: &mut [u8], text: &[u8]) -> Result<Consumed> {
            PADDLES.deserialize(buf, text)
        }
        fn device_type(&self, controller: usize) -> DeviceType {
            if controller < 2 {
                DeviceType::Mouse
            } else {
                DeviceType::None
            }
        }
        fn button_id(&self, _controller: usize, button: LogicalButton) -> Option<usize> {
            (button == LogicalButton::Trigger).then_some(1)
        }
    }

    #[test]
    fn standard_lookup_by_kind_and_name() {
        let registry = PortTypeRegistry::with_standard_types();
        assert_eq!(registry.len(), 7);
        let pad = registry.lookup(PortKind::GAMEPAD).expect("gamepad");
        assert_eq!(pad.name(), "gamepad");
        let scope = registry.lookup_name("superscope").expect("superscope");
        assert_eq!(scope.kind(), PortKind::SUPERSCOPE);
        assert!(matches!(
            registry.lookup(PortKind(99)),
            Err(Error::UnknownPortType(_))
        ));
        assert!(matches!(
            registry.lookup_name("keyboard"),
            Err(Error::UnknownPortType(_))
        ));
    }

    #[test]
    fn lookup_for_port_enforces_legality() {
        let registry = PortTypeRegistry::with_standard_types();
        assert!(matches!(
            registry.lookup_for_port(PortKind::JUSTIFIER, 0),
            Err(Error::IllegalPortType { port: 0, .. })
        ));
        assert!(registry.lookup_for_port(PortKind::JUSTIFIER, 1).is_ok());
    }

    #[test]
    fn register_and_unregister_custom_type() {
        let mut registry = PortTypeRegistry::with_standard_types();
        registry.register(Arc::new(Paddles)).expect("register");
        assert_eq!(
            registry.lookup_name("paddles").expect("paddles").kind(),
            PortKind(100)
        );
        assert!(matches!(
            registry.register(Arc::new(Paddles)),
            Err(Error::DuplicatePortType(_))
        ));
        assert!(registry.unregister(PortKind(100)).is_some());
        assert!(registry.lookup(PortKind(100)).is_err());
        assert!(registry.unregister(PortKind(100)).is_none());
    }
}
