use crate::port::{MAX_PORTS, PortKind};

/// Bytes per page of the frame vector.
pub const DEFAULT_PAGE_SIZE: usize = 65500;

/// Storage tuning for a [`FrameVector`](crate::vector::FrameVector).
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageConfig {
    /// Size of one page in bytes. Must hold at least one frame.
    pub page_size: usize,
    /// Maximum number of resident pages. Growing past it fails with
    /// [`Error::AllocationFailed`](crate::Error::AllocationFailed).
    pub page_limit: Option<usize>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_limit: None,
        }
    }
}

/// Settings for a new [`Movie`](crate::movie::Movie).
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieConfig {
    pub pages: PageConfig,
    /// Port types the empty movie starts with.
    pub ports: [PortKind; MAX_PORTS],
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            pages: PageConfig::default(),
            ports: [PortKind::GAMEPAD, PortKind::NONE],
        }
    }
}

impl MovieConfig {
    pub fn with_ports(mut self, ports: [PortKind; MAX_PORTS]) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.pages.page_size = page_size;
        self
    }

    pub fn with_page_limit(mut self, limit: Option<usize>) -> Self {
        self.pages.page_limit = limit;
        self
    }
}
