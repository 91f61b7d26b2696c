use core::ops::{Deref, DerefMut};

use crate::error::{Error, Result};

/// One fixed-size, zero-initialized block of frame storage.
#[repr(transparent)]
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Page(Box<[u8]>);

impl Page {
    /// Allocates a zeroed page, reporting allocator failure instead of
    /// aborting.
    pub(crate) fn try_new(size: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| Error::AllocationFailed { pages: 1 })?;
        bytes.resize(size, 0);
        Ok(Self(bytes.into_boxed_slice()))
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl Deref for Page {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl DerefMut for Page {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl core::fmt::Debug for Page {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Page").field("len", &self.0.len()).finish()
    }
}
