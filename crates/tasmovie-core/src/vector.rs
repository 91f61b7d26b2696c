//! Paged storage for the subframes of a movie.
//!
//! Frames are packed back to back into fixed-size pages; a frame never
//! straddles two pages. Page `n` holds frames
//! `n * frames_per_page .. (n + 1) * frames_per_page`, and pages are resident
//! exactly for the prefix of the vector that is in use. Bytes past the last
//! frame of the last page are always zero, which is what makes growing by
//! `resize` cheap.

mod page;

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::config::PageConfig;
use crate::error::{Error, Result};
use crate::frame::{ControllerFrame, FrameLayout, FrameMut, FrameRef, FrameView, FrameViewMut, SystemFlags};

use page::Page;

#[derive(Clone)]
pub struct FrameVector {
    layout: Arc<FrameLayout>,
    config: PageConfig,
    frame_size: usize,
    frames_per_page: usize,
    frames: usize,
    pages: Vec<Page>,
}

impl FrameVector {
    /// Empty vector with the default page size.
    pub fn new(layout: Arc<FrameLayout>) -> Self {
        let config = PageConfig::default();
        let frame_size = layout.size();
        Self {
            frames_per_page: config.page_size / frame_size,
            layout,
            config,
            frame_size,
            frames: 0,
            pages: Vec::new(),
        }
    }

    pub fn with_config(layout: Arc<FrameLayout>, config: PageConfig) -> Result<Self> {
        let mut vector = Self::new(layout);
        vector.config = config;
        vector.set_layout(Arc::clone(&vector.layout))?;
        Ok(vector)
    }

    pub fn layout(&self) -> &Arc<FrameLayout> {
        &self.layout
    }

    pub fn config(&self) -> PageConfig {
        self.config
    }

    /// Number of subframes stored.
    pub fn len(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn frames_per_page(&self) -> usize {
        self.frames_per_page
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Drops every frame.
    pub fn clear(&mut self) {
        self.frames = 0;
        self.pages.clear();
    }

    /// Drops every frame and switches to a new frame shape.
    pub fn set_layout(&mut self, layout: Arc<FrameLayout>) -> Result<()> {
        let frame_size = layout.size();
        if self.config.page_size < frame_size {
            return Err(Error::FrameTooLarge {
                size: frame_size,
                capacity: self.config.page_size,
            });
        }
        self.clear();
        self.frames_per_page = self.config.page_size / frame_size;
        self.frame_size = frame_size;
        self.layout = layout;
        Ok(())
    }

    /// Zero-filled frame of this vector's shape.
    pub fn blank_frame(&self, sync: bool) -> ControllerFrame {
        let mut frame = ControllerFrame::new(Arc::clone(&self.layout));
        frame.set_sync(sync);
        frame
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, usize) {
        (
            index / self.frames_per_page,
            (index % self.frames_per_page) * self.frame_size,
        )
    }

    fn check_page_limit(&self, extra: usize) -> Result<()> {
        match self.config.page_limit {
            Some(limit) if self.pages.len() + extra > limit => {
                Err(Error::AllocationFailed { pages: extra })
            }
            _ => Ok(()),
        }
    }

    pub fn get(&self, index: usize) -> Result<FrameRef<'_>> {
        if index >= self.frames {
            return Err(Error::out_of_range("frame", index, self.frames));
        }
        let (page, offset) = self.locate(index);
        FrameRef::new(
            &self.layout,
            &self.pages[page][offset..offset + self.frame_size],
        )
    }

    pub fn get_mut(&mut self, index: usize) -> Result<FrameMut<'_>> {
        if index >= self.frames {
            return Err(Error::out_of_range("frame", index, self.frames));
        }
        let (page, offset) = self.locate(index);
        FrameMut::new(
            &self.layout,
            &mut self.pages[page][offset..offset + self.frame_size],
        )
    }

    pub fn last(&self) -> Option<FrameRef<'_>> {
        self.frames.checked_sub(1).and_then(|i| self.get(i).ok())
    }

    /// Overwrites frame `index` with `frame`, which must have the same shape.
    pub fn set<F: FrameView + ?Sized>(&mut self, index: usize, frame: &F) -> Result<()> {
        self.get_mut(index)?.assign(frame)
    }

    pub fn append<F: FrameView + ?Sized>(&mut self, frame: &F) -> Result<()> {
        if !self.layout.same_shape(frame.layout()) {
            return Err(Error::TypeMismatch);
        }
        let (page, offset) = self.locate(self.frames);
        if page == self.pages.len() {
            self.check_page_limit(1)?;
            self.pages.push(Page::try_new(self.config.page_size)?);
        }
        self.pages[page][offset..offset + self.frame_size].copy_from_slice(frame.bytes());
        self.frames += 1;
        Ok(())
    }

    /// Sets the number of frames. New frames are zero-filled; on allocation
    /// failure the vector is left as it was.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        if size == self.frames {
            return Ok(());
        }
        if size == 0 {
            self.clear();
            return Ok(());
        }
        let needed = size.div_ceil(self.frames_per_page);
        if size < self.frames {
            self.pages.truncate(needed);
            let tail = size % self.frames_per_page;
            if tail != 0
                && let Some(last) = self.pages.last_mut()
            {
                last[tail * self.frame_size..].fill(0);
            }
        } else {
            let missing = needed.saturating_sub(self.pages.len());
            let mut fresh = Vec::new();
            fresh
                .try_reserve_exact(missing)
                .map_err(|_| Error::AllocationFailed { pages: missing })?;
            for _ in 0..missing {
                let page = self
                    .check_page_limit(fresh.len() + 1)
                    .and_then(|()| Page::try_new(self.config.page_size));
                match page {
                    Ok(page) => fresh.push(page),
                    Err(_) => {
                        warn!(
                            allocated = fresh.len(),
                            missing,
                            frames = self.frames,
                            requested = size,
                            "frame page growth failed, rolling back"
                        );
                        return Err(Error::AllocationFailed { pages: missing });
                    }
                }
            }
            self.pages.append(&mut fresh);
        }
        self.frames = size;
        Ok(())
    }

    #[inline]
    fn sync_at(&self, index: usize) -> bool {
        let (page, offset) = self.locate(index);
        self.pages[page][offset] & SystemFlags::SYNC.bits() != 0
    }

    /// Index of the first sync subframe after `index`, or `len()` when there
    /// is none. Indices at or past the end are returned unchanged.
    pub fn walk_sync(&self, index: usize) -> usize {
        if index >= self.frames {
            return index;
        }
        (index + 1..self.frames)
            .find(|&i| self.sync_at(i))
            .unwrap_or(self.frames)
    }

    /// Number of subframes in the frame starting at `index`; 0 past the end.
    pub fn subframe_count(&self, index: usize) -> usize {
        self.walk_sync(index) - index
    }

    /// Number of logical frames, i.e. subframes with the sync flag.
    pub fn count_frames(&self) -> usize {
        (0..self.frames).filter(|&i| self.sync_at(i)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = FrameRef<'_>> {
        (0..self.frames).map_while(|i| self.get(i).ok())
    }
}

impl PartialEq for FrameVector {
    fn eq(&self, other: &Self) -> bool {
        self.layout.same_shape(&other.layout)
            && self.frames == other.frames
            && self.iter().zip(other.iter()).all(|(a, b)| a.bytes() == b.bytes())
    }
}

impl Eq for FrameVector {}

impl fmt::Debug for FrameVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameVector")
            .field("types", &self.layout.kinds())
            .field("frames", &self.frames)
            .field("pages", &self.pages.len())
            .finish()
    }
}
