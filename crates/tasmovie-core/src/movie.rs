//! The record / playback state machine.
//!
//! A movie is a [`FrameVector`] of subframes plus a cursor. Frames are
//! numbered from 1; frame 0 means nothing has run yet. In read-only mode
//! polls are answered from the recorded subframes. In read-write mode the
//! current frame is always the last one in the vector and polls record the
//! current controls, appending subframes as needed.
//!
//! Within a frame, poll `n` of a control reads subframe `n` of that frame.
//! Polling more often than there are subframes keeps returning the last one.

mod compat;
mod state;

use std::cell::Cell;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::MovieConfig;
use crate::error::{Error, Result};
use crate::frame::{ControllerFrame, FrameLayout, FrameView, FrameViewMut};
use crate::poll::PollCounters;
use crate::port::{PortTypeRegistry, TOTAL_CONTROLS, control_index};
use crate::vector::FrameVector;

pub use state::MovieState;

/// Position remembered by [`Movie::frame_subframes`] / [`Movie::read_subframe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadCursor {
    frame: u64,
    first_subframe: usize,
}

impl ReadCursor {
    const START: ReadCursor = ReadCursor {
        frame: 1,
        first_subframe: 0,
    };
}

#[derive(Debug, Clone)]
pub struct Movie {
    readonly: bool,
    rerecords: String,
    project_id: String,
    data: FrameVector,
    current_frame: u64,
    first_subframe: usize,
    polls: PollCounters,
    current_controls: ControllerFrame,
    lag_frames: u64,
    frames_in_movie: u64,
    cursor: Cell<ReadCursor>,
}

impl Movie {
    /// Empty read-write movie of the given shape.
    pub fn new(layout: Arc<FrameLayout>) -> Self {
        Self::from_vector(FrameVector::new(layout))
    }

    pub fn with_config(registry: &PortTypeRegistry, config: &MovieConfig) -> Result<Self> {
        let layout = Arc::new(FrameLayout::new(registry, config.ports)?);
        Ok(Self::from_vector(FrameVector::with_config(layout, config.pages)?))
    }

    fn from_vector(data: FrameVector) -> Self {
        Self {
            readonly: false,
            rerecords: "0".to_string(),
            project_id: String::new(),
            current_controls: data.blank_frame(false),
            data,
            current_frame: 0,
            first_subframe: 0,
            polls: PollCounters::new(),
            lag_frames: 0,
            frames_in_movie: 0,
            cursor: Cell::new(ReadCursor::START),
        }
    }

    pub fn layout(&self) -> &Arc<FrameLayout> {
        self.data.layout()
    }

    /// The recorded subframes.
    pub fn data(&self) -> &FrameVector {
        &self.data
    }

    pub fn readonly(&self) -> bool {
        self.readonly
    }

    pub fn rerecord_count(&self) -> &str {
        &self.rerecords
    }

    /// Replaces the rerecord count, which must be a non-empty decimal number.
    pub fn set_rerecord_count(&mut self, count: impl Into<String>) -> Result<()> {
        let count = count.into();
        check_rerecord_count(&count)?;
        self.rerecords = count;
        Ok(())
    }

    /// Adds one to the decimal rerecord count. A count that is not a decimal
    /// number restarts at 1.
    pub fn bump_rerecord_count(&mut self) {
        self.rerecords = increment_decimal(&self.rerecords);
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn set_project_id(&mut self, id: impl Into<String>) {
        self.project_id = id.into();
    }

    /// Number of logical frames in the movie.
    pub fn frame_count(&self) -> u64 {
        self.frames_in_movie
    }

    /// Current frame, counted from 1. 0 before the first [`next_frame`](Self::next_frame).
    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Index of the first subframe of the current frame.
    pub fn current_first_subframe(&self) -> usize {
        self.first_subframe
    }

    pub fn lag_frames(&self) -> u64 {
        self.lag_frames
    }

    pub fn poll_counters(&self) -> &PollCounters {
        &self.polls
    }

    /// Subframes of the frame starting at `first`; 0 past the end.
    #[inline]
    fn count_changes(&self, first: usize) -> usize {
        self.data.subframe_count(first)
    }

    fn invalidate_cursor(&self) {
        self.cursor.set(ReadCursor::START);
    }

    /// Switches between playback and recording.
    ///
    /// Entering read-write mode cuts the movie at the furthest subframe that
    /// has been read in the current frame, so nothing the user has not
    /// played yet survives.
    pub fn set_readonly(&mut self, readonly: bool) -> Result<()> {
        let was_readonly = self.readonly;
        self.readonly = readonly;
        if !was_readonly || readonly {
            return Ok(());
        }
        self.invalidate_cursor();
        if let Err(err) = self.truncate_for_recording() {
            self.readonly = true;
            return Err(err);
        }
        debug!(
            frame = self.current_frame,
            subframes = self.data.len(),
            frames = self.frames_in_movie,
            "entered read-write mode"
        );
        Ok(())
    }

    fn truncate_for_recording(&mut self) -> Result<()> {
        if self.current_frame == 0 {
            self.data.clear();
            self.frames_in_movie = 0;
            return Ok(());
        }

        // Past the end: pad with blank frames up to the current one.
        if self.first_subframe >= self.data.len() {
            let blank = self.data.blank_frame(true);
            let mut frames = self.frames_in_movie;
            let before = self.data.len();
            while frames < self.current_frame {
                if let Err(err) = self.data.append(&blank) {
                    self.data.resize(before)?;
                    return Err(err);
                }
                frames += 1;
            }
            self.frames_in_movie = frames;
            self.first_subframe = self.data.len().saturating_sub(1);
        }

        let first = self.first_subframe;
        let next_frame_first = first + self.count_changes(first);
        // A reset already handed to the emulator belongs to the played past.
        let mut readable = (first + usize::from(self.polls.system())).min(next_frame_first);
        for index in 0..TOTAL_CONTROLS {
            let polls = self.polls.polls(index)? as usize;
            if first + polls >= next_frame_first {
                readable = next_frame_first;
            } else if first + polls > readable {
                readable = first + polls;
            }
        }
        self.data.resize(readable)?;

        // Controls polled fewer times than the kept subframes keep their
        // last read value in the later ones.
        for index in 0..TOTAL_CONTROLS {
            let polls = (self.polls.polls(index)? as usize).max(1);
            let source = first + polls - 1;
            if source >= readable {
                continue;
            }
            let value = self.data.get(source)?.axis_by_index(index)?;
            for subframe in first + polls..readable {
                self.data.get_mut(subframe)?.set_axis_by_index(index, value)?;
            }
        }

        let past_end = u64::from(self.first_subframe >= self.data.len());
        self.frames_in_movie = self.current_frame - past_end;
        debug!(subframes = readable, "truncated movie for recording");
        Ok(())
    }

    /// Moves on to the next frame.
    pub fn next_frame(&mut self) -> Result<()> {
        if self.current_frame > 0 && !self.polls.has_polled() {
            self.lag_frames += 1;
            trace!(frame = self.current_frame, lag = self.lag_frames, "lag frame");
        }
        if !self.readonly && self.current_frame > 0 && self.first_subframe >= self.data.len() {
            // A recorded frame always has at least one subframe.
            self.data.append(&self.current_controls.copy(true))?;
            self.frames_in_movie += 1;
        }
        self.polls.clear();
        self.first_subframe = if self.current_frame > 0 {
            self.first_subframe + self.count_changes(self.first_subframe)
        } else {
            0
        };
        self.current_frame += 1;
        Ok(())
    }

    pub fn get_drdy(&self, index: usize) -> Result<bool> {
        self.polls.get_drdy(index)
    }

    pub fn get_drdy_at(&self, port: usize, controller: usize, control: usize) -> Result<bool> {
        self.get_drdy(control_index(port, controller, control)?)
    }

    pub fn set_all_drdy(&mut self) {
        self.polls.set_all_drdy();
    }

    /// Highest poll count of the current frame plus one.
    pub fn next_poll_number(&self) -> u32 {
        self.polls.max_polls() + 1
    }

    /// Answers one poll of control `index` for the current frame.
    pub fn next_input(&mut self, index: usize) -> Result<i16> {
        if self.current_frame == 0 {
            return Err(Error::BeforeMovieStart);
        }
        if index >= TOTAL_CONTROLS {
            return Err(Error::InvalidControlIndex(index));
        }
        self.polls.clear_drdy(index)?;
        let first = self.first_subframe;

        if self.readonly {
            if first >= self.data.len() {
                // Past the end of the movie everything is released.
                self.polls.increment(index)?;
                return Ok(0);
            }
            let changes = self.count_changes(first);
            let polls = self.polls.increment(index)? as usize;
            let offset = if changes > polls { polls } else { changes - 1 };
            return self.data.get(first + offset)?.axis_by_index(index);
        }

        if first >= self.data.len() {
            self.data.append(&self.current_controls.copy(true))?;
            self.frames_in_movie += 1;
            self.polls.increment(index)?;
            return self.data.get(first)?.axis_by_index(index);
        }

        let value = self.current_controls.axis_by_index(index)?;
        let target = first + self.polls.polls(index)? as usize;
        let len = self.data.len();
        if target < len {
            for subframe in target..len {
                self.data.get_mut(subframe)?.set_axis_by_index(index, value)?;
            }
        } else {
            let last = self.data.get(len - 1)?.to_owned_frame();
            if last.axis_by_index(index)? != value {
                let filler = last.copy(false);
                while self.data.len() <= target {
                    self.data.append(&filler)?;
                }
                self.data.get_mut(target)?.set_axis_by_index(index, value)?;
            }
        }
        self.polls.increment(index)?;
        Ok(value)
    }

    pub fn next_input_at(&mut self, port: usize, controller: usize, control: usize) -> Result<i16> {
        self.next_input(control_index(port, controller, control)?)
    }

    /// Sets the controls recorded by polls in read-write mode.
    pub fn set_controls(&mut self, controls: ControllerFrame) -> Result<()> {
        if !controls.types_match(&self.current_controls) {
            return Err(Error::TypeMismatch);
        }
        self.current_controls = controls;
        Ok(())
    }

    pub fn get_controls(&self) -> &ControllerFrame {
        &self.current_controls
    }

    /// Installs a new input track. The movie ends up read-only at frame 0.
    pub fn load(
        &mut self,
        rerecords: impl Into<String>,
        project_id: impl Into<String>,
        data: FrameVector,
    ) -> Result<()> {
        if let Ok(first) = data.get(0)
            && !first.sync()
        {
            return Err(Error::MissingInitialSync);
        }
        let rerecords = rerecords.into();
        check_rerecord_count(&rerecords)?;
        self.invalidate_cursor();
        self.rerecords = rerecords;
        self.project_id = project_id.into();
        self.current_frame = 0;
        self.first_subframe = 0;
        self.polls.clear();
        self.lag_frames = 0;
        self.current_controls = data.blank_frame(false);
        self.frames_in_movie = data.count_frames() as u64;
        self.data = data;
        self.readonly = true;
        debug!(
            frames = self.frames_in_movie,
            subframes = self.data.len(),
            rerecords = %self.rerecords,
            "loaded movie"
        );
        Ok(())
    }

    /// Copy of the input track.
    pub fn save(&self) -> FrameVector {
        self.data.clone()
    }

    pub fn save_state(&self) -> MovieState {
        MovieState {
            project_id: self.project_id.clone(),
            current_frame: self.current_frame,
            lag_frames: self.lag_frames,
            poll_counters: self.polls.save_state(),
        }
    }

    /// Rewinds to a saved position.
    ///
    /// With `old_movie` (the track stored alongside the savestate and its
    /// project id) the restore only goes ahead when that track agrees with
    /// this one on everything played up to the saved position.
    pub fn restore_state(
        &mut self,
        state: &MovieState,
        readonly: bool,
        old_movie: Option<(&FrameVector, &str)>,
    ) -> Result<()> {
        PollCounters::check(&state.poll_counters)?;
        let mut polls = PollCounters::new();
        polls.load_state(&state.poll_counters)?;
        if let Some((old, old_id)) = old_movie
            && let Err(err) = compat::check_compatible(
                old,
                &self.data,
                state.current_frame,
                &polls,
                old_id,
                &self.project_id,
            )
        {
            warn!(frame = state.current_frame, %err, "savestate rejected");
            return Err(err);
        }

        let mut first = 0;
        for _ in 1..state.current_frame {
            first += self.count_changes(first);
        }
        let previous = (
            self.readonly,
            self.current_frame,
            self.first_subframe,
            self.lag_frames,
            self.frames_in_movie,
            std::mem::replace(&mut self.polls, polls),
        );
        self.invalidate_cursor();
        self.readonly = true;
        self.current_frame = state.current_frame;
        self.first_subframe = first;
        self.lag_frames = state.lag_frames;
        if let Err(err) = self.set_readonly(readonly) {
            (
                self.readonly,
                self.current_frame,
                self.first_subframe,
                self.lag_frames,
                self.frames_in_movie,
                self.polls,
            ) = previous;
            warn!(frame = state.current_frame, %err, "savestate restore rolled back");
            return Err(err);
        }
        Ok(())
    }

    /// Reset request of the current frame: -1 for none, otherwise the delay.
    /// Handing out a reset counts as polling the system state.
    pub fn get_reset_status(&mut self) -> i64 {
        if self.current_frame == 0 {
            return -1;
        }
        let delay = match self.data.get(self.first_subframe) {
            Ok(frame) if frame.reset() => {
                let (hi, lo) = frame.delay();
                i64::from(hi) * 10000 + i64::from(lo)
            }
            _ => return -1,
        };
        self.polls.set_system();
        delay
    }

    /// Records a reset with the given delay on the current frame. Ignored in
    /// read-only mode and for negative delays.
    pub fn commit_reset(&mut self, delay: i64) -> Result<()> {
        if self.readonly || delay < 0 {
            return Ok(());
        }
        if self.current_frame == 0 {
            return Err(Error::BeforeMovieStart);
        }
        if self.first_subframe >= self.data.len() {
            self.data.append(&self.current_controls.copy(true))?;
            self.frames_in_movie += 1;
        }
        let hi = i16::try_from(delay / 10000).unwrap_or(i16::MAX);
        // below 10000
        let lo = (delay % 10000) as i16;
        let mut frame = self.data.get_mut(self.first_subframe)?;
        frame.set_reset(true);
        frame.set_delay((hi, lo));
        self.polls.set_system();
        Ok(())
    }

    /// Walks the read cursor to `frame` and returns its first subframe.
    fn seek(&self, frame: u64) -> usize {
        let mut cursor = self.cursor.get();
        if frame < cursor.frame {
            cursor = ReadCursor::START;
        }
        while cursor.frame < frame {
            cursor.first_subframe += self.count_changes(cursor.first_subframe);
            cursor.frame += 1;
        }
        self.cursor.set(cursor);
        cursor.first_subframe
    }

    /// Number of subframes of `frame` (counted from 1); 0 outside the movie.
    pub fn frame_subframes(&self, frame: u64) -> usize {
        if frame == 0 {
            return 0;
        }
        self.count_changes(self.seek(frame))
    }

    /// Subframe `subframe` of `frame`, clamped to the last one. Outside the
    /// movie this is a blank sync frame.
    pub fn read_subframe(&self, frame: u64, subframe: usize) -> ControllerFrame {
        if frame == 0 {
            return self.data.blank_frame(true);
        }
        let first = self.seek(frame);
        let count = self.count_changes(first);
        if count == 0 {
            return self.data.blank_frame(true);
        }
        self.data
            .get(first + subframe.min(count - 1))
            .map_or_else(|_| self.data.blank_frame(true), |f| f.to_owned_frame())
    }
}

/// Rejects rerecord counts that are not a non-empty decimal number.
pub fn check_rerecord_count(count: &str) -> Result<()> {
    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::BadRerecordCount(count.to_string()));
    }
    Ok(())
}

/// Adds one to a decimal string of any length.
fn increment_decimal(count: &str) -> String {
    if check_rerecord_count(count).is_err() {
        return "1".to_string();
    }
    let mut digits = count.as_bytes().to_vec();
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return String::from_utf8_lossy(&digits).into_owned();
        }
    }
    let mut out = String::with_capacity(digits.len() + 1);
    out.push('1');
    out.push_str(&String::from_utf8_lossy(&digits));
    out
}
