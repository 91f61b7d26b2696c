//! Glue between an emulator core and a [`Movie`].
//!
//! The core calls [`MovieLogic::new_frame_starting`] once per emulated frame
//! and [`MovieLogic::input_poll`] every time the hardware samples a control.
//! Fresh controls come from an [`InputSource`]. DRDY bits decide when a
//! poll needs a fresh sample: once a control has been read, reading it again
//! in the same frame fetches a new subframe worth of input first.

use crate::error::Result;
use crate::frame::{ControllerFrame, FrameView};
use crate::movie::Movie;

/// Supplies controller input to the movie.
pub trait InputSource {
    /// Controls for the start of a frame, or for a new subframe when
    /// `subframe` is set.
    fn update_controls(&mut self, frame_number: u64, subframe: bool) -> ControllerFrame;

    /// Chance to rewrite sampled controls before they are recorded. Only
    /// called while recording.
    fn override_controls(&mut self, _controls: &mut ControllerFrame, _subframe: bool) {}
}

#[derive(Debug)]
pub struct MovieLogic<S> {
    movie: Movie,
    source: S,
}

impl<S: InputSource> MovieLogic<S> {
    pub fn new(movie: Movie, source: S) -> Self {
        Self { movie, source }
    }

    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    pub fn movie_mut(&mut self) -> &mut Movie {
        &mut self.movie
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_parts(self) -> (Movie, S) {
        (self.movie, self.source)
    }

    fn sample(&mut self, subframe: bool) -> ControllerFrame {
        let mut controls = self
            .source
            .update_controls(self.movie.current_frame(), subframe);
        if !self.movie.readonly() {
            self.source.override_controls(&mut controls, subframe);
        }
        controls
    }

    /// Advances the movie to a new frame and returns its reset status
    /// (-1 for no reset, otherwise the reset delay).
    pub fn new_frame_starting(&mut self, dont_poll: bool) -> Result<i64> {
        self.movie.next_frame()?;
        let controls = self.sample(false);
        if !self.movie.readonly() {
            let reset = controls.reset().then(|| {
                let (hi, lo) = controls.delay();
                i64::from(hi) * 10000 + i64::from(lo)
            });
            self.movie.set_controls(controls)?;
            if !dont_poll {
                self.movie.set_all_drdy();
            }
            if let Some(delay) = reset {
                self.movie.commit_reset(delay)?;
            }
        }
        Ok(self.movie.get_reset_status())
    }

    /// Answers a hardware poll of one control.
    pub fn input_poll(&mut self, port: usize, controller: usize, control: usize) -> Result<i16> {
        if !self.movie.get_drdy_at(port, controller, control)? {
            let controls = self.sample(true);
            self.movie.set_controls(controls)?;
            self.movie.set_all_drdy();
        }
        self.movie.next_input_at(port, controller, control)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::controls::ControllerState;
    use crate::frame::{FrameLayout, FrameViewMut};
    use crate::port::{PortKind, PortTypeRegistry};

    fn layout() -> Arc<FrameLayout> {
        Arc::new(
            FrameLayout::new(
                &PortTypeRegistry::with_standard_types(),
                [PortKind::GAMEPAD, PortKind::NONE],
            )
            .expect("layout"),
        )
    }

    /// Presses B on odd frames and A on subframe samples; forces R while recording.
    struct Scripted {
        layout: Arc<FrameLayout>,
        samples: Vec<(u64, bool)>,
    }

    impl InputSource for Scripted {
        fn update_controls(&mut self, frame_number: u64, subframe: bool) -> ControllerFrame {
            self.samples.push((frame_number, subframe));
            let mut frame = ControllerFrame::new(Arc::clone(&self.layout));
            frame
                .set_axis(0, 0, 0, i16::from(frame_number % 2 == 1))
                .expect("B");
            frame.set_axis(0, 0, 8, i16::from(subframe)).expect("A");
            frame
        }

        fn override_controls(&mut self, controls: &mut ControllerFrame, _subframe: bool) {
            controls.set_axis(0, 0, 11, 1).expect("R");
        }
    }

    #[test]
    fn records_first_sample_and_subframes() {
        let layout = layout();
        let source = Scripted {
            layout: Arc::clone(&layout),
            samples: Vec::new(),
        };
        let mut logic = MovieLogic::new(Movie::new(Arc::clone(&layout)), source);

        assert_eq!(logic.new_frame_starting(false).expect("frame 1"), -1);
        assert_eq!(logic.input_poll(0, 0, 0).expect("B"), 1);
        assert_eq!(logic.input_poll(0, 0, 11).expect("R override"), 1);
        assert_eq!(logic.input_poll(0, 0, 8).expect("A"), 0);
        // B was read already, so polling it again samples a subframe
        assert_eq!(logic.input_poll(0, 0, 0).expect("B again"), 1);
        assert_eq!(logic.input_poll(0, 0, 8).expect("A again"), 1);

        let samples = &logic.source().samples;
        assert_eq!(samples, &[(1, false), (1, true)]);

        let movie = logic.movie();
        assert_eq!(movie.frame_count(), 1);
        assert_eq!(movie.data().len(), 2);
        assert_eq!(movie.data().get(1).expect("subframe").axis(0, 0, 8).expect("A"), 1);
    }

    #[test]
    fn resets_are_recorded_from_controls() {
        let layout = layout();
        let mut state = ControllerState::new(Arc::clone(&layout));
        state.reset(20_001);
        let mut logic = MovieLogic::new(Movie::new(layout), state);
        assert_eq!(logic.new_frame_starting(false).expect("frame 1"), 20_001);
        logic.source_mut().reset(-1);
        assert_eq!(logic.new_frame_starting(false).expect("frame 2"), -1);
        assert_eq!(logic.movie().lag_frames(), 0);
        // frame 2 has not been polled yet
        assert_eq!(logic.movie().frame_count(), 1);
    }

    #[test]
    fn dont_poll_leaves_drdy_clear() {
        let layout = layout();
        let state = ControllerState::new(Arc::clone(&layout));
        let mut logic = MovieLogic::new(Movie::new(layout), state);
        logic.new_frame_starting(true).expect("frame 1");
        assert!(!logic.movie().get_drdy(0).expect("slot"));
        logic.new_frame_starting(false).expect("frame 2");
        assert!(logic.movie().get_drdy(0).expect("slot"));
        let (movie, _) = logic.into_parts();
        assert_eq!(movie.lag_frames(), 1);
    }
}
