//! Savestate compatibility between two input tracks.
//!
//! A savestate taken at frame `n` fits the current movie when both tracks
//! agree on every subframe of frames `1..n` and on every value already read
//! in frame `n`. Frames past the end of a track compare as one blank sync
//! subframe.

use crate::error::{Error, Result};
use crate::frame::{ControllerFrame, FrameRef, FrameView};
use crate::poll::PollCounters;
use crate::port::TOTAL_CONTROLS;
use crate::vector::FrameVector;

pub(crate) fn check_compatible(
    old: &FrameVector,
    new: &FrameVector,
    frame: u64,
    polls: &PollCounters,
    old_project: &str,
    new_project: &str,
) -> Result<()> {
    if old_project != new_project {
        return Err(Error::MovieDesync(format!(
            "project id {old_project:?} does not match {new_project:?}"
        )));
    }
    if frame == 0 {
        return Ok(());
    }
    if !old.layout().same_shape(new.layout()) {
        return Err(Error::MovieDesync(format!(
            "port types {:?} do not match {:?}",
            old.layout().kinds(),
            new.layout().kinds()
        )));
    }

    let blank = new.blank_frame(true);
    let mut old_first = 0;
    let mut new_first = 0;
    for number in 1..frame {
        if !frames_match(old, old_first, new, new_first, &blank)? {
            return Err(Error::MovieDesync(format!("frame {number} differs")));
        }
        old_first += old.subframe_count(old_first);
        new_first += new.subframe_count(new_first);
    }

    let old_count = old.subframe_count(old_first);
    let new_count = new.subframe_count(new_first);
    for index in 0..TOTAL_CONTROLS {
        for poll in 0..polls.polls(index)? as usize {
            let old_value = polled_value(old, old_first, old_count, poll, index)?;
            let new_value = polled_value(new, new_first, new_count, poll, index)?;
            if old_value != new_value {
                return Err(Error::MovieDesync(format!(
                    "control {index} differs at poll {poll} of frame {frame}"
                )));
            }
        }
    }
    Ok(())
}

fn subframe(data: &FrameVector, first: usize, count: usize, sub: usize) -> Result<Option<FrameRef<'_>>> {
    if count == 0 {
        return Ok(None);
    }
    data.get(first + sub).map(Some)
}

fn frames_match(
    old: &FrameVector,
    old_first: usize,
    new: &FrameVector,
    new_first: usize,
    blank: &ControllerFrame,
) -> Result<bool> {
    let old_count = old.subframe_count(old_first);
    let new_count = new.subframe_count(new_first);
    let count = old_count.max(1);
    if count != new_count.max(1) {
        return Ok(false);
    }
    for sub in 0..count {
        let a = subframe(old, old_first, old_count, sub)?;
        let b = subframe(new, new_first, new_count, sub)?;
        let a = a.as_ref().map_or(blank.bytes(), |f| f.bytes());
        let b = b.as_ref().map_or(blank.bytes(), |f| f.bytes());
        if a != b {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Value that read-only playback returns for poll `poll` of `index`.
fn polled_value(data: &FrameVector, first: usize, count: usize, poll: usize, index: usize) -> Result<i16> {
    if count == 0 {
        return Ok(0);
    }
    data.get(first + poll.min(count - 1))?.axis_by_index(index)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::frame::FrameLayout;
    use crate::port::{PortKind, PortTypeRegistry};

    fn track(lines: &[&str]) -> FrameVector {
        let layout = Arc::new(
            FrameLayout::new(
                &PortTypeRegistry::with_standard_types(),
                [PortKind::GAMEPAD, PortKind::NONE],
            )
            .expect("layout"),
        );
        let mut data = FrameVector::new(Arc::clone(&layout));
        for line in lines {
            data.append(&ControllerFrame::from_text(Arc::clone(&layout), line).expect("frame"))
                .expect("append");
        }
        data
    }

    fn polls(entries: &[(usize, u32)]) -> PollCounters {
        let mut polls = PollCounters::new();
        for &(index, count) in entries {
            for _ in 0..count {
                polls.increment(index).expect("slot");
            }
        }
        polls
    }

    #[test]
    fn project_ids_must_match() {
        let data = track(&["F.|B"]);
        let err = check_compatible(&data, &data, 0, &PollCounters::new(), "a", "b");
        assert!(matches!(err, Err(Error::MovieDesync(_))));
        check_compatible(&data, &data, 0, &PollCounters::new(), "a", "a").expect("same id");
    }

    #[test]
    fn earlier_frames_must_match() {
        let old = track(&["F.|B", "F.|.Y", "F.|..s"]);
        let new = track(&["F.|B", "F.|Y", "F.|..s"]);
        check_compatible(&old, &new, 2, &PollCounters::new(), "p", "p").expect("frame 1 agrees");
        assert!(check_compatible(&old, &new, 3, &PollCounters::new(), "p", "p").is_err());
    }

    #[test]
    fn current_frame_compares_read_values_only() {
        let old = track(&["F.|B", "F.|B", "..|.Y"]);
        let new = track(&["F.|B", "F.|B", "..|..s"]);
        // frame 2, B read twice: both tracks agree
        check_compatible(&old, &new, 2, &polls(&[(0, 2)]), "p", "p").expect("B agrees");
        // Y read twice: second read differs
        assert!(check_compatible(&old, &new, 2, &polls(&[(1, 1)]), "p", "p").is_ok());
        assert!(check_compatible(&old, &new, 2, &polls(&[(1, 2)]), "p", "p").is_err());
    }

    #[test]
    fn missing_frames_compare_as_blank() {
        let old = track(&["F.|B", "F."]);
        let new = track(&["F.|B"]);
        check_compatible(&old, &new, 3, &PollCounters::new(), "p", "p").expect("blank tail");
        let old = track(&["F.|B", "F.|A"]);
        assert!(check_compatible(&old, &new, 3, &PollCounters::new(), "p", "p").is_err());
    }
}
