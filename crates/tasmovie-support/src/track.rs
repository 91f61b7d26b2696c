//! Plain-text input tracks.
//!
//! A track starts with `key value` header lines, followed by one frame per
//! line in the controller frame text format:
//!
//! ```text
//! # comment
//! port0 gamepad
//! port1 none
//! projectid 5f3c...
//! rerecords 12
//! F.|B.......A...
//! ..|.Y..........
//! ```
//!
//! Frame lines start with `F` (first subframe of a frame) or `.`. Blank lines
//! and `#` comments are skipped anywhere. Headers may not follow frames.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tasmovie_core::movie::check_rerecord_count;
use tasmovie_core::port::MAX_PORTS;
use tasmovie_core::{
    ControllerFrame, FrameLayout, FrameVector, FrameView, Movie, PortKind, PortType,
    PortTypeRegistry,
};
use tracing::debug;

use crate::error::SupportError;

/// Metadata and subframes of an input track.
#[derive(Debug, Clone)]
pub struct MovieDocument {
    pub project_id: String,
    pub rerecords: String,
    pub frames: FrameVector,
}

impl MovieDocument {
    /// Empty document with the given port types.
    pub fn new(
        registry: &PortTypeRegistry,
        ports: [PortKind; MAX_PORTS],
    ) -> Result<Self, SupportError> {
        let layout = Arc::new(FrameLayout::new(registry, ports)?);
        Ok(Self {
            project_id: String::new(),
            rerecords: "0".to_string(),
            frames: FrameVector::new(layout),
        })
    }

    /// Snapshot of a movie's track and metadata.
    pub fn from_movie(movie: &Movie) -> Self {
        Self {
            project_id: movie.project_id().to_string(),
            rerecords: movie.rerecord_count().to_string(),
            frames: movie.save(),
        }
    }

    pub fn layout(&self) -> &Arc<FrameLayout> {
        self.frames.layout()
    }

    /// Port types, as fixed by the frame layout.
    pub fn ports(&self) -> [PortKind; MAX_PORTS] {
        self.frames.layout().kinds()
    }

    /// Loads the document into a fresh read-only movie at frame 0.
    pub fn into_movie(self) -> Result<Movie, SupportError> {
        let mut movie = Movie::new(Arc::clone(self.frames.layout()));
        movie.load(self.rerecords, self.project_id, self.frames)?;
        Ok(movie)
    }
}

#[derive(Debug)]
struct Header {
    ports: [PortKind; MAX_PORTS],
    project_id: String,
    rerecords: String,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            ports: [PortKind::GAMEPAD, PortKind::NONE],
            project_id: String::new(),
            rerecords: "0".to_string(),
        }
    }
}

fn invalid(line: usize, reason: impl Into<String>) -> SupportError {
    SupportError::InvalidTrack {
        line,
        reason: reason.into(),
    }
}

fn install_value(
    registry: &PortTypeRegistry,
    header: &mut Header,
    line: usize,
    key: &str,
    value: &str,
) -> Result<(), SupportError> {
    match key {
        "port0" | "port1" => {
            let port = usize::from(key == "port1");
            let port_type = registry
                .lookup_name(value)
                .map_err(|err| invalid(line, err.to_string()))?;
            header.ports[port] = port_type.kind();
        }
        "projectid" => header.project_id = value.to_string(),
        "rerecords" => {
            check_rerecord_count(value).map_err(|err| invalid(line, err.to_string()))?;
            header.rerecords = value.to_string();
        }
        _ => {
            return Err(SupportError::UnknownHeaderKey {
                line,
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

fn is_frame_line(line: &str) -> bool {
    matches!(line.as_bytes().first(), Some(b'F' | b'.'))
}

/// Parses a text input track.
pub fn read_track<R: BufRead>(
    registry: &PortTypeRegistry,
    reader: R,
) -> Result<MovieDocument, SupportError> {
    let mut header = Header::default();
    let mut frames: Option<FrameVector> = None;

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        if is_frame_line(line) {
            let data = match frames {
                Some(ref mut data) => data,
                None => {
                    let layout = FrameLayout::new(registry, header.ports)
                        .map_err(|err| invalid(line_number, err.to_string()))?;
                    frames.insert(FrameVector::new(Arc::new(layout)))
                }
            };
            let frame = ControllerFrame::from_text(Arc::clone(data.layout()), line)
                .map_err(|err| invalid(line_number, err.to_string()))?;
            if data.is_empty() && !frame.sync() {
                return Err(invalid(line_number, "first frame line must start with F"));
            }
            data.append(&frame)?;
            continue;
        }

        if frames.is_some() {
            return Err(invalid(line_number, "header line after frame data"));
        }
        let (key, value) = match line.split_once([' ', '\t']) {
            Some((key, value)) => (key, value.trim()),
            None => (line.trim(), ""),
        };
        install_value(registry, &mut header, line_number, key, value)?;
    }

    let frames = match frames {
        Some(frames) => frames,
        None => FrameVector::new(Arc::new(FrameLayout::new(registry, header.ports)?)),
    };
    debug!(
        subframes = frames.len(),
        frames = frames.count_frames(),
        ports = ?header.ports,
        "read input track"
    );
    Ok(MovieDocument {
        project_id: header.project_id,
        rerecords: header.rerecords,
        frames,
    })
}

/// Writes `document` in the format [`read_track`] accepts.
pub fn write_track<W: Write>(document: &MovieDocument, mut writer: W) -> Result<(), SupportError> {
    check_rerecord_count(&document.rerecords)?;
    let layout = document.frames.layout();
    for port in 0..MAX_PORTS {
        writeln!(writer, "port{port} {}", layout.port(port)?.name())?;
    }
    if !document.project_id.is_empty() {
        writeln!(writer, "projectid {}", document.project_id)?;
    }
    writeln!(writer, "rerecords {}", document.rerecords)?;
    for frame in document.frames.iter() {
        writeln!(writer, "{}", frame.serialize_text())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PortTypeRegistry {
        PortTypeRegistry::with_standard_types()
    }

    #[test]
    fn header_defaults() {
        let doc = read_track(&registry(), "F.|B...........\n".as_bytes()).expect("track");
        assert_eq!(doc.ports(), [PortKind::GAMEPAD, PortKind::NONE]);
        assert_eq!(doc.rerecords, "0");
        assert!(doc.project_id.is_empty());
        assert_eq!(doc.frames.len(), 1);
    }

    #[test]
    fn headers_after_frames_are_rejected() {
        let text = "F.|B...........\nrerecords 3\n";
        let err = read_track(&registry(), text.as_bytes()).expect_err("late header");
        assert!(matches!(err, SupportError::InvalidTrack { line: 2, .. }));
    }

    #[test]
    fn unknown_keys_are_reported() {
        let err = read_track(&registry(), "emulator lsnes\n".as_bytes()).expect_err("key");
        match err {
            SupportError::UnknownHeaderKey { line, key } => {
                assert_eq!(line, 1);
                assert_eq!(key, "emulator");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rerecords_must_be_decimal() {
        let err = read_track(&registry(), "rerecords 1e3\n".as_bytes()).expect_err("count");
        assert!(matches!(err, SupportError::InvalidTrack { line: 1, .. }));
    }

    #[test]
    fn junk_rerecord_count_is_not_written() {
        let mut doc = read_track(&registry(), "F.|B...........\n".as_bytes()).expect("track");
        doc.rerecords = "12 more".to_string();
        let mut out = Vec::new();
        let err = write_track(&doc, &mut out).expect_err("rerecords");
        assert!(matches!(
            err,
            SupportError::Core(tasmovie_core::Error::BadRerecordCount(_))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn port_types_are_checked_for_legality() {
        let err = read_track(&registry(), "port0 superscope\nF.\n".as_bytes())
            .expect_err("superscope on port 0");
        assert!(matches!(err, SupportError::InvalidTrack { line: 2, .. }));
        let err = read_track(&registry(), "port1 joystick\n".as_bytes()).expect_err("name");
        assert!(matches!(err, SupportError::InvalidTrack { line: 1, .. }));
    }
}
