//! Camera and display state carried between runs.
//!
//! The file is plain text with one value per line: clear colour r, g, b, the
//! overlay flag as 0/1, camera position x, y, z and camera front x, y, z.
//! Reading stops at the first token that does not parse; that field and every
//! later one keep their defaults.

use std::{
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
};

use glam::Vec3;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_STATE_FILE: &str = "resources/program_state.txt";
pub const FIELD_COUNT: usize = 10;

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("reading state file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("writing state file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PersistedView {
    pub clear_color: Vec3,
    pub overlay: bool,
    pub camera_position: Vec3,
    pub camera_front: Vec3,
}

impl Default for PersistedView {
    fn default() -> Self {
        Self {
            clear_color: Vec3::ZERO,
            overlay: false,
            camera_position: Vec3::new(0.0, 0.0, 3.0),
            camera_front: Vec3::NEG_Z,
        }
    }
}

/// Result of reading the text form: the view plus how many fields parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedView {
    pub view: PersistedView,
    pub fields_read: usize,
}

impl ParsedView {
    pub fn is_complete(&self) -> bool {
        self.fields_read == FIELD_COUNT
    }
}

impl PersistedView {
    /// Missing files yield the defaults. Partially readable files, including
    /// ones that are not valid UTF-8, yield whatever parsed and log a warning.
    /// Only an I/O failure other than a missing file is an error.
    pub fn load(path: &Path) -> Result<Self, StateFileError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("no state file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StateFileError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        let parsed = Self::parse(&text);
        if !parsed.is_complete() {
            log::warn!(
                "state file {} only had {} of {} readable fields",
                path.display(),
                parsed.fields_read,
                FIELD_COUNT
            );
        }
        Ok(parsed.view)
    }

    pub fn parse(text: &str) -> ParsedView {
        let mut view = Self::default();
        let mut tokens = text.split_whitespace();
        let mut fields_read = 0;

        {
            let mut slots: [FieldSlot<'_>; FIELD_COUNT] = [
                FieldSlot::Float(&mut view.clear_color.x),
                FieldSlot::Float(&mut view.clear_color.y),
                FieldSlot::Float(&mut view.clear_color.z),
                FieldSlot::Flag(&mut view.overlay),
                FieldSlot::Float(&mut view.camera_position.x),
                FieldSlot::Float(&mut view.camera_position.y),
                FieldSlot::Float(&mut view.camera_position.z),
                FieldSlot::Float(&mut view.camera_front.x),
                FieldSlot::Float(&mut view.camera_front.y),
                FieldSlot::Float(&mut view.camera_front.z),
            ];
            for slot in slots.iter_mut() {
                let Some(token) = tokens.next() else { break };
                if !slot.fill(token) {
                    break;
                }
                fields_read += 1;
            }
        }

        ParsedView { view, fields_read }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let values = [
            self.clear_color.x,
            self.clear_color.y,
            self.clear_color.z,
        ];
        for value in values {
            let _ = writeln!(out, "{value}");
        }
        let _ = writeln!(out, "{}", u8::from(self.overlay));
        for value in self
            .camera_position
            .to_array()
            .into_iter()
            .chain(self.camera_front.to_array())
        {
            let _ = writeln!(out, "{value}");
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<(), StateFileError> {
        let write_err = |source| StateFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, self.to_text()).map_err(write_err)?;
        log::info!("saved view state to {}", path.display());
        Ok(())
    }
}

enum FieldSlot<'a> {
    Float(&'a mut f32),
    Flag(&'a mut bool),
}

impl FieldSlot<'_> {
    fn fill(&mut self, token: &str) -> bool {
        match self {
            FieldSlot::Float(value) => match token.parse::<f32>() {
                Ok(parsed) if parsed.is_finite() => {
                    **value = parsed;
                    true
                }
                _ => false,
            },
            FieldSlot::Flag(flag) => match token {
                "0" => {
                    **flag = false;
                    true
                }
                "1" => {
                    **flag = true;
                    true
                }
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let view = PersistedView::load(&dir.path().join("absent.txt"))?;
        assert_eq!(view, PersistedView::default());
        Ok(())
    }

    #[test]
    fn round_trip_preserves_camera_and_flag() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("resources").join("program_state.txt");
        let view = PersistedView {
            clear_color: Vec3::new(0.1, 0.2, 0.3),
            overlay: true,
            camera_position: Vec3::new(-12.345678, 1.5, 7.000001),
            camera_front: Vec3::new(0.70710677, -0.1, -0.70710677),
        };
        view.save(&path)?;

        let text = fs::read_to_string(&path)?;
        assert_eq!(text.lines().count(), FIELD_COUNT);
        assert_eq!(text.lines().nth(3), Some("1"));

        let loaded = PersistedView::load(&path)?;
        assert_eq!(loaded, view);
        Ok(())
    }

    #[test]
    fn truncated_text_keeps_trailing_defaults() {
        let parsed = PersistedView::parse("0.5\n0.5\n0.5\n1\n4\n5\n");
        assert_eq!(parsed.fields_read, 6);
        assert!(!parsed.is_complete());
        assert!(parsed.view.overlay);
        assert_eq!(parsed.view.camera_position, Vec3::new(4.0, 5.0, 3.0));
        assert_eq!(parsed.view.camera_front, Vec3::NEG_Z);
    }

    #[test]
    fn parsing_stops_at_first_bad_token() {
        let parsed = PersistedView::parse("0.2 0.2 oops 1 9 9 9 1 0 0");
        assert_eq!(parsed.fields_read, 2);
        assert_eq!(parsed.view.clear_color, Vec3::new(0.2, 0.2, 0.0));
        assert!(!parsed.view.overlay);
        assert_eq!(parsed.view.camera_position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn non_utf8_file_falls_back_to_what_parsed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("program_state.txt");
        fs::write(&path, b"0.1\n0.2\n\xff\xfe garbage\n")?;

        let view = PersistedView::load(&path)?;
        assert_eq!(view.clear_color, Vec3::new(0.1, 0.2, 0.0));
        assert_eq!(view.camera_position, PersistedView::default().camera_position);
        assert_eq!(view.camera_front, Vec3::NEG_Z);
        Ok(())
    }

    #[test]
    fn non_finite_values_stop_parsing() {
        for text in ["0 0 0 0 NaN 1 1 0 0 -1", "0 0 0 0 inf 1 1 0 0 -1", "0 0 0 0 -infinity 1 1 0 0 -1"] {
            let parsed = PersistedView::parse(text);
            assert_eq!(parsed.fields_read, 4, "{text}");
            assert_eq!(parsed.view.camera_position, Vec3::new(0.0, 0.0, 3.0));
        }
    }

    #[test]
    fn read_error_message_names_path_once() {
        let err = StateFileError::Read {
            path: PathBuf::from("state.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "reading state file state.txt");
    }

    #[test]
    fn overlay_flag_only_accepts_zero_or_one() {
        let parsed = PersistedView::parse("0 0 0 2 1 1 1 1 0 0");
        assert_eq!(parsed.fields_read, 3);
        assert!(!parsed.view.overlay);
    }
}
