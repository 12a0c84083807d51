//! Streaming reader for block-structured trajectory dumps.
//!
//! Each block looks like
//!
//! ```text
//! ITEM: TIMESTEP
//! 1000
//! ITEM: NUMBER OF ATOMS
//! 3
//! ITEM: BOX BOUNDS pp pp pp
//! -50.0 50.0
//! -50.0 50.0
//! -50.0 50.0
//! ITEM: ATOMS id type xs ys zs
//! 1 1 0.50 0.50 0.50
//! 2 2 0.51 0.50 0.50
//! 3 3 0.10 0.20 0.30
//! ```
//!
//! The box bounds section is optional and extra per-atom columns after the
//! three coordinates are ignored. Damage is contained to the smallest unit
//! possible: a bad atom record is skipped, a bad block is reported as a
//! [`FrameError`] and the reader moves on to the next `ITEM: TIMESTEP`.

use log::{debug, trace};
use nalgebra::Vector3;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::types::{AxisBounds, BoxBounds, CoordinateMode, Frame, Particle, ParticleKind};
use crate::error::{FrameError, PhiError};

const ITEM_PREFIX: &str = "ITEM:";
const TIMESTEP_MARKER: &str = "ITEM: TIMESTEP";
const ATOM_COUNT_MARKER: &str = "ITEM: NUMBER OF ATOMS";
const BOX_BOUNDS_MARKER: &str = "ITEM: BOX BOUNDS";
const ATOMS_MARKER: &str = "ITEM: ATOMS";

/// Atom records need at least `id type x y z`.
const MIN_ATOM_FIELDS: usize = 5;

/// Lazy frame stream over a trajectory dump.
///
/// Yields `Ok(Frame)` for every complete block and `Err(FrameError)` for
/// every dropped one. The stream is consumed once; reading the file again
/// means opening a new reader.
pub struct TrajectoryReader<R> {
    reader: R,
    buf: Vec<u8>,
    pending: Option<String>,
    line_no: usize,
    mode: CoordinateMode,
    skipped_records: usize,
    finished: bool,
}

impl TrajectoryReader<BufReader<File>> {
    pub fn open(path: &Path, mode: CoordinateMode) -> Result<Self, PhiError> {
        let file = File::open(path).map_err(|e| PhiError::io(path, e))?;
        Ok(Self::new(BufReader::new(file), mode))
    }
}

impl<R: BufRead> TrajectoryReader<R> {
    pub fn new(reader: R, mode: CoordinateMode) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pending: None,
            line_no: 0,
            mode,
            skipped_records: 0,
            finished: false,
        }
    }

    pub fn mode(&self) -> CoordinateMode {
        self.mode
    }

    /// Atom records dropped so far because they were short or malformed.
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    fn next_line(&mut self) -> Option<io::Result<String>> {
        if let Some(line) = self.pending.take() {
            return Some(Ok(line));
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no += 1;
                // Undecodable bytes become U+FFFD and fail numeric parsing downstream
                let line = String::from_utf8_lossy(&self.buf);
                Some(Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
            }
            Err(err) => Some(Err(err)),
        }
    }

    fn push_back(&mut self, line: String) {
        self.pending = Some(line);
    }

    /// Advances to the next `ITEM: TIMESTEP` marker.
    ///
    /// Returns `Ok(false)` at end of input.
    fn seek_timestep(&mut self) -> Result<bool, FrameError> {
        while let Some(line) = self.next_line() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.starts_with(TIMESTEP_MARKER) {
                return Ok(true);
            }
            if trimmed.starts_with(ITEM_PREFIX) {
                debug!(
                    "line {}: {} section outside a timestep block",
                    self.line_no,
                    section_name(trimmed)
                );
            }
        }
        Ok(false)
    }

    fn header_value(&mut self, section: &'static str) -> Result<String, FrameError> {
        match self.next_line() {
            Some(line) => Ok(line?),
            None => Err(FrameError::MalformedHeader {
                line: self.line_no,
                section,
                content: String::from("<end of input>"),
            }),
        }
    }

    fn read_box_bounds(&mut self) -> Result<BoxBounds, FrameError> {
        let mut axes = [AxisBounds::new(0.0, 0.0); 3];
        for axis in axes.iter_mut() {
            let line = self.header_value("BOX BOUNDS")?;
            *axis = parse_axis_bounds(&line).ok_or_else(|| FrameError::MalformedHeader {
                line: self.line_no,
                section: "BOX BOUNDS",
                content: line.trim().to_string(),
            })?;
        }
        Ok(BoxBounds {
            x: axes[0],
            y: axes[1],
            z: axes[2],
        })
    }

    /// Reads atom records until `expected` lines were consumed, or until the
    /// next marker when the block did not declare a count.
    fn read_atoms(
        &mut self,
        timestep: u64,
        expected: Option<usize>,
    ) -> Result<Vec<(u32, ParticleKind, Vector3<f64>)>, FrameError> {
        let mut atoms = Vec::with_capacity(expected.unwrap_or(0));
        let mut consumed = 0usize;

        loop {
            if expected == Some(consumed) {
                break;
            }
            let line = match self.next_line() {
                Some(line) => line?,
                None => break,
            };
            if line.trim_start().starts_with(ITEM_PREFIX) {
                self.push_back(line);
                break;
            }
            consumed += 1;
            match parse_atom_record(&line) {
                Some(atom) => atoms.push(atom),
                None => {
                    self.skipped_records += 1;
                    trace!("line {}: skipping atom record '{}'", self.line_no, line.trim());
                }
            }
        }

        match expected {
            Some(n) if consumed < n => Err(FrameError::Truncated {
                timestep,
                expected: n,
                found: consumed,
            }),
            _ => Ok(atoms),
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if !self.seek_timestep()? {
            return Ok(None);
        }

        let value = self.header_value("TIMESTEP")?;
        let timestep: u64 = value.trim().parse().map_err(|_| FrameError::MalformedHeader {
            line: self.line_no,
            section: "TIMESTEP",
            content: value.trim().to_string(),
        })?;

        let mut atom_count: Option<usize> = None;
        let mut box_bounds: Option<BoxBounds> = None;

        loop {
            let line = match self.next_line() {
                Some(line) => line?,
                None => {
                    return Err(FrameError::Truncated {
                        timestep,
                        expected: atom_count.unwrap_or(0),
                        found: 0,
                    })
                }
            };
            let trimmed = line.trim();

            if trimmed.starts_with(ATOM_COUNT_MARKER) {
                let value = self.header_value("NUMBER OF ATOMS")?;
                let count = value.trim().parse().map_err(|_| FrameError::MalformedHeader {
                    line: self.line_no,
                    section: "NUMBER OF ATOMS",
                    content: value.trim().to_string(),
                })?;
                atom_count = Some(count);
            } else if trimmed.starts_with(BOX_BOUNDS_MARKER) {
                box_bounds = Some(self.read_box_bounds()?);
            } else if trimmed.starts_with(ATOMS_MARKER) {
                let atoms = self.read_atoms(timestep, atom_count)?;
                return self.build_frame(timestep, box_bounds, atoms).map(Some);
            } else if trimmed.starts_with(TIMESTEP_MARKER) {
                self.push_back(line);
                return Err(FrameError::Truncated {
                    timestep,
                    expected: atom_count.unwrap_or(0),
                    found: 0,
                });
            } else if trimmed.starts_with(ITEM_PREFIX) {
                debug!("line {}: ignoring section '{}'", self.line_no, trimmed);
            }
        }
    }

    fn build_frame(
        &self,
        timestep: u64,
        box_bounds: Option<BoxBounds>,
        atoms: Vec<(u32, ParticleKind, Vector3<f64>)>,
    ) -> Result<Frame, FrameError> {
        let particles = match self.mode {
            CoordinateMode::Raw => atoms
                .into_iter()
                .map(|(id, kind, pos)| Particle::new(id, kind, pos))
                .collect(),
            CoordinateMode::BoxScaled => {
                let bounds = box_bounds.ok_or(FrameError::MissingBoxBounds { timestep })?;
                atoms
                    .into_iter()
                    .map(|(id, kind, pos)| Particle::new(id, kind, bounds.unscale(pos)))
                    .collect()
            }
            CoordinateMode::FixedBox(side) => atoms
                .into_iter()
                .map(|(id, kind, pos)| Particle::new(id, kind, pos * side))
                .collect(),
        };

        Ok(Frame {
            timestep,
            box_bounds,
            particles,
        })
    }
}

impl<R: BufRead> Iterator for TrajectoryReader<R> {
    type Item = Result<Frame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                if !err.is_recoverable() {
                    self.finished = true;
                }
                Some(Err(err))
            }
        }
    }
}

fn section_name(marker: &str) -> &'static str {
    if marker.starts_with(ATOM_COUNT_MARKER) {
        "NUMBER OF ATOMS"
    } else if marker.starts_with(BOX_BOUNDS_MARKER) {
        "BOX BOUNDS"
    } else if marker.starts_with(ATOMS_MARKER) {
        "ATOMS"
    } else {
        "unknown"
    }
}

/// `low high [tilt]`; `None` unless both bounds are finite.
fn parse_axis_bounds(line: &str) -> Option<AxisBounds> {
    let mut fields = line.split_whitespace();
    let low: f64 = fields.next()?.parse().ok()?;
    let high: f64 = fields.next()?.parse().ok()?;
    if !(low.is_finite() && high.is_finite()) {
        return None;
    }
    Some(AxisBounds::new(low, high))
}

/// `id type x y z [extra...]`; `None` for short or malformed records.
fn parse_atom_record(line: &str) -> Option<(u32, ParticleKind, Vector3<f64>)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_ATOM_FIELDS {
        return None;
    }
    let id: u32 = fields[0].parse().ok()?;
    let type_id: u32 = fields[1].parse().ok()?;
    let x: f64 = fields[2].parse().ok()?;
    let y: f64 = fields[3].parse().ok()?;
    let z: f64 = fields[4].parse().ok()?;
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return None;
    }
    Some((id, ParticleKind::from(type_id), Vector3::new(x, y, z)))
}
