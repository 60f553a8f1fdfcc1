//! Source catalogs: records, sentinel filtering and a reader for SExtractor ASCII output.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Deref;
use std::path::Path;

use itertools::Itertools;
use log::debug;
use ndarray::Array1;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::SkyPosition;
use crate::{Float, lit};

/// Magnitude written by SExtractor for sources it could not measure.
pub const DEFAULT_SENTINEL: f64 = 99.0;

const RA_COLUMN: &str = "ALPHA_J2000";
const DEC_COLUMN: &str = "DELTA_J2000";
const MAG_COLUMN: &str = "MAG_APER";

/// One detected object.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceRecord<F: Float> {
    /// Sky position.
    pub position: SkyPosition<F>,
    /// Aperture magnitude, uncalibrated.
    pub magnitude: F,
}

impl<F: Float> SourceRecord<F> {
    /// Create a record from right ascension and declination in degrees and an aperture magnitude.
    pub fn new(ra: F, dec: F, magnitude: F) -> Self {
        Self {
            position: SkyPosition::new(ra, dec),
            magnitude,
        }
    }
}

/// Sources of one image in detection order.
///
/// Indices into a catalog are positions in this order, starting at 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog<F: Float> {
    records: Vec<SourceRecord<F>>,
}

impl<F: Float> Catalog<F> {
    /// Create a catalog from records in detection order.
    pub fn new(records: Vec<SourceRecord<F>>) -> Self {
        Self { records }
    }

    /// Drop every source whose magnitude is exactly `sentinel`.
    ///
    /// The order of the remaining sources is kept. Undetected sources still carry valid positions,
    /// so this has to happen before matching or they would attract spurious neighbours.
    pub fn filter_detected(&self, sentinel: F) -> Self {
        self.records
            .iter()
            .filter(|record| record.magnitude != sentinel)
            .copied()
            .collect()
    }

    /// Positions of all sources.
    pub fn positions(&self) -> Vec<SkyPosition<F>> {
        self.records.iter().map(|record| record.position).collect_vec()
    }

    /// Magnitudes of all sources.
    pub fn magnitudes(&self) -> Array1<F> {
        self.records.iter().map(|record| record.magnitude).collect()
    }

    /// Read a SExtractor ASCII catalog from a file.
    ///
    /// See [`from_sextractor`](Catalog::from_sextractor()) for the expected layout.
    pub fn read_sextractor(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading catalog {}.", path.display());
        Self::from_sextractor(BufReader::new(File::open(path)?))
    }

    /// Parse a SExtractor ASCII catalog.
    ///
    /// The header consists of lines `# <column> <NAME> [description]` with 1-based column numbers.
    /// Vector-valued parameters only list their first column; for these, the first element is used.
    /// The columns `ALPHA_J2000`, `DELTA_J2000` (degrees) and `MAG_APER` are required.
    /// Other comment lines and blank lines are skipped.
    pub fn from_sextractor<R: BufRead>(reader: R) -> Result<Self> {
        let mut columns: HashMap<String, usize> = HashMap::new();
        let mut layout = None;
        let mut records = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = number + 1;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('#') {
                let mut fields = header.split_whitespace();
                if let (Some(column), Some(name)) = (fields.next(), fields.next()) {
                    if let Ok(column) = column.parse::<usize>() {
                        columns.entry(name.to_owned()).or_insert(column);
                    }
                }
                continue;
            }

            let [ra, dec, mag] = match layout {
                Some(layout) => layout,
                None => *layout.insert(required_columns(&columns, line_number)?),
            };
            let fields = line.split_whitespace().collect_vec();
            records.push(SourceRecord::new(
                field(&fields, ra, line_number)?,
                field(&fields, dec, line_number)?,
                field(&fields, mag, line_number)?,
            ));
        }

        debug!("Parsed {} sources.", records.len());
        Ok(Self::new(records))
    }
}

/// 0-based positions of right ascension, declination and magnitude.
fn required_columns(columns: &HashMap<String, usize>, line: usize) -> Result<[usize; 3]> {
    let position = |name: &str| match columns.get(name) {
        Some(&column) if column > 0 => Ok(column - 1),
        Some(_) => Err(Error::catalog(line, format!("column {name} is numbered 0"))),
        None => Err(Error::catalog(line, format!("missing column {name} in header"))),
    };
    Ok([
        position(RA_COLUMN)?,
        position(DEC_COLUMN)?,
        position(MAG_COLUMN)?,
    ])
}

fn field<F: Float>(fields: &[&str], column: usize, line: usize) -> Result<F> {
    let raw = fields.get(column).ok_or_else(|| {
        Error::catalog(
            line,
            format!("expected at least {} fields, found {}", column + 1, fields.len()),
        )
    })?;
    raw.parse::<f64>()
        .map(lit)
        .map_err(|err| Error::catalog(line, format!("invalid number {raw:?}: {err}")))
}

impl<F: Float> Deref for Catalog<F> {
    type Target = [SourceRecord<F>];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl<F: Float> FromIterator<SourceRecord<F>> for Catalog<F> {
    fn from_iter<I: IntoIterator<Item = SourceRecord<F>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<F: Float> IntoIterator for Catalog<F> {
    type Item = SourceRecord<F>;

    type IntoIter = std::vec::IntoIter<SourceRecord<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<F: Float> From<Vec<SourceRecord<F>>> for Catalog<F> {
    fn from(records: Vec<SourceRecord<F>>) -> Self {
        Self::new(records)
    }
}
