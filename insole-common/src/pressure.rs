// Pressure payload decoding
// The sensor sole packs two 12-bit samples into every three bytes

use ndarray::Array2;

use crate::error::DecodeError;

/// Bytes the sensor sends per frame
pub const SENSOR_FRAME_LEN: usize = 5404;
/// Bytes of the frame that carry samples; the trailing bytes are ignored
pub const PAYLOAD_LEN: usize = 5400;
/// Cells along each side of the sensor grid
pub const GRID_SIZE: usize = 60;
/// Samples in a full grid
pub const SAMPLE_COUNT: usize = GRID_SIZE * GRID_SIZE;
/// Largest value a 12-bit sample can hold
pub const MAX_PRESSURE: u16 = 0x0FFF;

/// 60×60 grid of per-cell pressure readings, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressureMatrix {
    cells: Array2<u16>,
}

impl PressureMatrix {
    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u16> {
        self.cells.get((row, col)).copied()
    }

    /// Highest reading in the grid
    pub fn max(&self) -> u16 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// All readings in row-major order
    pub fn values(&self) -> impl Iterator<Item = u16> + '_ {
        self.cells.iter().copied()
    }

    pub fn as_array(&self) -> &Array2<u16> {
        &self.cells
    }
}

/// Decode a raw sensor payload into a pressure matrix
///
/// Each 3-byte group `(b0, b1, b2)` yields `(b0 << 4) | (b1 >> 4)` followed by
/// `((b1 & 0x0F) << 8) | b2`. Only the first [`PAYLOAD_LEN`] bytes are read.
pub fn decode_pressure(payload: &[u8]) -> Result<PressureMatrix, DecodeError> {
    let payload = &payload[..payload.len().min(PAYLOAD_LEN)];

    let mut samples = Vec::with_capacity(SAMPLE_COUNT);
    for group in payload.chunks_exact(3) {
        let (b0, b1, b2) = (u16::from(group[0]), u16::from(group[1]), u16::from(group[2]));
        samples.push((b0 << 4) | (b1 >> 4));
        samples.push(((b1 & 0x0F) << 8) | b2);
    }

    if samples.len() < SAMPLE_COUNT {
        return Err(DecodeError::shortfall(SAMPLE_COUNT, samples.len()));
    }

    let cells = Array2::from_shape_vec((GRID_SIZE, GRID_SIZE), samples)?;
    Ok(PressureMatrix { cells })
}
