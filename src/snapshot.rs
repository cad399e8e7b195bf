// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Histogram snapshots, so an image can be re-toned without redoing
//! the orbits.  The layout is a header (the magic bytes `BUDDHAv1`,
//! then width and height as little-endian u64s) followed by the three
//! grids in channel order, each row-major, each cell a little-endian
//! u64.  A snapshot only loads into the dimensions it was saved with,
//! and the data must be exactly the right length.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::info;

use crate::config::CHANNELS;
use crate::error::SnapshotError;
use crate::histogram::{Count, Histogram, HistogramSet};

const MAGIC: &[u8; 8] = b"BUDDHAv1";
const CELL_BYTES: usize = 8;
const HEADER_BYTES: usize = MAGIC.len() + 2 * CELL_BYTES;

/// Bytes in a snapshot of a `width` x `height` set.
pub fn snapshot_len(width: usize, height: usize) -> u64 {
    (HEADER_BYTES + CHANNELS * width * height * CELL_BYTES) as u64
}

/// Write `set` to `out`.
pub fn save<W: Write>(set: &HistogramSet, out: &mut W) -> Result<(), SnapshotError> {
    out.write_all(MAGIC)?;
    out.write_all(&(set.width() as u64).to_le_bytes())?;
    out.write_all(&(set.height() as u64).to_le_bytes())?;
    for histogram in set.channels().iter() {
        for cell in histogram.cells() {
            out.write_all(&cell.to_le_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Read a `width` x `height` set from `input`.  A snapshot saved with
/// other dimensions, or anything but exactly the right number of
/// bytes, is refused.
pub fn load<R: Read>(input: &mut R, width: usize, height: usize) -> Result<HistogramSet, SnapshotError> {
    let expected = snapshot_len(width, height);
    let mut found: u64 = 0;
    let mut buf = [0u8; CELL_BYTES];

    let mut header = [0u8; HEADER_BYTES];
    let read = read_cell(input, &mut header)?;
    found += read as u64;
    if read < HEADER_BYTES {
        return Err(SnapshotError::Truncated { expected, found });
    }
    if header[..MAGIC.len()] != MAGIC[..] {
        return Err(SnapshotError::NotASnapshot);
    }
    buf.copy_from_slice(&header[MAGIC.len()..MAGIC.len() + CELL_BYTES]);
    let found_width = u64::from_le_bytes(buf);
    buf.copy_from_slice(&header[MAGIC.len() + CELL_BYTES..]);
    let found_height = u64::from_le_bytes(buf);
    if found_width != width as u64 || found_height != height as u64 {
        return Err(SnapshotError::DimensionMismatch {
            width,
            height,
            found_width: found_width as usize,
            found_height: found_height as usize,
        });
    }

    let mut grids: Vec<Histogram> = Vec::with_capacity(CHANNELS);
    for _ in 0..CHANNELS {
        let mut cells: Vec<Count> = Vec::with_capacity(width * height);
        for _ in 0..width * height {
            let read = read_cell(input, &mut buf)?;
            found += read as u64;
            if read < CELL_BYTES {
                return Err(SnapshotError::Truncated { expected, found });
            }
            cells.push(Count::from_le_bytes(buf));
        }
        grids.push(Histogram::from_cells(width, height, cells));
    }
    if read_cell(input, &mut [0u8; 1])? != 0 {
        return Err(SnapshotError::TrailingData(expected));
    }
    let b = grids.pop();
    let g = grids.pop();
    let r = grids.pop();
    match (r, g, b) {
        (Some(r), Some(g), Some(b)) => Ok(HistogramSet::from_channels([r, g, b])),
        _ => Err(SnapshotError::Truncated { expected, found }),
    }
}

/// Fill `buf` as far as the input allows, returning how much was read.
fn read_cell<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Save `set` to the file at `path`.
pub fn save_file<P: AsRef<Path>>(set: &HistogramSet, path: P) -> Result<(), SnapshotError> {
    info!("[i] Saving r, g, b channels to {}", path.as_ref().display());
    let mut out = BufWriter::new(File::create(path)?);
    save(set, &mut out)
}

/// Load a `width` x `height` set from the file at `path`.
pub fn load_file<P: AsRef<Path>>(path: P, width: usize, height: usize) -> Result<HistogramSet, SnapshotError> {
    info!("[-] Loading visits from {}", path.as_ref().display());
    let file = File::open(path).map_err(SnapshotError::Missing)?;
    load(&mut BufReader::new(file), width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::{Pixel, PixelHit};

    fn populated() -> HistogramSet {
        let mut set = HistogramSet::new(3, 2);
        set.accumulate(&PixelHit {
            pixels: vec![Pixel(0, 0), Pixel(2, 1), Pixel(2, 1)],
            escaped_at: 40,
            channels: [true, false, true],
        });
        set.accumulate(&PixelHit {
            pixels: vec![Pixel(1, 0)],
            escaped_at: 400,
            channels: [false, true, false],
        });
        set
    }

    #[test]
    fn layout_is_channel_then_row_major() {
        let mut bytes = Vec::new();
        save(&populated(), &mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, snapshot_len(3, 2));
        assert_eq!(&bytes[..8], b"BUDDHAv1");
        assert_eq!(bytes[8], 3);
        assert_eq!(bytes[16], 2);
        let cell = |channel: usize, x: usize, y: usize| {
            let at = HEADER_BYTES + ((channel * 2 + y) * 3 + x) * CELL_BYTES;
            let mut word = [0u8; CELL_BYTES];
            word.copy_from_slice(&bytes[at..at + CELL_BYTES]);
            u64::from_le_bytes(word)
        };
        assert_eq!(cell(0, 0, 0), 1);
        assert_eq!(cell(0, 2, 1), 2);
        assert_eq!(cell(1, 1, 0), 1);
        assert_eq!(cell(1, 0, 0), 0);
        assert_eq!(cell(2, 2, 1), 2);
    }

    #[test]
    fn reload_reproduces_every_cell() {
        let set = populated();
        let mut bytes = Vec::new();
        save(&set, &mut bytes).unwrap();
        let loaded = load(&mut bytes.as_slice(), 3, 2).unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn short_data_is_truncated() {
        let mut bytes = Vec::new();
        save(&populated(), &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        match load(&mut bytes.as_slice(), 3, 2) {
            Err(SnapshotError::Truncated { expected: 168, found: 165 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn long_data_is_refused() {
        let mut bytes = Vec::new();
        save(&populated(), &mut bytes).unwrap();
        bytes.push(0);
        match load(&mut bytes.as_slice(), 3, 2) {
            Err(SnapshotError::TrailingData(168)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn other_dimensions_are_refused() {
        let mut bytes = Vec::new();
        save(&populated(), &mut bytes).unwrap();
        assert!(load(&mut bytes.as_slice(), 2, 2).is_err());
        assert!(load(&mut bytes.as_slice(), 4, 2).is_err());
    }

    #[test]
    fn transposed_dimensions_are_refused() {
        let mut set = HistogramSet::new(24, 32);
        set.accumulate(&PixelHit {
            pixels: vec![Pixel(23, 0)],
            escaped_at: 40,
            channels: [true, false, false],
        });
        let mut bytes = Vec::new();
        save(&set, &mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, snapshot_len(32, 24));
        match load(&mut bytes.as_slice(), 32, 24) {
            Err(SnapshotError::DimensionMismatch {
                width: 32,
                height: 24,
                found_width: 24,
                found_height: 32,
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(load(&mut bytes.as_slice(), 24, 32).unwrap(), set);
    }

    #[test]
    fn foreign_data_is_refused() {
        let mut bytes = Vec::new();
        save(&populated(), &mut bytes).unwrap();
        bytes[0] = b'X';
        match load(&mut bytes.as_slice(), 3, 2) {
            Err(SnapshotError::NotASnapshot) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_header_is_truncated() {
        match load(&mut &b"BUDDHAv1"[..], 3, 2) {
            Err(SnapshotError::Truncated { expected: 168, found: 8 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        match load_file(dir.path().join("nothing-here.bin"), 3, 2) {
            Err(SnapshotError::Missing(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r-g-b.bin");
        let set = populated();
        save_file(&set, &path).unwrap();
        assert_eq!(load_file(&path, 3, 2).unwrap(), set);
    }
}
