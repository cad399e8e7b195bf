// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visit counts.  One histogram per color channel, each the size of
//! the output image.  For concurrent accumulation the set is cut into
//! bands of whole rows; every band borrows its rows mutably, so two
//! accumulators can never write the same cell.

use itertools::izip;

use crate::config::CHANNELS;
use crate::error::SnapshotError;
use crate::planes::{Pixel, PixelHit};

/// A single histogram cell.  Wide enough for any budget the
/// configuration accepts.
pub type Count = u64;

/// A row-major grid of visit counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    width: usize,
    height: usize,
    cells: Vec<Count>,
}

impl Histogram {
    /// A zero-filled histogram.
    pub fn new(width: usize, height: usize) -> Self {
        Histogram {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    /// Wraps existing row-major counts.  `cells` must hold exactly
    /// `width * height` counts.
    pub(crate) fn from_cells(width: usize, height: usize, cells: Vec<Count>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Histogram { width, height, cells }
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The count at `pixel`.
    pub fn get(&self, pixel: Pixel) -> Count {
        self.cells[pixel.1 * self.width + pixel.0]
    }

    /// All counts, row-major.
    pub fn cells(&self) -> &[Count] {
        &self.cells
    }

    /// The largest count.
    pub fn max(&self) -> Count {
        self.cells.iter().cloned().max().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> Count {
        self.cells.iter().sum()
    }

    fn increment(&mut self, pixel: Pixel) {
        let cell = &mut self.cells[pixel.1 * self.width + pixel.0];
        *cell = cell.saturating_add(1);
    }
}

/// How a set of histograms is split into bands of rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BandLayout {
    /// Rows in every band but possibly the last.
    pub rows_per_band: usize,
    /// Number of bands.
    pub count: usize,
}

impl BandLayout {
    /// Split `height` rows into at most `shards` bands of nearly equal
    /// size.  No band is ever empty.
    pub fn new(height: usize, shards: usize) -> Self {
        let shards = shards.max(1).min(height.max(1));
        let rows_per_band = ((height + shards - 1) / shards).max(1);
        BandLayout {
            rows_per_band,
            count: (height + rows_per_band - 1) / rows_per_band,
        }
    }

    /// The band that owns row `y`.
    pub fn band_of(&self, y: usize) -> usize {
        y / self.rows_per_band
    }

    /// Split a hit into one part per band, dropping empty parts.
    pub fn split(&self, hit: PixelHit) -> Vec<(usize, PixelHit)> {
        if self.count == 1 {
            return vec![(0, hit)];
        }
        let mut parts: Vec<PixelHit> = (0..self.count).map(|_| hit.empty_like()).collect();
        for pixel in hit.pixels {
            parts[self.band_of(pixel.1)].pixels.push(pixel);
        }
        parts
            .into_iter()
            .enumerate()
            .filter(|(_, part)| !part.pixels.is_empty())
            .collect()
    }
}

/// One histogram per channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistogramSet {
    channels: [Histogram; CHANNELS],
}

impl HistogramSet {
    /// Zero-filled histograms for an image of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        HistogramSet {
            channels: [
                Histogram::new(width, height),
                Histogram::new(width, height),
                Histogram::new(width, height),
            ],
        }
    }

    pub(crate) fn from_channels(channels: [Histogram; CHANNELS]) -> Self {
        HistogramSet { channels }
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.channels[0].width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.channels[0].height
    }

    /// The histogram for `channel`.
    pub fn channel(&self, channel: usize) -> &Histogram {
        &self.channels[channel]
    }

    /// All histograms, in channel order.
    pub fn channels(&self) -> &[Histogram; CHANNELS] {
        &self.channels
    }

    /// Fail unless these histograms are `width` x `height`.
    pub fn check_dimensions(&self, width: usize, height: usize) -> Result<(), SnapshotError> {
        if self.width() != width || self.height() != height {
            return Err(SnapshotError::DimensionMismatch {
                width,
                height,
                found_width: self.width(),
                found_height: self.height(),
            });
        }
        Ok(())
    }

    /// Count every pixel of `hit` in every channel it was routed to.
    pub fn accumulate(&mut self, hit: &PixelHit) {
        for (histogram, &routed) in self.channels.iter_mut().zip(hit.channels.iter()) {
            if routed {
                for &pixel in &hit.pixels {
                    histogram.increment(pixel);
                }
            }
        }
    }

    /// Cut every channel into the bands of `layout`.  Band `n` of the
    /// result holds rows `n * rows_per_band ..` of all three channels.
    pub fn bands_mut(&mut self, layout: BandLayout) -> Vec<BandSet<'_>> {
        let width = self.width();
        let chunk = layout.rows_per_band * width;
        let [ref mut r, ref mut g, ref mut b] = self.channels;
        izip!(
            r.cells.chunks_mut(chunk),
            g.cells.chunks_mut(chunk),
            b.cells.chunks_mut(chunk)
        )
        .enumerate()
        .map(|(n, (r, g, b))| BandSet {
            first_row: n * layout.rows_per_band,
            width,
            cells: [r, g, b],
        })
        .collect()
    }
}

/// A band of rows from all three channels, borrowed for writing.
#[derive(Debug)]
pub struct BandSet<'a> {
    first_row: usize,
    width: usize,
    cells: [&'a mut [Count]; CHANNELS],
}

impl<'a> BandSet<'a> {
    /// First row of the band.
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    /// Number of rows in the band.
    pub fn rows(&self) -> usize {
        self.cells[0].len() / self.width.max(1)
    }

    fn owns_row(&self, y: usize) -> bool {
        y >= self.first_row && y < self.first_row + self.rows()
    }

    /// As `HistogramSet::accumulate`.  Every pixel of `hit` must lie in
    /// this band.
    pub fn accumulate(&mut self, hit: &PixelHit) {
        let first_row = self.first_row;
        let width = self.width;
        let rows = self.rows();
        for (cells, &routed) in self.cells.iter_mut().zip(hit.channels.iter()) {
            if routed {
                for pixel in &hit.pixels {
                    debug_assert!(pixel.1 >= first_row && pixel.1 < first_row + rows);
                    let cell = &mut cells[(pixel.1 - first_row) * width + pixel.0];
                    *cell = cell.saturating_add(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(pixels: &[(usize, usize)], channels: [bool; CHANNELS]) -> PixelHit {
        PixelHit {
            pixels: pixels.iter().map(|&(x, y)| Pixel(x, y)).collect(),
            escaped_at: 30,
            channels,
        }
    }

    fn sample_hits() -> Vec<PixelHit> {
        vec![
            hit(&[(0, 0), (1, 1), (1, 1)], [true, false, false]),
            hit(&[(3, 4), (2, 2)], [true, true, false]),
            hit(&[(4, 0)], [false, false, true]),
            hit(&[(1, 1), (0, 4), (3, 3)], [false, true, true]),
            hit(&[(2, 3)], [true, true, true]),
        ]
    }

    #[test]
    fn new_histograms_are_zero() {
        let set = HistogramSet::new(5, 3);
        assert_eq!(set.width(), 5);
        assert_eq!(set.height(), 3);
        for histogram in set.channels().iter() {
            assert_eq!(histogram.cells().len(), 15);
            assert_eq!(histogram.max(), 0);
        }
    }

    #[test]
    fn accumulate_counts_routed_channels_only() {
        let mut set = HistogramSet::new(5, 5);
        for h in sample_hits() {
            set.accumulate(&h);
        }
        assert_eq!(set.channel(0).get(Pixel(1, 1)), 2);
        assert_eq!(set.channel(1).get(Pixel(1, 1)), 1);
        assert_eq!(set.channel(2).get(Pixel(1, 1)), 1);
        assert_eq!(set.channel(0).get(Pixel(4, 0)), 0);
        assert_eq!(set.channel(2).get(Pixel(4, 0)), 1);
        assert_eq!(set.channel(0).total(), 6);
        assert_eq!(set.channel(1).total(), 6);
        assert_eq!(set.channel(2).total(), 5);
        assert_eq!(set.channel(0).max(), 2);
    }

    #[test]
    fn accumulation_is_order_independent() {
        let hits = sample_hits();
        let mut forward = HistogramSet::new(5, 5);
        for h in hits.iter() {
            forward.accumulate(h);
        }
        let mut backward = HistogramSet::new(5, 5);
        for h in hits.iter().rev() {
            backward.accumulate(h);
        }
        let mut interleaved = HistogramSet::new(5, 5);
        for &i in [3, 0, 4, 2, 1].iter() {
            interleaved.accumulate(&hits[i]);
        }
        assert_eq!(forward, backward);
        assert_eq!(forward, interleaved);
    }

    #[test]
    fn band_layout_covers_every_row() {
        assert_eq!(BandLayout::new(64, 1), BandLayout { rows_per_band: 64, count: 1 });
        assert_eq!(BandLayout::new(64, 3), BandLayout { rows_per_band: 22, count: 3 });
        assert_eq!(BandLayout::new(5, 4), BandLayout { rows_per_band: 2, count: 3 });
        assert_eq!(BandLayout::new(3, 10), BandLayout { rows_per_band: 1, count: 3 });
        let layout = BandLayout::new(64, 3);
        assert_eq!(layout.band_of(0), 0);
        assert_eq!(layout.band_of(21), 0);
        assert_eq!(layout.band_of(22), 1);
        assert_eq!(layout.band_of(63), 2);
    }

    #[test]
    fn split_sends_each_pixel_to_its_band() {
        let layout = BandLayout::new(5, 3);
        let parts = layout.split(hit(&[(0, 0), (1, 4), (2, 1), (3, 0)], [true, false, true]));
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, 0);
        assert_eq!(parts[0].1.pixels, vec![Pixel(0, 0), Pixel(2, 1), Pixel(3, 0)]);
        assert_eq!(parts[1].0, 2);
        assert_eq!(parts[1].1.pixels, vec![Pixel(1, 4)]);
        assert_eq!(parts[1].1.channels, [true, false, true]);
    }

    #[test]
    fn banded_accumulation_matches_whole_accumulation() {
        let mut whole = HistogramSet::new(5, 5);
        for h in sample_hits() {
            whole.accumulate(&h);
        }

        let layout = BandLayout::new(5, 2);
        let mut banded = HistogramSet::new(5, 5);
        {
            let mut bands = banded.bands_mut(layout);
            assert_eq!(bands.len(), 2);
            assert_eq!(bands[1].first_row(), 3);
            assert_eq!(bands[1].rows(), 2);
            assert!(bands[1].owns_row(4));
            assert!(!bands[1].owns_row(2));
            for h in sample_hits() {
                for (band, part) in layout.split(h) {
                    bands[band].accumulate(&part);
                }
            }
        }
        assert_eq!(whole, banded);
    }

    #[test]
    fn full_cells_saturate() {
        let full = || Histogram::from_cells(2, 2, vec![Count::max_value() - 1; 4]);
        let mut set = HistogramSet::from_channels([full(), full(), full()]);
        let h = hit(&[(1, 1), (1, 1), (1, 1)], [true, false, false]);
        set.accumulate(&h);
        assert_eq!(set.channel(0).get(Pixel(1, 1)), Count::max_value());
        assert_eq!(set.channel(1).get(Pixel(1, 1)), Count::max_value() - 1);

        let layout = BandLayout::new(2, 2);
        for (band, part) in layout.split(h) {
            set.bands_mut(layout)[band].accumulate(&part);
        }
        assert_eq!(set.channel(0).get(Pixel(1, 1)), Count::max_value());
    }

    #[test]
    fn dimension_check() {
        let set = HistogramSet::new(4, 3);
        assert!(set.check_dimensions(4, 3).is_ok());
        match set.check_dimensions(3, 4) {
            Err(SnapshotError::DimensionMismatch { found_width: 4, found_height: 3, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
