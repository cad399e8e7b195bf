// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The render pipeline.  A pool of workers samples seeds, evaluates
//! their orbits and projects them onto the image; the resulting hits
//! travel over bounded queues to accumulators, each of which owns a
//! band of rows of every histogram outright.  Nothing else ever
//! touches the histograms while the pool is running, and the pool is
//! joined before they are handed back.

use crossbeam::channel::{self, Sender};
use image::RgbaImage;
use log::{debug, info};

use crate::config::RenderConfig;
use crate::error::Error;
use crate::evaluate::{evaluate_into, ComplexPoint, Fate, Orbit};
use crate::histogram::{BandLayout, BandSet, HistogramSet};
use crate::planes::{PixelHit, PlaneMapper};
use crate::sampler::seed_sources;
use crate::tone::compose;

/// What one worker did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Seeds evaluated.
    pub seeds: u64,
    /// Seeds whose orbits escaped.
    pub escaped: u64,
    /// Escaping orbits that reached a histogram.
    pub plotted: u64,
}

/// Accumulate and compose in one go.
pub fn render(config: &RenderConfig) -> Result<RgbaImage, Error> {
    let histograms = accumulate(config)?;
    info!("[/] Creating image.");
    Ok(compose(&histograms, config))
}

/// Run the whole sample budget of `config` into fresh histograms.
pub fn accumulate(config: &RenderConfig) -> Result<HistogramSet, Error> {
    config.validate()?;
    accumulate_from(
        config,
        seed_sources(config),
        HistogramSet::new(config.width, config.height),
    )
}

/// Run one worker per entry of `sources`, adding their orbits to
/// `histograms`, which may be fresh or loaded from a snapshot.  The
/// histograms are returned once every worker has finished and every
/// queued hit has been counted.
pub fn accumulate_from<I>(
    config: &RenderConfig,
    sources: Vec<I>,
    mut histograms: HistogramSet,
) -> Result<HistogramSet, Error>
where
    I: IntoIterator<Item = ComplexPoint>,
    I::IntoIter: Send,
{
    config.validate()?;
    histograms.check_dimensions(config.width, config.height)?;

    let layout = BandLayout::new(config.height, config.shards);
    let mapper = PlaneMapper::new(config);
    info!(
        "[-] Calculating visited points: {} samples, {} workers, {} accumulators",
        config.samples,
        sources.len(),
        layout.count
    );

    let totals = crossbeam::scope(|scope| {
        let mut senders: Vec<Sender<PixelHit>> = Vec::with_capacity(layout.count);
        for (shard, band) in histograms.bands_mut(layout).into_iter().enumerate() {
            let (tx, rx) = channel::bounded(config.queue_depth);
            senders.push(tx);
            scope.spawn(move |_| drain(shard, band, rx.iter()));
        }

        let workers: Vec<_> = sources
            .into_iter()
            .enumerate()
            .map(|(worker, source)| {
                let seeds = source.into_iter();
                let senders = senders.clone();
                let mapper = &mapper;
                scope.spawn(move |_| {
                    run_worker(worker, seeds, mapper, &senders, layout, config.max_iterations, config.bailout)
                })
            })
            .collect();

        // Accumulators stop once the last worker's senders are gone.
        drop(senders);

        workers
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Result<Vec<WorkerStats>, _>>()
    })
    .map_err(|_| Error::WorkerPanicked)?
    .map_err(|_| Error::WorkerPanicked)?;

    let escaped: u64 = totals.iter().map(|s| s.escaped).sum();
    let plotted: u64 = totals.iter().map(|s| s.plotted).sum();
    info!("[!] Done: {} orbits escaped, {} plotted.", escaped, plotted);
    Ok(histograms)
}

/// Sample, evaluate and project until `seeds` runs dry, sending every
/// hit to the accumulator that owns its rows.  Dropping `senders` on
/// return is what lets the accumulators finish.
fn run_worker<S>(
    worker: usize,
    seeds: S,
    mapper: &PlaneMapper,
    senders: &[Sender<PixelHit>],
    layout: BandLayout,
    max_iterations: u64,
    bailout: f64,
) -> WorkerStats
where
    S: Iterator<Item = ComplexPoint>,
{
    debug!("worker {} starting", worker);
    let mut stats = WorkerStats::default();
    let mut orbit = Orbit::with_capacity(1024);
    for seed in seeds {
        stats.seeds += 1;
        if let Fate::Escaped(_) = evaluate_into(seed, max_iterations, bailout, &mut orbit) {
            stats.escaped += 1;
            if let Some(hit) = mapper.project(&orbit) {
                stats.plotted += 1;
                for (shard, part) in layout.split(hit) {
                    // Only fails if the accumulator has died; the scope
                    // will report that.
                    if senders[shard].send(part).is_err() {
                        return stats;
                    }
                }
            }
        }
    }
    debug!(
        "worker {} done: {} seeds, {} escaped, {} plotted",
        worker, stats.seeds, stats.escaped, stats.plotted
    );
    stats
}

/// Count every hit until all producers hang up.
fn drain<H>(shard: usize, mut band: BandSet<'_>, hits: H)
where
    H: Iterator<Item = PixelHit>,
{
    debug!(
        "accumulator {} owns rows {}..{}",
        shard,
        band.first_row(),
        band.first_row() + band.rows()
    );
    let mut count: u64 = 0;
    for hit in hits {
        band.accumulate(&hit);
        count += 1;
    }
    debug!("accumulator {} done: {} hits", shard, count);
}
