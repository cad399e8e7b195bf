use std::process;
use std::str::FromStr;

use clap::{App, Arg, ArgMatches};
use image::imageops;
use log::info;
use num::Complex;

use buddhabrot::{
    accumulate, compose, render_escape, snapshot, Error, Palette, RenderConfig, ResponseCurve, SamplingMode,
};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_number<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    T::from_str(s).map(|_| ()).map_err(|_| err.to_string())
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const ZOOM: &str = "zoom";
const OFFSET: &str = "offset";
const THREADS: &str = "threads";
const SHARDS: &str = "shards";
const ITERATIONS: &str = "iterations";
const SAMPLES: &str = "samples";
const FUNCTION: &str = "function";
const FACTOR: &str = "factor";
const EXPOSURE: &str = "exposure";
const MIN_LENGTH: &str = "min-length";
const SEED: &str = "seed";
const GRID: &str = "grid";
const ROTATE: &str = "rotate";
const SAVE: &str = "save";
const LOAD: &str = "load";
const ESCAPE: &str = "escape";
const PALETTE: &str = "palette";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("buddha")
        .version("0.3.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Buddhabrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; the format follows the extension"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1024x1024")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .validator(|s| validate_number::<f64>(&s, "Could not parse zoom"))
                .help("Pixels per unit of the complex plane [default: fits the set]"),
        )
        .arg(
            Arg::with_name(OFFSET)
                .long(OFFSET)
                .takes_value(true)
                .default_value("0.4,0")
                .allow_hyphen_values(true)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse offset"))
                .help("Camera offset added to every orbit point"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads * 4,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads * 4),
                    )
                })
                .help("Number of threads sampling orbits [default: one per CPU]"),
        )
        .arg(
            Arg::with_name(SHARDS)
                .long(SHARDS)
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse shard count",
                        &format!("Shard count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads accumulating orbits"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("20000")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        100_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 100000000",
                    )
                })
                .help("Maximum number of iterations per orbit"),
        )
        .arg(
            Arg::with_name(SAMPLES)
                .long(SAMPLES)
                .short("n")
                .takes_value(true)
                .default_value("2000000")
                .validator(|s| validate_number::<u64>(&s, "Could not parse sample count"))
                .help("Number of seeds to sample"),
        )
        .arg(
            Arg::with_name(FUNCTION)
                .long(FUNCTION)
                .short("f")
                .takes_value(true)
                .default_value("exp")
                .validator(|s| s.parse::<ResponseCurve>().map(|_| ()).map_err(|e| e.to_string()))
                .help("Color scaling function: exp, log, sqrt or lin"),
        )
        .arg(
            Arg::with_name(FACTOR)
                .long(FACTOR)
                .takes_value(true)
                .default_value("10")
                .validator(|s| validate_number::<f64>(&s, "Could not parse factor"))
                .help("Steepness of the color scaling function"),
        )
        .arg(
            Arg::with_name(EXPOSURE)
                .long(EXPOSURE)
                .short("e")
                .takes_value(true)
                .default_value("3")
                .validator(|s| validate_number::<f64>(&s, "Could not parse exposure"))
                .help("Over exposure"),
        )
        .arg(
            Arg::with_name(MIN_LENGTH)
                .long(MIN_LENGTH)
                .takes_value(true)
                .default_value("20")
                .validator(|s| validate_number::<u64>(&s, "Could not parse minimum orbit length"))
                .help("Discard orbits shorter than this"),
        )
        .arg(
            Arg::with_name(SEED)
                .long(SEED)
                .takes_value(true)
                .validator(|s| validate_number::<u64>(&s, "Could not parse seed"))
                .help("Seed the random number generators, for reproducible renders"),
        )
        .arg(
            Arg::with_name(GRID)
                .long(GRID)
                .help("Scan a regular grid of seeds instead of sampling at random"),
        )
        .arg(
            Arg::with_name(ROTATE)
                .long(ROTATE)
                .short("r")
                .help("Rotate the fractal to an upright position"),
        )
        .arg(
            Arg::with_name(SAVE)
                .long(SAVE)
                .takes_value(true)
                .conflicts_with(LOAD)
                .help("Save the visit counts to this file"),
        )
        .arg(
            Arg::with_name(LOAD)
                .long(LOAD)
                .takes_value(true)
                .help("Use visit counts saved earlier instead of computing them"),
        )
        .arg(
            Arg::with_name(ESCAPE)
                .long(ESCAPE)
                .conflicts_with_all(&[SAVE, LOAD])
                .help("Draw the escape-time Mandelbrot instead of the Buddhabrot"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .long(PALETTE)
                .short("p")
                .takes_value(true)
                .default_value("smooth")
                .validator(|s| s.parse::<Palette>().map(|_| ()).map_err(|e| e.to_string()))
                .help("Escape-time palette: smooth, random, pretty or pedagogical"),
        )
        .get_matches()
}

// Every value below has already been through its validator.
fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Option<T> {
    matches.value_of(name).and_then(|s| T::from_str(s).ok())
}

fn config_from(matches: &ArgMatches) -> RenderConfig {
    let (width, height) = matches
        .value_of(SIZE)
        .and_then(|s| parse_pair::<u16>(s, 'x'))
        .unwrap_or((1024, 1024));
    let mut config = RenderConfig::sized(width as usize, height as usize);
    if let Some(zoom) = value(matches, ZOOM) {
        config.zoom = zoom;
    }
    if let Some(offset) = matches.value_of(OFFSET).and_then(parse_complex) {
        config.offset = offset;
    }
    config.workers = value(matches, THREADS).unwrap_or(config.workers);
    config.shards = value(matches, SHARDS).unwrap_or(config.shards);
    config.max_iterations = value(matches, ITERATIONS).unwrap_or(config.max_iterations);
    config.samples = value(matches, SAMPLES).unwrap_or(config.samples);
    config.curve = value(matches, FUNCTION).unwrap_or(config.curve);
    config.factor = value(matches, FACTOR).unwrap_or(config.factor);
    config.exposure = value(matches, EXPOSURE).unwrap_or(config.exposure);
    config.min_orbit_len = value(matches, MIN_LENGTH).unwrap_or(config.min_orbit_len);
    config.seed = value(matches, SEED);
    if matches.is_present(GRID) {
        config.sampling = SamplingMode::Grid;
    }
    config
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let config = config_from(matches);
    config.validate()?;

    info!("[.] Initializing.");
    let mut img = if matches.is_present(ESCAPE) {
        render_escape(&config, value(matches, PALETTE).unwrap_or_default())?
    } else {
        let histograms = match matches.value_of(LOAD) {
            Some(path) => snapshot::load_file(path, config.width, config.height)?,
            None => {
                let histograms = accumulate(&config)?;
                if let Some(path) = matches.value_of(SAVE) {
                    snapshot::save_file(&histograms, path)?;
                }
                histograms
            }
        };
        info!("[/] Creating image.");
        compose(&histograms, &config)
    };
    if matches.is_present(ROTATE) {
        info!("[/] Rotating image");
        img = imageops::rotate270(&img);
    }

    let output = matches.value_of(OUTPUT).unwrap_or("a.png");
    img.save(output).map_err(|e| Error::Image(e.to_string()))?;
    info!("[!] Done: {}", output);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        process::exit(1);
    }
}
