use boxart_carousel::art::{ArtManager, ArtStatus};
use boxart_carousel::config;
use boxart_carousel::core::gfx::software;
use boxart_carousel::core::network::HttpFetcher;
use boxart_carousel::menu::{Carousel, scan_rom_directory};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);
const MAX_RUN: Duration = Duration::from_secs(600);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    log::set_max_level(log::LevelFilter::Warn);

    let mut args = std::env::args().skip(1);
    let rom_dir = args.next().map_or_else(|| PathBuf::from("."), PathBuf::from);
    let config_path = args
        .next()
        .map_or_else(|| PathBuf::from(config::CONFIG_PATH), PathBuf::from);

    let cfg = config::load(&config_path);
    log::set_max_level(cfg.log_level);

    let mut backend = software::Backend::new();
    let fetch = Arc::new(HttpFetcher::from_config(&cfg));
    let mut art = ArtManager::new(&cfg, fetch, &mut backend)?;

    let carousel = Carousel::from_config(scan_rom_directory(&rom_dir), &cfg);
    carousel.queue_initial_loads(&mut art);

    // Headless frame loop: keep publishing until the workers run dry.
    let started = Instant::now();
    loop {
        carousel.update(&mut art, &mut backend);
        if art.wait_idle(Duration::ZERO) && !art.has_completions() {
            break;
        }
        if started.elapsed() > MAX_RUN {
            info!("Giving up on remaining art after {:?}.", MAX_RUN);
            break;
        }
        thread::sleep(FRAME);
    }

    let mut failed = 0usize;
    for rom in carousel.roms() {
        let status = art.status(&rom.filename);
        debug!("{} -> {status:?}", rom.display_name);
        if status == ArtStatus::Failed {
            failed += 1;
        }
    }
    let stats = art.stats();
    info!(
        "{} ROM(s): {} with art, {} without; {} download(s), {} decode(s), {} corrupt file(s) removed in {:.1}s.",
        carousel.len(),
        art.loaded_count(),
        failed,
        stats.downloads,
        stats.decodes,
        stats.corrupt_removed,
        started.elapsed().as_secs_f32()
    );

    art.shutdown(&mut backend);
    Ok(())
}
