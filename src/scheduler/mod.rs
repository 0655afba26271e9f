use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::config::Config;
use crate::domain::photo::ExtractedFile;
use crate::photos::{PhotoLibrary, upload_all};
use crate::pipeline;

pub struct SchedulerConfig {
    pub interval_minutes: u64,
    pub days_back: u32,
}

/// One full cycle: extract from the mailbox, upload to the album, remove the
/// staged files that were handed to the uploader.
pub fn run_once(cfg: &Config, library: &dyn PhotoLibrary, days_back: u32) -> Result<usize> {
    let files = pipeline::run(cfg, days_back)?;
    if files.is_empty() {
        info!("nothing to upload");
        return Ok(0);
    }

    let photos_cfg = cfg
        .photos
        .as_ref()
        .ok_or_else(|| anyhow!("[photos] section missing from config"))?;
    let uploaded = upload_all(library, &photos_cfg.album_name, &files)?;

    cleanup_staged(&files);
    Ok(uploaded)
}

/// Delete staged files after the upload pass. Best-effort: a leftover file is
/// logged, not fatal.
pub fn cleanup_staged(files: &[ExtractedFile]) {
    for file in files {
        match std::fs::remove_file(&file.path) {
            Ok(()) => debug!("removed staged file {}", file.path.display()),
            Err(e) => warn!("could not remove staged file {}: {e}", file.path.display()),
        }
    }
}

/// Re-invoke the pipeline on an interval until Ctrl-C. A failed cycle is
/// logged and the loop keeps going; runs never overlap.
pub fn run_scheduler(
    cfg: &Config,
    library: &dyn PhotoLibrary,
    sched: SchedulerConfig,
) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;

    info!(
        "scheduler started: every {} minute(s), looking back {} day(s)",
        sched.interval_minutes, sched.days_back
    );

    let mut run_count = 0u64;
    let mut success_count = 0u64;

    while running.load(Ordering::SeqCst) {
        run_count += 1;
        info!("scheduler run #{run_count}");

        match run_once(cfg, library, sched.days_back) {
            Ok(uploaded) => {
                success_count += 1;
                info!(
                    "run #{run_count} complete: {uploaded} photo(s) uploaded \
                     ({success_count}/{run_count} runs successful)"
                );
            }
            Err(e) => error!("run #{run_count} failed: {e}"),
        }

        // Sleep in one-second slices so Ctrl-C is honored promptly.
        for _ in 0..sched.interval_minutes * 60 {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_secs(1));
        }
    }

    info!("scheduler stopped after {run_count} run(s), {success_count} successful");
    Ok(())
}
