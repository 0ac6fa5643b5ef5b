use anyhow::Result;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::aggregate::RunLedger;
use crate::backend::Backend;
use crate::budget::DEFAULT_TRANSCRIPT_CAP;
use crate::catalog::Catalogs;
use crate::export::{write_snapshot, OutputPaths};
use crate::extract::{extract, RetryPolicy};
use crate::fetch::VideoSource;
use crate::models::{UncertaintyKind, VideoInfo};
use crate::parse::parse_response;
use crate::prompts::GOD_ROLL_PROMPT;
use crate::resolve::Resolver;

pub const DEFAULT_COOLDOWN_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub template: String,
    pub transcript_cap: usize, // chars
    pub retry: RetryPolicy,
    pub cooldown: Duration, // between videos that hit the backend
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            template: GOD_ROLL_PROMPT.to_string(),
            transcript_cap: DEFAULT_TRANSCRIPT_CAP,
            retry: RetryPolicy::default(),
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
        }
    }
}

fn needs_metadata(video: &VideoInfo) -> bool {
    let channel = video.channel.trim();
    channel.is_empty() || channel == "Unknown"
}

/// Run one video through extract → parse → resolve → merge.
/// Returns whether the backend was invoked.
async fn process_video(
    source: &dyn VideoSource,
    backend: &dyn Backend,
    catalogs: &Catalogs,
    resolver: &Resolver,
    settings: &PipelineSettings,
    video: &VideoInfo,
    ledger: &mut RunLedger,
) -> bool {
    let Some(transcript) = source.transcript(&video.url).await else {
        warn!("No subtitles found - video='{}'", video.title);
        ledger.note(UncertaintyKind::NoTranscript, "", &video.title);
        return false;
    };
    debug!("Transcript fetched - video='{}', length={} chars", video.title, transcript.len());

    let raw = match extract(backend, &settings.template, &transcript, settings.transcript_cap, &settings.retry).await {
        Ok(raw) => raw,
        Err(e) => {
            error!("Extraction failed - video='{}', error={}", video.title, e);
            ledger.note(UncertaintyKind::ExtractionFailed, e.to_string(), &video.title);
            return true;
        }
    };

    let candidates = match parse_response(&raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse JSON response - video='{}', reason={}", video.title, e.reason);
            ledger.note(UncertaintyKind::MalformedOutput, e.snippet, &video.title);
            return true;
        }
    };

    if candidates.is_empty() {
        info!("No god rolls found in video - video='{}'", video.title);
        return true;
    }

    let review_before = ledger.uncertain.len();
    let added = ledger.accumulate(&candidates, video, catalogs, resolver);
    info!(
        "Video processed - candidates={}, profiles_added={}, review_items={}",
        candidates.len(),
        added,
        ledger.uncertain.len() - review_before
    );
    true
}

/// Process every video of `playlist` from `start_index` (0-based), one at a time,
/// persisting the results after each video.
pub async fn run_playlist(
    source: &dyn VideoSource,
    backend: &dyn Backend,
    catalogs: &Catalogs,
    resolver: &Resolver,
    settings: &PipelineSettings,
    playlist: &str,
    start_index: usize,
    paths: &OutputPaths,
) -> Result<RunLedger> {
    let pipeline_start = std::time::Instant::now();
    let videos = source.list_videos(playlist).await?;
    let total = videos.len();
    info!(
        "Pipeline started - videos={}, start={}, model={}, matcher={}, threshold={}",
        total,
        start_index + 1,
        backend.model(),
        resolver.strategy_name(),
        resolver.threshold()
    );
    if start_index >= total && total > 0 {
        warn!("Start index {} is past the end of the playlist ({} videos)", start_index + 1, total);
    }

    let mut ledger = RunLedger::default();

    for (i, listed) in videos.iter().enumerate().skip(start_index) {
        let video_start = std::time::Instant::now();
        info!("[{}/{}] {}", i + 1, total, listed.title);

        let mut video = listed.clone();
        if needs_metadata(&video) {
            debug!("Fetching video metadata - url={}", video.url);
            if let Some(meta) = source.video_metadata(&video.url).await {
                video.channel = meta.channel;
                if video.id.is_empty() {
                    video.id = meta.id;
                }
            }
        }

        let called_backend =
            process_video(source, backend, catalogs, resolver, settings, &video, &mut ledger).await;

        write_snapshot(paths, &ledger, playlist)?;
        debug!("Video done - duration={:.2}s", video_start.elapsed().as_secs_f32());

        if called_backend && i + 1 < total && !settings.cooldown.is_zero() {
            debug!("Cooling down {}s before next video", settings.cooldown.as_secs());
            tokio::time::sleep(settings.cooldown).await;
        }
    }

    write_snapshot(paths, &ledger, playlist)?;

    info!(
        "Pipeline completed - total_duration={:.2}s, weapons={}, profiles={}, review_items={}, output={}",
        pipeline_start.elapsed().as_secs_f32(),
        ledger.god_rolls.len(),
        ledger.profile_count(),
        ledger.uncertain.len(),
        paths.import_json.display()
    );
    Ok(ledger)
}
