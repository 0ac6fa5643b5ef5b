use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::api_types::{InventoryItemDefinition, ManifestEnvelope, YtEntry, YtPlaylist};
use crate::models::VideoInfo;

pub const BUNGIE_ROOT: &str = "https://www.bungie.net";
const ITEM_COMPONENT: &str = "DestinyInventoryItemDefinition";

/// Where videos and their transcripts come from.
#[async_trait(?Send)]
pub trait VideoSource {
    async fn list_videos(&self, playlist: &str) -> Result<Vec<VideoInfo>>;

    /// Full metadata for one video; `None` when it cannot be fetched.
    async fn video_metadata(&self, url: &str) -> Option<VideoInfo>;

    /// Raw subtitle text; `None` when the video has no usable subtitles.
    async fn transcript(&self, url: &str) -> Option<String>;
}

fn entry_to_video(e: YtEntry) -> VideoInfo {
    let id = e.id.clone().unwrap_or_default();
    let url = e
        .url
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));
    VideoInfo {
        title: e.title.clone().unwrap_or_else(|| "Unknown Video".to_string()),
        channel: e.channel_name().unwrap_or_default().to_string(),
        id,
        url,
    }
}

/// First `.vtt` file in `dir`, by name.
fn find_subtitle_file(dir: &Path) -> Option<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "vtt"))
        .collect();
    files.sort();
    files.into_iter().next()
}

/// `yt-dlp` driven as a subprocess.
pub struct YtDlp {
    binary: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self { binary: PathBuf::from("yt-dlp") }
    }
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let out = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .with_context(|| format!("spawning {}", self.binary.display()))?;
        if !out.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.binary.display(),
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(out.stdout)
    }
}

#[async_trait(?Send)]
impl VideoSource for YtDlp {
    async fn list_videos(&self, playlist: &str) -> Result<Vec<VideoInfo>> {
        info!("Scanning playlist - url={}", playlist);
        let raw = self
            .run(&["--flat-playlist", "-J", "--ignore-errors", "--no-warnings", playlist])
            .await?;
        let pl: YtPlaylist = serde_json::from_slice(&raw).context("decoding playlist JSON")?;
        let videos: Vec<VideoInfo> = pl.entries.into_iter().flatten().map(entry_to_video).collect();
        info!("Playlist scanned - videos={}", videos.len());
        Ok(videos)
    }

    async fn video_metadata(&self, url: &str) -> Option<VideoInfo> {
        let raw = match self.run(&["-J", "--skip-download", "--no-warnings", url]).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Metadata fetch failed - url={}, error={}", url, e);
                return None;
            }
        };
        serde_json::from_slice::<YtEntry>(&raw).ok().map(entry_to_video)
    }

    async fn transcript(&self, url: &str) -> Option<String> {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => {
                warn!("Cannot create subtitle dir - error={}", e);
                return None;
            }
        };
        let out_path = dir.path().join("subs");
        let template = out_path.to_string_lossy();
        let args = [
            "--skip-download",
            "--write-subs",
            "--write-auto-subs",
            "--sub-langs",
            "en",
            "--sub-format",
            "vtt",
            "--no-warnings",
            "-o",
            &*template,
            url,
        ];
        if let Err(e) = self.run(&args).await {
            warn!("Subtitle download failed - url={}, error={}", url, e);
            return None;
        }

        let file = find_subtitle_file(dir.path())?;
        let text = tokio::fs::read_to_string(&file).await.ok()?;
        debug!("Transcript loaded - file={}, length={} chars", file.display(), text.len());
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

/// Download inventory item definitions from the Bungie manifest (English locale).
pub async fn fetch_manifest_items(
    client: &Client,
    root: &str,
    api_key: Option<&str>,
) -> Result<Vec<InventoryItemDefinition>> {
    let start = std::time::Instant::now();
    let url = format!("{}/Platform/Destiny2/Manifest/", root);
    let mut req = client.get(&url);
    if let Some(key) = api_key {
        req = req.header("X-API-Key", key);
    }
    let envelope: ManifestEnvelope = req
        .send()
        .await
        .with_context(|| format!("Request failed for {}", url))?
        .error_for_status()
        .with_context(|| format!("HTTP error for {}", url))?
        .json()
        .await
        .with_context(|| format!("Decoding JSON for {}", url))?;

    let path = envelope
        .response
        .json_world_component_content_paths
        .get("en")
        .and_then(|components| components.get(ITEM_COMPONENT))
        .with_context(|| format!("manifest has no English {} component", ITEM_COMPONENT))?;

    let items_url = format!("{}{}", root, path);
    debug!("Downloading item definitions - url={}", items_url);
    let items: BTreeMap<String, InventoryItemDefinition> = client
        .get(&items_url)
        .send()
        .await
        .with_context(|| format!("Request failed for {}", items_url))?
        .error_for_status()
        .with_context(|| format!("HTTP error for {}", items_url))?
        .json()
        .await
        .with_context(|| format!("Decoding JSON for {}", items_url))?;

    info!(
        "Manifest fetch completed - duration={:.2}s, items={}",
        start.elapsed().as_secs_f32(),
        items.len()
    );
    Ok(items.into_values().collect())
}
