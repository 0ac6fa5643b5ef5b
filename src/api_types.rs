use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/* Gemini generateContent */

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseCandidate {
    #[serde(default)]
    pub content: Content,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let first = self.candidates.first()?;
        let text: String = first.content.parts.iter().map(|p| p.text.as_str()).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/* Bungie manifest */

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEnvelope {
    #[serde(rename = "Response")]
    pub response: ManifestResponse,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResponse {
    pub json_world_component_content_paths: BTreeMap<String, BTreeMap<String, String>>, // locale -> component -> path
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemDefinition {
    #[serde(default)]
    pub display_properties: DisplayProperties,
    pub hash: u32,
    #[serde(default)]
    pub item_type: i32, // 3 = weapon, 19 = mod/perk
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DisplayProperties {
    #[serde(default)]
    pub name: String,
}

/* yt-dlp -J */

#[derive(Debug, Clone, Deserialize)]
pub struct YtPlaylist {
    #[serde(default)]
    pub entries: Vec<Option<YtEntry>>, // unavailable videos come back as null
}

#[derive(Debug, Clone, Deserialize)]
pub struct YtEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
}

impl YtEntry {
    pub fn channel_name(&self) -> Option<&str> {
        self.channel
            .as_deref()
            .or(self.uploader.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}
