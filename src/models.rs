use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Game mode a roll is recommended for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Mode {
    PvE,
    PvP,
    Both,
    #[default]
    Unknown,
}

impl Mode {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pve" => Mode::PvE,
            "pvp" => Mode::PvP,
            "both" => Mode::Both,
            _ => Mode::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::PvE => "PvE",
            Mode::PvP => "PvP",
            Mode::Both => "Both",
            Mode::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let label = String::deserialize(de)?;
        Ok(Mode::from_label(&label))
    }
}

// Models routinely emit `null` for fields they have nothing to say about.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

// A `null` perk stays in the list as a blank name so it is reported, not fatal.
fn perk_list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Option<Vec<Option<String>>> = Option::deserialize(de)?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

/// One recommendation as emitted by the model, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "weapon", default, deserialize_with = "null_as_default")]
    pub weapon_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode: Mode,
    #[serde(rename = "perks", default, deserialize_with = "perk_list")]
    pub perk_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String, // "MM:SS" | "HH:MM:SS" | ""
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub id: String,
    pub channel: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMarker {
    #[serde(rename = "OR")]
    Or,
}

/// Perk identifier (stringified) -> "OR": any one of the listed perks satisfies the slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedSelection(BTreeMap<String, SelectionMarker>);

impl ResolvedSelection {
    pub fn insert(&mut self, perk_hash: u32) {
        self.0.insert(perk_hash.to_string(), SelectionMarker::Or);
    }

    #[cfg(test)]
    pub fn contains(&self, perk_hash: u32) -> bool {
        self.0.contains_key(&perk_hash.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSource {
    pub author: String,
    pub video_title: String,
    pub timestamp: String,
    pub timestamp_url: String,
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String, // "<mode> Roll"
    pub notes: String,
    pub selection: ResolvedSelection,
    pub source: ProfileSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponRecord {
    pub weapon_hash: u32,
    pub weapon_name: String,
    pub profiles: Vec<Profile>,
}

/// Import document written after every processed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub exported_at: String, // RFC 3339
    pub god_rolls: Vec<WeaponRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncertaintyKind {
    UnknownWeapon,
    FuzzyWeapon,
    UnknownPerk,
    FuzzyPerk,
    NoTranscript,
    ExtractionFailed,
    MalformedOutput,
}

impl UncertaintyKind {
    pub fn tag(&self) -> &'static str {
        match self {
            UncertaintyKind::UnknownWeapon => "unknown-weapon",
            UncertaintyKind::FuzzyWeapon => "fuzzy-weapon",
            UncertaintyKind::UnknownPerk => "unknown-perk",
            UncertaintyKind::FuzzyPerk => "fuzzy-perk",
            UncertaintyKind::NoTranscript => "no-transcript",
            UncertaintyKind::ExtractionFailed => "extraction-failed",
            UncertaintyKind::MalformedOutput => "malformed-output",
        }
    }
}

impl fmt::Display for UncertaintyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Something a human should look at before importing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncertaintyEntry {
    pub kind: UncertaintyKind,
    pub name: String,            // offending free text, or failure detail for per-video kinds
    pub matched: Option<String>, // catalog key a fuzzy match landed on
    pub video_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_accepts_case_variants() {
        assert_eq!(Mode::from_label("PvE"), Mode::PvE);
        assert_eq!(Mode::from_label("pvp"), Mode::PvP);
        assert_eq!(Mode::from_label(" BOTH "), Mode::Both);
        assert_eq!(Mode::from_label("gambit"), Mode::Unknown);
    }

    #[test]
    fn test_candidate_defaults_missing_and_null_fields() {
        let c: Candidate =
            serde_json::from_str(r#"{"weapon":"Fatebringer","notes":null}"#).unwrap();
        assert_eq!(c.weapon_name, "Fatebringer");
        assert_eq!(c.mode, Mode::Unknown);
        assert!(c.perk_names.is_empty());
        assert_eq!(c.notes, "");
        assert_eq!(c.timestamp, "");
    }

    #[test]
    fn test_null_perk_entries_become_blank_names() {
        let c: Candidate =
            serde_json::from_str(r#"{"weapon":"Fatebringer","perks":["Kill Clip",null]}"#).unwrap();
        assert_eq!(c.perk_names, vec!["Kill Clip".to_string(), String::new()]);

        let c: Candidate = serde_json::from_str(r#"{"weapon":"Fatebringer","perks":null}"#).unwrap();
        assert!(c.perk_names.is_empty());
    }

    #[test]
    fn test_selection_serializes_as_or_markers() {
        let mut sel = ResolvedSelection::default();
        sel.insert(42);
        sel.insert(7);
        sel.insert(42);
        assert_eq!(sel.len(), 2);
        assert_eq!(
            serde_json::to_value(&sel).unwrap(),
            serde_json::json!({ "42": "OR", "7": "OR" })
        );
    }

    #[test]
    fn test_weapon_record_uses_camel_case_keys() {
        let rec = WeaponRecord {
            weapon_hash: 111,
            weapon_name: "Fatebringer".into(),
            profiles: vec![],
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["weaponHash"], 111);
        assert_eq!(v["weaponName"], "Fatebringer");
    }

    #[test]
    fn test_uncertainty_tags() {
        assert_eq!(UncertaintyKind::UnknownWeapon.tag(), "unknown-weapon");
        assert_eq!(UncertaintyKind::FuzzyPerk.to_string(), "fuzzy-perk");
        assert_eq!(
            serde_json::to_value(UncertaintyKind::MalformedOutput).unwrap(),
            "malformed-output"
        );
    }
}
