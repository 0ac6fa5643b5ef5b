use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::catalog::Catalogs;
use crate::models::{
    Candidate, ExportDocument, Profile, ProfileSource, ResolvedSelection, UncertaintyEntry,
    UncertaintyKind, VideoInfo, WeaponRecord,
};
use crate::resolve::{Confidence, Resolver};

pub const EXPORT_VERSION: &str = "1.0";

/// "MM:SS" or "HH:MM:SS" to seconds; `None` when malformed or out of range.
pub fn timestamp_to_seconds(ts: &str) -> Option<u64> {
    let parts: Vec<&str> = ts.trim().split(':').collect();
    let nums: Vec<u64> = parts
        .iter()
        .map(|p| p.trim().parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match nums.as_slice() {
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        [h, m, s] => h.checked_mul(3600)?.checked_add(m.checked_mul(60)?)?.checked_add(*s),
        _ => None,
    }
}

pub fn video_url(video: &VideoInfo) -> String {
    if video.id.is_empty() {
        video.url.clone()
    } else {
        format!("https://www.youtube.com/watch?v={}", video.id)
    }
}

/// Video URL that starts playback at `timestamp`, when it parses to a positive offset.
pub fn timestamped_url(video: &VideoInfo, timestamp: &str) -> String {
    let base = video_url(video);
    if video.id.is_empty() {
        return base;
    }
    match (timestamp_to_seconds(timestamp), Url::parse(&base)) {
        (Some(secs), Ok(mut url)) if secs > 0 => {
            url.query_pairs_mut().append_pair("t", &format!("{}s", secs));
            url.into()
        }
        _ => base,
    }
}

/// Everything a run has produced so far: merged weapon records plus review items.
#[derive(Debug, Clone, Default)]
pub struct RunLedger {
    pub god_rolls: Vec<WeaponRecord>,
    pub uncertain: Vec<UncertaintyEntry>,
}

impl RunLedger {
    pub fn note(&mut self, kind: UncertaintyKind, name: impl Into<String>, video_title: &str) {
        self.note_match(kind, name.into(), None, video_title);
    }

    fn note_match(&mut self, kind: UncertaintyKind, name: String, matched: Option<String>, video_title: &str) {
        self.uncertain.push(UncertaintyEntry {
            kind,
            name,
            matched,
            video_title: video_title.to_string(),
        });
    }

    pub fn profile_count(&self) -> usize {
        self.god_rolls.iter().map(|r| r.profiles.len()).sum()
    }

    /// Resolve and merge one video's candidates; returns the number of profiles added.
    pub fn accumulate(
        &mut self,
        candidates: &[Candidate],
        video: &VideoInfo,
        catalogs: &Catalogs,
        resolver: &Resolver,
    ) -> usize {
        let mut added = 0;

        for cand in candidates {
            let weapon = resolver.resolve(Some(cand.weapon_name.as_str()), &catalogs.weapons);
            let weapon_hash = match (weapon.confidence, weapon.hash) {
                (Confidence::Exact, Some(hash)) => hash,
                (Confidence::Fuzzy, Some(hash)) => {
                    self.note_match(UncertaintyKind::FuzzyWeapon, cand.weapon_name.clone(), weapon.matched, &video.title);
                    hash
                }
                _ => {
                    self.note(UncertaintyKind::UnknownWeapon, cand.weapon_name.clone(), &video.title);
                    continue;
                }
            };

            let mut selection = ResolvedSelection::default();
            for perk_name in &cand.perk_names {
                let perk = resolver.resolve(Some(perk_name.as_str()), &catalogs.perks);
                match (perk.confidence, perk.hash) {
                    (Confidence::Exact, Some(hash)) => selection.insert(hash),
                    (Confidence::Fuzzy, Some(hash)) => {
                        selection.insert(hash);
                        self.note_match(UncertaintyKind::FuzzyPerk, perk_name.clone(), perk.matched, &video.title);
                    }
                    _ => self.note(UncertaintyKind::UnknownPerk, perk_name.clone(), &video.title),
                }
            }

            if selection.is_empty() {
                debug!("Dropping roll without resolvable perks - weapon='{}'", cand.weapon_name);
                continue;
            }

            debug!("Profile built - weapon={}, perks={}", weapon_hash, selection.len());
            let profile = Profile {
                id: Uuid::new_v4(),
                name: format!("{} Roll", cand.mode),
                notes: cand.notes.clone(),
                selection,
                source: ProfileSource {
                    author: if video.channel.trim().is_empty() {
                        "Unknown".to_string()
                    } else {
                        video.channel.clone()
                    },
                    video_title: video.title.clone(),
                    timestamp: cand.timestamp.clone(),
                    timestamp_url: timestamped_url(video, &cand.timestamp),
                    video_url: video_url(video),
                },
            };

            match self.god_rolls.iter_mut().find(|r| r.weapon_hash == weapon_hash) {
                Some(existing) => existing.profiles.push(profile),
                None => self.god_rolls.push(WeaponRecord {
                    weapon_hash,
                    weapon_name: cand.weapon_name.clone(),
                    profiles: vec![profile],
                }),
            }
            added += 1;
        }

        added
    }

    pub fn to_export(&self, exported_at: &str) -> ExportDocument {
        ExportDocument {
            version: EXPORT_VERSION.to_string(),
            exported_at: exported_at.to_string(),
            god_rolls: self.god_rolls.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::models::Mode;

    fn catalogs() -> Catalogs {
        Catalogs {
            weapons: Catalog::from_map([("Fatebringer", 111u32), ("Igneous Hammer", 222)]),
            perks: Catalog::from_map([("Kill Clip", 1u32), ("Firefly", 2), ("Rampage", 3)]),
        }
    }

    fn video() -> VideoInfo {
        VideoInfo {
            title: "Top 10 Rolls".into(),
            id: "abc123".into(),
            channel: "Aztecross".into(),
            url: "https://www.youtube.com/watch?v=abc123".into(),
        }
    }

    fn cand(weapon: &str, perks: &[&str]) -> Candidate {
        Candidate {
            weapon_name: weapon.into(),
            mode: Mode::PvE,
            perk_names: perks.iter().map(|p| p.to_string()).collect(),
            notes: "note".into(),
            timestamp: "02:05".into(),
        }
    }

    fn kinds(ledger: &RunLedger) -> Vec<UncertaintyKind> {
        ledger.uncertain.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_same_weapon_merges_into_one_record() {
        let mut ledger = RunLedger::default();
        let added = ledger.accumulate(
            &[cand("Fatebringer", &["Kill Clip", "Firefly"]), cand("Fatebringer", &["Rampage"])],
            &video(),
            &catalogs(),
            &Resolver::default(),
        );

        assert_eq!(added, 2);
        assert_eq!(ledger.god_rolls.len(), 1);
        let rec = &ledger.god_rolls[0];
        assert_eq!(rec.weapon_hash, 111);
        assert_eq!(rec.profiles.len(), 2);
        assert!(rec.profiles[0].selection.contains(1));
        assert!(rec.profiles[0].selection.contains(2));
        assert!(rec.profiles[1].selection.contains(3));
        assert_ne!(rec.profiles[0].id, rec.profiles[1].id);
        assert!(ledger.uncertain.is_empty());
    }

    #[test]
    fn test_merges_across_videos() {
        let mut ledger = RunLedger::default();
        let mut second = video();
        second.title = "Another video".into();
        ledger.accumulate(&[cand("Fatebringer", &["Kill Clip"])], &video(), &catalogs(), &Resolver::default());
        ledger.accumulate(&[cand("fatebringer", &["Firefly"])], &second, &catalogs(), &Resolver::default());

        assert_eq!(ledger.god_rolls.len(), 1);
        assert_eq!(ledger.god_rolls[0].weapon_name, "Fatebringer");
        assert_eq!(ledger.god_rolls[0].profiles[1].source.video_title, "Another video");
        assert_eq!(ledger.profile_count(), 2);
    }

    #[test]
    fn test_unknown_weapon_skips_candidate() {
        let mut ledger = RunLedger::default();
        ledger.accumulate(&[cand("Gjallarhorn", &["Kill Clip"])], &video(), &catalogs(), &Resolver::default());

        assert!(ledger.god_rolls.is_empty());
        assert_eq!(kinds(&ledger), vec![UncertaintyKind::UnknownWeapon]);
        assert_eq!(ledger.uncertain[0].name, "Gjallarhorn");
        assert_eq!(ledger.uncertain[0].video_title, "Top 10 Rolls");
    }

    #[test]
    fn test_all_perks_unresolved_emits_nothing() {
        let mut ledger = RunLedger::default();
        let added = ledger.accumulate(
            &[cand("Fatebringer", &["Headstone", "Voltshot"])],
            &video(),
            &catalogs(),
            &Resolver::default(),
        );

        assert_eq!(added, 0);
        assert!(ledger.god_rolls.is_empty());
        assert_eq!(kinds(&ledger), vec![UncertaintyKind::UnknownPerk, UncertaintyKind::UnknownPerk]);
    }

    #[test]
    fn test_fuzzy_matches_are_kept_and_reported() {
        let mut ledger = RunLedger::default();
        ledger.accumulate(
            &[cand("Fatebringerr", &["kill clipp", "Rampage", "Nope Perk"])],
            &video(),
            &catalogs(),
            &Resolver::default(),
        );

        assert_eq!(ledger.god_rolls.len(), 1);
        assert_eq!(ledger.god_rolls[0].weapon_hash, 111);
        assert_eq!(ledger.god_rolls[0].weapon_name, "Fatebringerr");
        let sel = &ledger.god_rolls[0].profiles[0].selection;
        assert_eq!(sel.len(), 2);
        assert_eq!(
            kinds(&ledger),
            vec![UncertaintyKind::FuzzyWeapon, UncertaintyKind::FuzzyPerk, UncertaintyKind::UnknownPerk]
        );
        assert_eq!(ledger.uncertain[1].matched.as_deref(), Some("kill clip"));
    }

    #[test]
    fn test_profile_carries_source_metadata() {
        let mut ledger = RunLedger::default();
        let mut c = cand("Fatebringer", &["Kill Clip"]);
        c.mode = Mode::PvP;
        ledger.accumulate(&[c], &video(), &catalogs(), &Resolver::default());

        let p = &ledger.god_rolls[0].profiles[0];
        assert_eq!(p.name, "PvP Roll");
        assert_eq!(p.notes, "note");
        assert_eq!(p.source.author, "Aztecross");
        assert_eq!(p.source.timestamp, "02:05");
        assert_eq!(p.source.timestamp_url, "https://www.youtube.com/watch?v=abc123&t=125s");
        assert_eq!(p.source.video_url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_timestamp_parsing() {
        assert_eq!(timestamp_to_seconds("02:05"), Some(125));
        assert_eq!(timestamp_to_seconds("1:00:01"), Some(3601));
        assert_eq!(timestamp_to_seconds(""), None);
        assert_eq!(timestamp_to_seconds("soon"), None);
        assert_eq!(timestamp_to_seconds("1:2:3:4"), None);
        assert_eq!(timestamp_to_seconds("999999999999999999:00"), None);
        assert_eq!(timestamp_to_seconds("9999999999999999:00:00"), None);
    }

    #[test]
    fn test_out_of_range_timestamp_keeps_plain_url() {
        let mut c = cand("Fatebringer", &["Kill Clip"]);
        c.timestamp = "999999999999999999:00".into();
        let mut ledger = RunLedger::default();
        let added = ledger.accumulate(&[c], &video(), &catalogs(), &Resolver::default());

        assert_eq!(added, 1);
        let src = &ledger.god_rolls[0].profiles[0].source;
        assert_eq!(src.timestamp_url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_blank_perk_is_reported_and_roll_kept() {
        let mut ledger = RunLedger::default();
        let added = ledger.accumulate(
            &[cand("Fatebringer", &["Kill Clip", ""])],
            &video(),
            &catalogs(),
            &Resolver::default(),
        );

        assert_eq!(added, 1);
        assert_eq!(ledger.god_rolls[0].profiles[0].selection.len(), 1);
        assert_eq!(kinds(&ledger), vec![UncertaintyKind::UnknownPerk]);
    }

    #[test]
    fn test_urls_without_video_id_fall_back_to_raw_url() {
        let v = VideoInfo {
            title: "t".into(),
            id: String::new(),
            channel: String::new(),
            url: "https://youtu.be/xyz".into(),
        };
        assert_eq!(video_url(&v), "https://youtu.be/xyz");
        assert_eq!(timestamped_url(&v, "01:00"), "https://youtu.be/xyz");
        assert_eq!(timestamped_url(&video(), "00:00"), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_export_document_shape() {
        let mut ledger = RunLedger::default();
        ledger.accumulate(&[cand("Fatebringer", &["Kill Clip"])], &video(), &catalogs(), &Resolver::default());
        let doc = serde_json::to_value(ledger.to_export("2026-01-01T00:00:00+00:00")).unwrap();

        assert_eq!(doc["version"], "1.0");
        assert_eq!(doc["exportedAt"], "2026-01-01T00:00:00+00:00");
        assert_eq!(doc["godRolls"][0]["weaponHash"], 111);
        assert_eq!(doc["godRolls"][0]["profiles"][0]["selection"]["1"], "OR");
        assert_eq!(doc["godRolls"][0]["profiles"][0]["source"]["videoTitle"], "Top 10 Rolls");
    }
}
