// src/render.rs
use itertools::Itertools;

use crate::aggregate::RunLedger;
use crate::models::{UncertaintyEntry, UncertaintyKind};

pub fn render_uncertainty_line(e: &UncertaintyEntry) -> String {
    let matched = e
        .matched
        .as_deref()
        .map(|m| format!(" → '{}'", m))
        .unwrap_or_default();
    match e.kind {
        UncertaintyKind::UnknownWeapon => format!("❓ Unknown weapon: '{}'", e.name),
        UncertaintyKind::FuzzyWeapon => format!("⚠️ Fuzzy weapon match: '{}'{}", e.name, matched),
        UncertaintyKind::UnknownPerk => format!("❓ Unknown perk: '{}'", e.name),
        UncertaintyKind::FuzzyPerk => format!("⚠️ Fuzzy perk match: '{}'{}", e.name, matched),
        UncertaintyKind::NoTranscript => "❌ No subtitles available".to_string(),
        UncertaintyKind::ExtractionFailed => format!("❌ Extraction failed: {}", e.name),
        UncertaintyKind::MalformedOutput => format!("⚠️ Failed to parse: {}", e.name),
    }
}

/// Human review document: everything that did not resolve exactly, grouped by video.
pub fn render_review_markdown(ledger: &RunLedger, generated_at: &str, source: &str) -> String {
    let mut md = String::new();
    md.push_str("# God Roll Review\n");
    md.push_str(&format!("Generated: {}\n", generated_at));
    md.push_str(&format!("Source: {}\n\n", source));
    md.push_str(&format!(
        "Weapons: {} | Profiles: {} | Items needing review: {}\n\n",
        ledger.god_rolls.len(),
        ledger.profile_count(),
        ledger.uncertain.len()
    ));

    if ledger.uncertain.is_empty() {
        md.push_str("✅ All items matched successfully!\n");
        return md;
    }

    md.push_str("## ⚠️ Items Needing Review\n");
    let groups = ledger.uncertain.iter().chunk_by(|e| e.video_title.clone());
    for (title, entries) in &groups {
        md.push_str(&format!("\n### {}\n", title));
        for e in entries {
            md.push_str(&format!("- {}\n", render_uncertainty_line(e)));
        }
    }

    md
}
