use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use crate::api_types::InventoryItemDefinition;

pub const WEAPON_LOOKUP_FILE: &str = "weapon_lookup.json";
pub const PERK_LOOKUP_FILE: &str = "perk_lookup.json";

const ITEM_TYPE_WEAPON: i32 = 3;
const ITEM_TYPE_MOD: i32 = 19;

/// Canonical form of a display name: NFC, trimmed, lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().nfc().collect::<String>().to_lowercase()
}

/// Immutable display-name -> item hash mapping, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, u32>,
}

impl Catalog {
    pub fn from_map<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(name, hash)| (normalize_name(name.as_ref()), hash))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Catalog { entries }
    }

    /// Direct lookup; `key` must already be normalized.
    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn load_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading lookup file {}", path.display()))?;
        let map: BTreeMap<String, u32> = serde_json::from_str(&raw)
            .with_context(|| format!("decoding lookup file {}", path.display()))?;
        Ok(Catalog::from_map(map))
    }

    fn save_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_vec_pretty(&self.entries)?)
            .with_context(|| format!("writing lookup file {}", path.display()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub weapons: Catalog,
    pub perks: Catalog,
}

impl Catalogs {
    /// Load both lookups from `dir`. Missing or empty catalogs are fatal for the run.
    pub fn load(dir: &Path) -> Result<Self> {
        let weapons = Catalog::load_file(&dir.join(WEAPON_LOOKUP_FILE))
            .context("weapon catalog unavailable (run `build-catalog` first)")?;
        let perks = Catalog::load_file(&dir.join(PERK_LOOKUP_FILE))
            .context("perk catalog unavailable (run `build-catalog` first)")?;

        if weapons.is_empty() || perks.is_empty() {
            bail!(
                "Lookup files in {} are empty (weapons={}, perks={}); run `build-catalog` first",
                dir.display(),
                weapons.len(),
                perks.len()
            );
        }

        info!("Catalogs loaded - weapons={}, perks={}", weapons.len(), perks.len());
        Ok(Catalogs { weapons, perks })
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        self.weapons.save_file(&dir.join(WEAPON_LOOKUP_FILE))?;
        self.perks.save_file(&dir.join(PERK_LOOKUP_FILE))?;
        debug!("Wrote lookup files to {}", dir.display());
        Ok(())
    }

    /// Split manifest item definitions into the weapon and perk catalogs.
    /// A later item with the same display name overwrites an earlier one.
    pub fn from_manifest<I>(items: I) -> Self
    where
        I: IntoIterator<Item = InventoryItemDefinition>,
    {
        let mut weapons = Vec::new();
        let mut perks = Vec::new();
        for item in items {
            let name = item.display_properties.name;
            if name.trim().is_empty() {
                continue;
            }
            match item.item_type {
                ITEM_TYPE_WEAPON => weapons.push((name, item.hash)),
                ITEM_TYPE_MOD => perks.push((name, item.hash)),
                _ => {}
            }
        }
        Catalogs {
            weapons: Catalog::from_map(weapons),
            perks: Catalog::from_map(perks),
        }
    }
}
