//! The bestiary: named stat blocks and creature spawning.
//!
//! Stat blocks are plain JSON arrays of [`StatBlock`]. A built-in roster is
//! compiled into the crate; external files can replace it.
//!
//! Names are matched case-insensitively, and `_` or `-` stand in for spaces,
//! so `"giant_spider"`, `"Giant Spider"` and `"giant-spider"` all find the
//! same template.
//!
//! # Example
//!
//! ```
//! use skirmish_core::bestiary::Bestiary;
//!
//! let bestiary = Bestiary::builtin();
//! let troll = bestiary.spawn("Troll").unwrap();
//! assert_eq!(troll.hp, 84);
//! assert!(bestiary.spawn("tarrasque").is_err());
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::creature::{Creature, StatBlock};
use crate::error::{Result, SkirmishError};

const BUILTIN: &str = include_str!("../data/bestiary.json");

/// A lookup table of stat blocks.
#[derive(Debug, Clone, Default)]
pub struct Bestiary {
    blocks: BTreeMap<String, Arc<StatBlock>>,
}

impl Bestiary {
    /// The built-in roster.
    ///
    /// # Panics
    ///
    /// Panics if the compiled-in data does not parse, which the crate's own
    /// tests rule out.
    #[must_use]
    pub fn builtin() -> Self {
        match Self::from_json(BUILTIN) {
            Ok(bestiary) => bestiary,
            Err(e) => panic!("built-in bestiary is malformed: {e}"),
        }
    }

    /// Parse a JSON array of stat blocks.
    ///
    /// A later block with the same name replaces an earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::DataParse`] for malformed JSON, unknown
    /// damage or condition types, or bad dice notation.
    pub fn from_json(json: &str) -> Result<Self> {
        let blocks: Vec<StatBlock> =
            serde_json::from_str(json).map_err(|source| SkirmishError::DataParse {
                what: "bestiary".to_string(),
                source,
            })?;
        let mut bestiary = Self::default();
        for block in blocks {
            bestiary.insert(block);
        }
        debug!(creatures = bestiary.len(), "bestiary loaded");
        Ok(bestiary)
    }

    /// Read a JSON array of stat blocks from a file.
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::Io`] if the file cannot be read and
    /// [`SkirmishError::DataParse`] if it does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SkirmishError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Add or replace a stat block.
    pub fn insert(&mut self, block: StatBlock) {
        let key = normalize(&block.name);
        if self.blocks.insert(key, Arc::new(block)).is_some() {
            warn!("duplicate stat block replaced");
        }
    }

    /// Look up a stat block by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<StatBlock>> {
        self.blocks.get(&normalize(name))
    }

    /// A fresh creature built from the named template.
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::UnknownCreature`] if no template matches.
    pub fn spawn(&self, name: &str) -> Result<Creature> {
        self.get(name)
            .map(|block| Creature::new(Arc::clone(block)))
            .ok_or_else(|| SkirmishError::UnknownCreature(name.to_string()))
    }

    /// Spawn every name in `roster`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`SkirmishError::UnknownCreature`] for the first unknown name.
    pub fn spawn_all<S: AsRef<str>>(&self, roster: &[S]) -> Result<Vec<Creature>> {
        roster.iter().map(|name| self.spawn(name.as_ref())).collect()
    }

    /// Every stat block, ordered by name.
    pub fn blocks(&self) -> impl Iterator<Item = &StatBlock> + '_ {
        self.blocks.values().map(AsRef::as_ref)
    }

    /// Display names of every stat block, ordered by name.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.blocks().map(|b| b.name.as_str()).collect()
    }

    /// Number of stat blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when no stat blocks are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
