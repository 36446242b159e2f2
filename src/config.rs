//! Purpose: Runtime configuration for a `Store`.
//! Exports: `StoreConfig`.
//! Role: One value built by the embedding application (or the CLI) and handed to `Store::new`.
//! Invariants: Defaults match the CLI defaults: `$FLATSTORE_DIR` or `data/csv`, fast durability, width 3.

use std::path::{Path, PathBuf};

use crate::core::atomic::Durability;
use crate::core::ids::DEFAULT_ID_WIDTH;
use crate::table_paths::default_data_dir;

/// Upper bound on the id width; wider suffixes than `u64::MAX` has digits are pointless.
pub const MAX_ID_WIDTH: usize = 20;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoreConfig {
    data_dir: PathBuf,
    durability: Durability,
    id_width: usize,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            durability: Durability::default(),
            id_width: DEFAULT_ID_WIDTH,
        }
    }

    /// Data directory from the environment, as the CLI resolves it without `--dir`.
    pub fn from_env() -> Self {
        Self::new(default_data_dir())
    }

    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Minimum digit count for generated ids, clamped to `1..=MAX_ID_WIDTH`.
    pub fn with_id_width(mut self, id_width: usize) -> Self {
        self.id_width = id_width.clamp(1, MAX_ID_WIDTH);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn durability(&self) -> Durability {
        self.durability
    }

    pub fn id_width(&self) -> usize {
        self.id_width
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_ID_WIDTH, StoreConfig};
    use crate::core::atomic::Durability;
    use std::path::Path;

    #[test]
    fn builder_overrides_defaults() {
        let config = StoreConfig::new("/srv/data")
            .with_durability(Durability::Flush)
            .with_id_width(5);
        assert_eq!(config.data_dir(), Path::new("/srv/data"));
        assert_eq!(config.durability(), Durability::Flush);
        assert_eq!(config.id_width(), 5);
    }

    #[test]
    fn id_width_is_clamped() {
        assert_eq!(StoreConfig::new("d").with_id_width(usize::MAX).id_width(), MAX_ID_WIDTH);
        assert_eq!(StoreConfig::new("d").with_id_width(0).id_width(), 1);
    }

    #[test]
    fn new_uses_fast_writes_and_three_digit_ids() {
        let config = StoreConfig::new("d");
        assert_eq!(config.durability(), Durability::Fast);
        assert_eq!(config.id_width(), 3);
    }
}
