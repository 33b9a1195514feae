use crate::data::bar::Bar;
use crate::data::loader::LoadOptions;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

//identifies one load: the file as it was on disk plus the filters applied to it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub filters: String,
}

impl Fingerprint {
    pub fn of(path: &Path, options: &LoadOptions) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Fingerprint {
            path: path.to_path_buf(),
            size: meta.len(),
            modified: meta.modified().ok(),
            filters: options.describe(),
        })
    }
}

//in-memory store of prepared bar tables, owned by the caller
#[derive(Debug, Default)]
pub struct BarCache {
    entries: HashMap<Fingerprint, Arc<Vec<Bar>>>,
    hits: u64,
    misses: u64,
}

impl BarCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &Fingerprint) -> Option<Arc<Vec<Bar>>> {
        match self.entries.get(key) {
            Some(bars) => {
                self.hits += 1;
                Some(Arc::clone(bars))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: Fingerprint, bars: Vec<Bar>) -> Arc<Vec<Bar>> {
        let bars = Arc::new(bars);
        self.entries.insert(key, Arc::clone(&bars));
        bars
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(filters: &str) -> Fingerprint {
        Fingerprint {
            path: PathBuf::from("bars.csv"),
            size: 10,
            modified: None,
            filters: filters.to_string(),
        }
    }

    #[test]
    fn test_get_put_roundtrip_counts_hits() {
        let mut cache = BarCache::new();
        assert!(cache.get(&key("a")).is_none());

        cache.put(key("a"), Vec::new());
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());

        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fingerprint_changes_with_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(&path, "timestamp,open,high,low,close,symbol\n").unwrap();

        let plain = Fingerprint::of(&path, &LoadOptions::default()).unwrap();
        let filtered = Fingerprint::of(
            &path,
            &LoadOptions {
                symbol_regex: Some("^NQ".to_string()),
                resample_minutes: None,
            },
        )
        .unwrap();

        assert_ne!(plain, filtered);
        assert_eq!(plain.size, 37);
    }
}
