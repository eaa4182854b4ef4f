use crate::types::{GprError, GprResult, LayerProfile};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Canonical cache key for a one-way delay
///
/// The delay through a horizontally stratified medium depends only on the
/// horizontal range to the pixel, the pixel depth and the antenna depth,
/// so translational redundancy is removed before keying: the same physical
/// geometry sampled from different absolute antenna locations collapses to
/// one entry. Coordinates are stored as exact f64 bit patterns (with -0.0
/// normalized) so the key is hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelayKey {
    bits: [u64; 3],
}

impl DelayKey {
    pub fn new(range: f64, pixel_z: f64, antenna_z: f64) -> Self {
        Self {
            bits: [canon(range), canon(pixel_z), canon(antenna_z)],
        }
    }
}

fn canon(v: f64) -> u64 {
    let normalized = if v == 0.0 { 0.0f64 } else { v };
    normalized.to_bits()
}

/// On-disk layout of the cache store
#[derive(Serialize, Deserialize)]
struct CacheStore {
    profile: LayerProfile,
    entries: HashMap<DelayKey, f64>,
}

#[derive(Serialize)]
struct CacheStoreRef<'a> {
    profile: &'a LayerProfile,
    entries: &'a HashMap<DelayKey, f64>,
}

#[derive(Debug, Clone)]
struct CachePaths {
    store: PathBuf,
    lock: PathBuf,
}

/// Advisory exclusive lock on the backing store, released on drop so every
/// exit path (including errors) unlocks
struct StoreLock {
    file: File,
}

impl StoreLock {
    fn acquire(path: &Path) -> GprResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Persistent map from canonical relative geometry to one-way delay (ns)
///
/// Entries are never invalidated: they stay valid as long as the layer
/// profile they were computed for is in force. A store recorded under a
/// different profile is rejected outright rather than silently reused.
/// Independent reconstruction jobs may share one store; `persist` holds an
/// exclusive advisory lock around its read-merge-write cycle so concurrent
/// writers cannot lose each other's entries.
#[derive(Debug)]
pub struct DelayCache {
    paths: Option<CachePaths>,
    profile: LayerProfile,
    entries: HashMap<DelayKey, f64>,
}

impl DelayCache {
    /// Open a cache backed by `store_path`, loading any existing entries
    ///
    /// Fails with [`GprError::CacheMismatch`] when the store on disk was
    /// produced under a different layer profile.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        store_path: P,
        lock_path: Q,
        profile: LayerProfile,
    ) -> GprResult<Self> {
        let paths = CachePaths {
            store: store_path.as_ref().to_path_buf(),
            lock: lock_path.as_ref().to_path_buf(),
        };
        let mut entries = HashMap::new();
        if paths.store.exists() {
            let _lock = StoreLock::acquire(&paths.lock)?;
            let store = read_store(&paths.store)?;
            check_profile(&store.profile, &profile)?;
            entries = store.entries;
            log::info!(
                "Loaded delay cache with {} entries from {}",
                entries.len(),
                paths.store.display()
            );
        }
        Ok(Self {
            paths: Some(paths),
            profile,
            entries,
        })
    }

    /// Purely in-memory cache with no backing store; `persist` is a no-op
    pub fn in_memory(profile: LayerProfile) -> Self {
        Self {
            paths: None,
            profile,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &DelayKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn put(&mut self, key: DelayKey, delay: f64) {
        self.entries.insert(key, delay);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn profile(&self) -> &LayerProfile {
        &self.profile
    }

    /// Merge externally computed entries into this cache
    ///
    /// Delays are deterministic for a fixed profile, so existing entries
    /// are kept as-is.
    pub fn merge_from(&mut self, external: HashMap<DelayKey, f64>) {
        for (key, delay) in external {
            self.entries.entry(key).or_insert(delay);
        }
    }

    /// Write the cache back to its store under an exclusive lock
    ///
    /// Entries written by other processes since this instance loaded are
    /// merged first, then the union replaces the store atomically.
    pub fn persist(&mut self) -> GprResult<()> {
        let Some(paths) = self.paths.clone() else {
            log::debug!("In-memory delay cache, nothing to persist");
            return Ok(());
        };
        let _lock = StoreLock::acquire(&paths.lock)?;
        if paths.store.exists() {
            let store = read_store(&paths.store)?;
            check_profile(&store.profile, &self.profile)?;
            self.merge_from(store.entries);
        }

        let dir = paths.store.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            bincode::serialize_into(
                &mut writer,
                &CacheStoreRef {
                    profile: &self.profile,
                    entries: &self.entries,
                },
            )?;
            writer.flush()?;
        }
        tmp.persist(&paths.store).map_err(|e| GprError::Io(e.error))?;
        log::info!(
            "Persisted delay cache with {} entries to {}",
            self.entries.len(),
            paths.store.display()
        );
        Ok(())
    }
}

fn read_store(path: &Path) -> GprResult<CacheStore> {
    let file = File::open(path)?;
    bincode::deserialize_from(BufReader::new(file)).map_err(Into::into)
}

fn check_profile(stored: &LayerProfile, active: &LayerProfile) -> GprResult<()> {
    if stored != active {
        return Err(GprError::CacheMismatch(format!(
            "store was built for {:?}, current profile is {:?}",
            stored, active
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Layer;

    fn sandy_profile() -> LayerProfile {
        LayerProfile::new(vec![Layer::new(4.0, -1.5)]).unwrap()
    }

    #[test]
    fn test_put_then_get_round_trip() {
        let mut cache = DelayCache::in_memory(LayerProfile::vacuum());
        let key = DelayKey::new(1.5, -2.0, 0.25);
        cache.put(key, 12.5);
        assert_eq!(cache.get(&key), Some(12.5));
        assert_eq!(cache.get(&DelayKey::new(1.5, -2.0, 0.5)), None);
    }

    #[test]
    fn test_negative_zero_collapses_to_one_key() {
        assert_eq!(
            DelayKey::new(-0.0, -1.0, 0.0),
            DelayKey::new(0.0, -1.0, 0.0)
        );
    }

    #[test]
    fn test_persist_then_reload_reproduces_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("delays.bin");
        let lock = dir.path().join("delays.lock");

        let mut cache = DelayCache::open(&store, &lock, sandy_profile()).unwrap();
        for i in 0..32 {
            cache.put(DelayKey::new(i as f64 * 0.1, -1.0, 0.0), i as f64);
        }
        cache.persist().unwrap();

        let reloaded = DelayCache::open(&store, &lock, sandy_profile()).unwrap();
        assert_eq!(reloaded.len(), 32);
        for i in 0..32 {
            assert_eq!(
                reloaded.get(&DelayKey::new(i as f64 * 0.1, -1.0, 0.0)),
                Some(i as f64)
            );
        }
    }

    #[test]
    fn test_layer_mismatch_is_fatal_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("delays.bin");
        let lock = dir.path().join("delays.lock");

        let mut cache = DelayCache::open(&store, &lock, sandy_profile()).unwrap();
        cache.put(DelayKey::new(0.0, -1.0, 0.0), 1.0);
        cache.persist().unwrap();

        let result = DelayCache::open(&store, &lock, LayerProfile::vacuum());
        assert!(matches!(result, Err(GprError::CacheMismatch(_))));
    }

    #[test]
    fn test_persist_merges_external_writer() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("delays.bin");
        let lock = dir.path().join("delays.lock");

        let mut first = DelayCache::open(&store, &lock, sandy_profile()).unwrap();
        first.put(DelayKey::new(1.0, -1.0, 0.0), 10.0);

        // A second job writes the store while the first is still running
        let mut second = DelayCache::open(&store, &lock, sandy_profile()).unwrap();
        second.put(DelayKey::new(2.0, -1.0, 0.0), 20.0);
        second.persist().unwrap();

        first.persist().unwrap();

        let union = DelayCache::open(&store, &lock, sandy_profile()).unwrap();
        assert_eq!(union.len(), 2);
        assert_eq!(union.get(&DelayKey::new(1.0, -1.0, 0.0)), Some(10.0));
        assert_eq!(union.get(&DelayKey::new(2.0, -1.0, 0.0)), Some(20.0));
    }
}
