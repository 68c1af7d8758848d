// Manages local file storage for the habit list and the theme flag.
//
// Each logical document lives in its own string-keyed slot. A slot key
// maps to one JSON file inside the context data directory; writes go
// through a temp file plus rename and are serialized by a sidecar lock.
use crate::context::AppContext;
use crate::model::Habit;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

// --- Android Specific Imports ---
#[cfg(target_os = "android")]
use std::collections::HashMap;
#[cfg(target_os = "android")]
use std::sync::{Arc, Mutex, OnceLock};

// --- Desktop Specific Imports ---
#[cfg(not(target_os = "android"))]
use fs2::FileExt;

// Slot keys, kept identical to the keys the shipped app stored under.
pub const HABITS_KEY: &str = "@habits_key";
pub const THEME_KEY: &str = "@theme_key";

// --- Android Global Lock Map ---
#[cfg(target_os = "android")]
static ANDROID_FILE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

pub struct LocalStorage;

impl LocalStorage {
    /// Returns the backing file for a slot key.
    /// `@habits_key` -> `<data_dir>/habits_key.json`
    pub fn get_path_for_key(ctx: &dyn AppContext, key: &str) -> Result<PathBuf> {
        // Sanitize the key to only allow alphanumeric, hyphen and underscore
        let safe_key: String = key
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        Ok(ctx.get_data_dir()?.join(format!("{}.json", safe_key)))
    }

    /// Helper to get a sidecar lock file path (Desktop only)
    #[cfg(not(target_os = "android"))]
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    // --- DESKTOP IMPLEMENTATION (fs2) ---
    #[cfg(not(target_os = "android"))]
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    // --- ANDROID IMPLEMENTATION (In-Memory Mutex) ---
    #[cfg(target_os = "android")]
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        // Get the global map
        let map_mutex = ANDROID_FILE_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));

        // Canonicalize to avoid race conditions via symlinks or relative paths
        let key = file_path.canonicalize().unwrap_or(file_path.to_path_buf());

        // Get or create the mutex specifically for this file path
        let file_mutex = {
            let mut map = map_mutex.lock().unwrap();
            map.entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        // Lock this specific file
        let _guard = file_mutex.lock().unwrap();

        // Perform operation
        f()
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Reads the raw JSON stored in a slot, `None` when the slot was never
    /// written.
    fn read_slot(ctx: &dyn AppContext, key: &str) -> Result<Option<String>> {
        let path = Self::get_path_for_key(ctx, key)?;
        if !path.exists() {
            return Ok(None);
        }
        let json = Self::with_lock(&path, || Ok(fs::read_to_string(&path)?))?;
        Ok(Some(json))
    }

    /// Replaces the JSON stored in a slot wholesale.
    fn write_slot(ctx: &dyn AppContext, key: &str, json: String) -> Result<()> {
        let path = Self::get_path_for_key(ctx, key)?;
        Self::with_lock(&path, || Self::atomic_write(&path, json))
    }

    /// Persists the full habit list, replacing whatever the slot held.
    pub fn save_habits(ctx: &dyn AppContext, habits: &[Habit]) -> Result<()> {
        let json = serde_json::to_string_pretty(habits)?;
        Self::write_slot(ctx, HABITS_KEY, json)
    }

    /// Loads the stored habit list. A missing slot, an unreadable file and
    /// an undecodable payload all resolve to an empty list; the problem is
    /// logged and the next save simply overwrites it.
    pub fn load_habits(ctx: &dyn AppContext) -> Vec<Habit> {
        match Self::read_slot(ctx, HABITS_KEY) {
            Ok(None) => vec![],
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(habits) => habits,
                Err(e) => {
                    log::warn!("Discarding undecodable habit list: {}", e);
                    vec![]
                }
            },
            Err(e) => {
                log::warn!("Failed to read habit list: {}", e);
                vec![]
            }
        }
    }

    /// Persists the dark-theme flag.
    pub fn save_theme(ctx: &dyn AppContext, is_dark: bool) -> Result<()> {
        let json = serde_json::to_string(&is_dark)?;
        Self::write_slot(ctx, THEME_KEY, json)
    }

    /// Loads the dark-theme flag. Absent or corrupt slots resolve to light
    /// mode (`false`).
    pub fn load_theme(ctx: &dyn AppContext) -> bool {
        match Self::read_slot(ctx, THEME_KEY) {
            Ok(None) => false,
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(is_dark) => is_dark,
                Err(e) => {
                    log::warn!("Discarding undecodable theme flag: {}", e);
                    false
                }
            },
            Err(e) => {
                log::warn!("Failed to read theme flag: {}", e);
                false
            }
        }
    }
}
