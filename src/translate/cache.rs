// src/translate/cache.rs
//! JSON-file translation cache: `sha256(original text) -> translated text`.
//!
//! Every read and write loads the whole file; writes replace it through a temp file. Two
//! writers racing on the same file means the last one wins.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub const DEFAULT_CACHE_FILE: &str = "translation-cache.json";

/// Deterministic cache key for a text.
pub fn text_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone)]
pub struct TranslationCache {
    path: PathBuf,
}

impl TranslationCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole cache; a missing or unreadable file reads as empty.
    pub fn load_all(&self) -> BTreeMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(map) => map,
                Err(e) => {
                    tracing::error!(target: "translate", error = ?e, path = %self.path.display(), "translation cache unreadable");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::error!(target: "translate", error = ?e, path = %self.path.display(), "reading translation cache");
                BTreeMap::new()
            }
        }
    }

    pub fn exists(&self, hash: &str) -> bool {
        self.load_all()
            .get(hash)
            .is_some_and(|v| !v.is_empty())
    }

    pub fn get(&self, hash: &str) -> Option<String> {
        self.load_all().remove(hash).filter(|v| !v.is_empty())
    }

    pub fn put(&self, hash: &str, translation: &str) -> io::Result<()> {
        let mut all = self.load_all();
        all.insert(hash.to_string(), translation.to_string());
        self.save_all(&all)
    }

    fn save_all(&self, all: &BTreeMap<String, String>) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(all)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(tmp, &self.path)?;
        tracing::debug!(target: "translate", entries = all.len(), "translation cache saved");
        Ok(())
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_FILE)
    }
}
