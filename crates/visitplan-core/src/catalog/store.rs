//! File-backed lesson catalog repository.
//!
//! The store is constructed once per run and handed to whoever needs the
//! catalog; the file is read and parsed on first access and memoized for the
//! lifetime of the store. There is no global cache.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use serde::Deserialize;

use super::Lesson;
use crate::error::CatalogError;

/// Memoizing catalog repository.
pub struct CatalogStore {
    path: Option<PathBuf>,
    cache: OnceCell<Vec<Lesson>>,
}

impl CatalogStore {
    /// Store backed by a JSON file. Nothing is read until [`lessons`] is
    /// first called.
    ///
    /// [`lessons`]: CatalogStore::lessons
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CatalogStore {
            path: Some(path.into()),
            cache: OnceCell::new(),
        }
    }

    /// Store over an in-memory lesson list, for callers that already have
    /// one (tests, embedded catalogs).
    pub fn from_lessons(lessons: Vec<Lesson>) -> Self {
        let cache = OnceCell::new();
        let _ = cache.set(lessons);
        CatalogStore {
            path: None,
            cache,
        }
    }

    /// The catalog, loading and caching it on first use.
    pub fn lessons(&self) -> Result<&[Lesson], CatalogError> {
        let lessons = self.cache.get_or_try_init(|| {
            let path = self.path.as_ref().ok_or(CatalogError::NotConfigured)?;
            let raw = std::fs::read_to_string(path).map_err(|source| {
                CatalogError::ReadFailed {
                    path: path.clone(),
                    source,
                }
            })?;
            parse_catalog(&raw).map_err(|e| CatalogError::ParseFailed {
                path: path.clone(),
                message: e.to_string(),
            })
        })?;
        Ok(lessons.as_slice())
    }
}

/// Parse catalog JSON: either a bare lesson array or `{"lessons": [...]}`.
pub fn parse_catalog(raw: &str) -> Result<Vec<Lesson>, serde_json::Error> {
    #[derive(Deserialize)]
    struct CatalogFile {
        lessons: Vec<Lesson>,
    }

    serde_json::from_str::<Vec<Lesson>>(raw).or_else(|outer| {
        serde_json::from_str::<CatalogFile>(raw)
            .map(|f| f.lessons)
            .map_err(|_| outer)
    })
}
