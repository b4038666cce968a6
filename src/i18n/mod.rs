//! Static UI string translations.
//!
//! Tables are loaded once at startup and shared read-only between requests.
//! Source messages are English; a missing or empty translation falls back to
//! the source message.

pub mod table;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use table::{interpolate, placeholders, RejectedEntry, TranslationTable};

/// Locale the source messages are written in
pub const SOURCE_LOCALE: &str = "en";

/// Tables compiled into the binary
const BUNDLED: &[(&str, &str)] = &[("es", include_str!("../../translations/es.json"))];

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Failed to read translations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid translation table for locale '{locale}': {source}")]
    Parse {
        locale: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Translator {
    tables: HashMap<String, TranslationTable>,
    default_locale: String,
}

impl Translator {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            tables: HashMap::new(),
            default_locale: normalize_locale(&default_locale.into()),
        }
    }

    /// Translator holding the tables compiled into the binary
    pub fn bundled(default_locale: impl Into<String>) -> Result<Self, TranslationError> {
        let mut translator = Self::new(default_locale);
        for (locale, raw) in BUNDLED {
            translator.insert_json(locale, raw)?;
        }
        Ok(translator)
    }

    /// Load every `<locale>.json` in `dir`, replacing tables of the same locale
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, TranslationError> {
        let io_err = |source| TranslationError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut loaded = 0;
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path).map_err(|source| TranslationError::Io {
                path: path.clone(),
                source,
            })?;
            self.insert_json(locale, &raw)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn insert_json(&mut self, locale: &str, raw: &str) -> Result<(), TranslationError> {
        let table = TranslationTable::from_json(raw).map_err(|source| TranslationError::Parse {
            locale: locale.to_string(),
            source,
        })?;
        self.insert_table(locale, table);
        Ok(())
    }

    pub fn insert_table(&mut self, locale: &str, table: TranslationTable) {
        let locale = normalize_locale(locale);
        for rejected in table.rejected() {
            tracing::warn!(
                "Ignoring '{}' translation of \"{}\": placeholders missing {:?}, unexpected {:?}",
                locale,
                rejected.source,
                rejected.missing,
                rejected.unexpected
            );
        }
        tracing::debug!(
            "Loaded {} translations for '{}' ({} translated)",
            table.len(),
            locale,
            table.translated_count()
        );
        self.tables.insert(locale, table);
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Locales with a loaded table, sorted
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    pub fn table(&self, locale: &str) -> Option<&TranslationTable> {
        let locale = normalize_locale(locale);
        self.tables
            .get(&locale)
            .or_else(|| self.tables.get(primary_subtag(&locale)))
    }

    fn supports(&self, locale: &str) -> bool {
        locale == SOURCE_LOCALE || self.tables.contains_key(locale)
    }

    /// Translate `message` into `locale` and interpolate `params`
    pub fn translate(&self, locale: &str, message: &str, params: &[(&str, &str)]) -> String {
        let translated = self
            .table(locale)
            .and_then(|table| table.get(message))
            .unwrap_or(message);
        interpolate(translated, params)
    }

    /// Pick the best supported locale for an `Accept-Language` header value
    pub fn negotiate(&self, accept_language: Option<&str>) -> String {
        let Some(header) = accept_language else {
            return self.default_locale.clone();
        };

        let mut ranges: Vec<(String, f32)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.trim().split(';');
                let tag = normalize_locale(pieces.next()?.trim());
                if tag.is_empty() {
                    return None;
                }
                let q = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                (q > 0.0).then_some((tag, q))
            })
            .collect();
        // stable sort keeps header order for equal weights
        ranges.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (tag, _) in &ranges {
            if tag == "*" {
                return self.default_locale.clone();
            }
            if self.supports(tag) {
                return tag.clone();
            }
            let primary = primary_subtag(tag);
            if self.supports(primary) {
                return primary.to_string();
            }
        }
        self.default_locale.clone()
    }
}

/// `es_MX` / `ES-mx` -> `es-mx`
fn normalize_locale(locale: &str) -> String {
    locale.trim().replace('_', "-").to_ascii_lowercase()
}

fn primary_subtag(locale: &str) -> &str {
    locale.split('-').next().unwrap_or(locale)
}
