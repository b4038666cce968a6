// Per-locale translation table
//
// A table maps source messages to their translation for one locale. Empty
// values, and values whose `{placeholder}` set differs from their key's,
// count as untranslated.

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: HashMap<String, String>,
    rejected: Vec<RejectedEntry>,
}

/// An entry dropped at load time because its placeholders don't match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub source: String,
    pub translation: String,
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl TranslationTable {
    /// Build a table, dropping entries whose placeholders don't match
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = Self::default();
        for (source, translation) in entries {
            if translation.is_empty() {
                table.entries.insert(source, translation);
                continue;
            }

            let expected = placeholders(&source);
            let found = placeholders(&translation);
            if expected == found {
                table.entries.insert(source, translation);
            } else {
                table.rejected.push(RejectedEntry {
                    missing: expected.difference(&found).cloned().collect(),
                    unexpected: found.difference(&expected).cloned().collect(),
                    source,
                    translation,
                });
            }
        }
        table
    }

    /// Parse a JSON object of `source -> translation`. Duplicate keys are an error.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let UniqueEntries(entries) = serde_json::from_str(raw)?;
        Ok(Self::from_entries(entries))
    }

    /// Translation for `source`, if one exists and is non-empty
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries
            .get(source)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries with a usable translation
    pub fn translated_count(&self) -> usize {
        self.entries.values().filter(|t| !t.is_empty()).count()
    }

    pub fn rejected(&self) -> &[RejectedEntry] {
        &self.rejected
    }
}

/// Placeholder names (`{name}`) in a message
pub fn placeholders(message: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut rest = message;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if is_placeholder_name(name) {
                    names.insert(name.to_string());
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Replace `{name}` tokens with values from `params`; unknown tokens stay.
/// Single left-to-right pass: substituted values are never rescanned.
pub fn interpolate(message: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return message.to_string();
    }

    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let substitution = after.find('}').and_then(|end| {
            let name = &after[..end];
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });
        match substitution {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// JSON object entries, rejecting duplicate keys
struct UniqueEntries(Vec<(String, String)>);

impl<'de> Deserialize<'de> for UniqueEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = UniqueEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of source message to translation")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut seen = BTreeSet::new();
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    if !seen.insert(key.clone()) {
                        return Err(serde::de::Error::custom(format!("duplicate message: {}", key)));
                    }
                    entries.push((key, value));
                }
                Ok(UniqueEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
