//! Maps vendor column names onto the canonical column vocabulary.

use crate::domain::model::{CanonicalColumn, NormalizedTable, Table};
use crate::utils::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// How a source header is compared with a synonym.
///
/// `Exact` is byte-for-byte: `"Impr."` does not match `"impr."`, and a header
/// with an embedded newline only matches a synonym containing the same
/// newline. `Relaxed` trims and lower-cases both sides before comparing and
/// is the default; exports from ad platforms capitalise their headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Exact,
    #[default]
    Relaxed,
}

impl MatchMode {
    pub fn matches(self, header: &str, synonym: &str) -> bool {
        match self {
            MatchMode::Exact => header == synonym,
            MatchMode::Relaxed => fold(header) == fold(synonym),
        }
    }
}

impl FromStr for MatchMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "relaxed" => Ok(MatchMode::Relaxed),
            other => Err(DashboardError::InvalidConfigValueError {
                field: "match_mode".to_string(),
                value: other.to_string(),
                reason: "expected 'exact' or 'relaxed'".to_string(),
            }),
        }
    }
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Canonical column -> known spellings, both in significant order.
#[derive(Debug, Clone, PartialEq)]
pub struct SynonymTable {
    entries: Vec<(CanonicalColumn, Vec<String>)>,
}

impl SynonymTable {
    pub fn builtin() -> Self {
        use CanonicalColumn as C;

        let raw: [(CanonicalColumn, &[&str]); 11] = [
            (C::Campaign, &["campaign", "campaign name"]),
            (
                C::Impression,
                &["impression", "imp", "impressions", "impr.", "impressi\nons"],
            ),
            (C::Reach, &["reach"]),
            (C::Clicks, &["clicks", "clk", "link clicks", "clicked"]),
            (
                C::Conversion,
                &["conversion", "con", "conv", "results", "purchase", "purchases"],
            ),
            (C::Spend, &["amount spent", "cost"]),
            (C::Sent, &["sent"]),
            (C::Opened, &["opened"]),
            (C::OpenRate, &["open rate"]),
            (C::ClickRate, &["click rate"]),
            (C::Date, &["day", "created time", "date"]),
        ];

        Self {
            entries: raw
                .into_iter()
                .map(|(column, spellings)| {
                    (column, spellings.iter().map(|s| s.to_string()).collect())
                })
                .collect(),
        }
    }

    /// Built-in table plus `extra` spellings keyed by canonical column name.
    pub fn with_extra(extra: &HashMap<String, Vec<String>>) -> Result<Self> {
        let mut table = Self::builtin();
        // 依欄位名稱排序，保持結果可重現
        let mut keys: Vec<&String> = extra.keys().collect();
        keys.sort();
        for key in keys {
            let column = key.parse::<CanonicalColumn>()?;
            table.extend(column, extra[key].iter().cloned());
        }
        Ok(table)
    }

    /// Appends spellings after the existing ones, ignoring repeats.
    pub fn extend(&mut self, column: CanonicalColumn, spellings: impl IntoIterator<Item = String>) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(c, _)| *c == column) {
            for spelling in spellings {
                if !existing.contains(&spelling) {
                    existing.push(spelling);
                }
            }
        }
    }

    pub fn entries(&self) -> &[(CanonicalColumn, Vec<String>)] {
        &self.entries
    }

    pub fn synonyms(&self, column: CanonicalColumn) -> &[String] {
        self.entries
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, s)| s.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    synonyms: SynonymTable,
    mode: MatchMode,
}

impl Normalizer {
    pub fn new(synonyms: SynonymTable, mode: MatchMode) -> Self {
        Self { synonyms, mode }
    }

    /// Renames matched headers on a copy of `table`.
    ///
    /// For each canonical column in table order the synonyms are tried in
    /// order and the first header that matches is renamed; later synonyms for
    /// that column are not consulted. Headers that already carry a canonical
    /// name are left alone and resolve their own column, so running this on
    /// its own output changes nothing. Unmatched headers pass through.
    pub fn normalize(&self, table: &Table) -> NormalizedTable {
        let mut normalized = table.clone();
        let mut resolved = BTreeMap::new();

        let canonical_names: HashSet<&str> =
            CanonicalColumn::ALL.iter().map(|c| c.as_str()).collect();
        let mut claimed: HashSet<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, h)| canonical_names.contains(h.as_str()))
            .map(|(i, _)| i)
            .collect();

        for (canonical, spellings) in self.synonyms.entries() {
            if normalized.column_index(canonical.as_str()).is_some() {
                resolved.insert(*canonical, canonical.as_str().to_string());
                continue;
            }

            let found = spellings.iter().find_map(|spelling| {
                normalized
                    .columns()
                    .iter()
                    .enumerate()
                    .find(|(i, header)| !claimed.contains(i) && self.mode.matches(header, spelling))
                    .map(|(i, header)| (i, header.clone()))
            });

            if let Some((index, header)) = found {
                tracing::debug!(header = %header.escape_debug(), canonical = %canonical, "Mapped column");
                normalized.rename_column(index, canonical.as_str());
                claimed.insert(index);
                resolved.insert(*canonical, header);
            }
        }

        let unmatched: Vec<&String> = normalized
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, _)| !claimed.contains(i))
            .map(|(_, h)| h)
            .collect();
        if !unmatched.is_empty() {
            tracing::debug!(?unmatched, "Columns kept without a canonical name");
        }

        NormalizedTable::new(normalized, resolved)
    }
}

/// Normalizes with the given synonyms in relaxed mode.
pub fn normalize(table: &Table, synonyms: &SynonymTable) -> NormalizedTable {
    Normalizer::new(synonyms.clone(), MatchMode::Relaxed).normalize(table)
}
