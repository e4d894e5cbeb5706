//! Knowledge table model and sheet parsing.
//!
//! ## Payload shape
//!
//! The knowledge endpoint returns a spreadsheet dump: an object of sheets,
//! each sheet an array of rows, each row an array of cells.
//!
//! ```json
//! { "database": {
//!     "Licenses":     [["ใบขับขี่ ทำใหม่", "ไปที่ช่อง 3", "Go to counter 3"]],
//!     "FAQ":          [["คำถาม", "Question"], ["ต่อใบขับขี่", "Renew a license"]],
//!     "Lottie_State": [["idle", "https://…/idle.json"]],
//!     "Config":       [["kiosk_name", "…"]]
//! } }
//! ```
//!
//! Content sheets hold `[key phrase, Thai answer, English answer]`.  The
//! reserved sheets ([`RESERVED_SHEETS`]) are never searched for answers:
//! `FAQ` becomes the quick-question menu (first row is a header),
//! `Lottie_State` maps avatar states to animation assets, and `Config` is
//! reserved for deployment settings.

use std::collections::HashMap;

use kiosk_types::{AvatarState, KioskError, Language};
use serde_json::Value;
use tracing::debug;

pub const CONFIG_SHEET: &str = "Config";
pub const AVATAR_SHEET: &str = "Lottie_State";
pub const QUICK_QUESTION_SHEET: &str = "FAQ";

/// Sheet names excluded from answer search.
pub const RESERVED_SHEETS: [&str; 3] = [CONFIG_SHEET, AVATAR_SHEET, QUICK_QUESTION_SHEET];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_SHEETS.contains(&name)
}

// ─────────────────────────────────────────────────────────────────────────────
// KnowledgeEntry
// ─────────────────────────────────────────────────────────────────────────────

/// One searchable row: a key phrase and its answer in each language.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeEntry {
    key_phrase: String,
    keywords: Vec<String>,
    answers: HashMap<Language, String>,
}

impl KnowledgeEntry {
    /// Build an entry from a key phrase and per-language answers.
    ///
    /// The key phrase is split on whitespace into lowercase sub-keywords;
    /// answers are trimmed and empty ones dropped.
    pub fn new<I, S>(key_phrase: impl Into<String>, answers: I) -> Self
    where
        I: IntoIterator<Item = (Language, S)>,
        S: Into<String>,
    {
        let key_phrase = key_phrase.into().trim().to_string();
        let keywords = key_phrase
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let answers = answers
            .into_iter()
            .map(|(lang, text)| (lang, text.into().trim().to_string()))
            .filter(|(_, text)| !text.is_empty())
            .collect();
        Self {
            key_phrase,
            keywords,
            answers,
        }
    }

    /// Shorthand for the common Thai + English row.
    pub fn bilingual(key_phrase: &str, thai: &str, english: &str) -> Self {
        Self::new(
            key_phrase,
            [(Language::Thai, thai), (Language::English, english)],
        )
    }

    /// The key phrase as written in the sheet.
    pub fn key_phrase(&self) -> &str {
        &self.key_phrase
    }

    /// Lowercased whitespace-separated sub-keywords of the key phrase.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// The non-empty answer for `language`, if any.
    pub fn answer(&self, language: Language) -> Option<&str> {
        self.answers.get(&language).map(String::as_str)
    }

    /// An entry is searchable when it has a key phrase and at least one answer.
    pub fn is_searchable(&self) -> bool {
        !self.keywords.is_empty() && !self.answers.is_empty()
    }
}

/// A named group of entries (one sheet).
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub entries: Vec<KnowledgeEntry>,
}

// ─────────────────────────────────────────────────────────────────────────────
// KnowledgeTable
// ─────────────────────────────────────────────────────────────────────────────

/// The complete knowledge base loaded at startup.
///
/// Immutable once built; a reload replaces the whole table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeTable {
    categories: Vec<Category>,
    quick_questions: Vec<HashMap<Language, String>>,
    avatar_assets: HashMap<String, String>,
}

impl KnowledgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a category. Reserved names are accepted but never searched.
    pub fn push_category(&mut self, name: impl Into<String>, entries: Vec<KnowledgeEntry>) {
        self.categories.push(Category {
            name: name.into(),
            entries,
        });
    }

    /// Append a quick question with its per-language labels.
    pub fn push_quick_question<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = (Language, S)>,
        S: Into<String>,
    {
        let labels = labels
            .into_iter()
            .map(|(lang, s)| (lang, s.into().trim().to_string()))
            .filter(|(_, s)| !s.is_empty())
            .collect();
        self.quick_questions.push(labels);
    }

    pub fn set_avatar_asset(&mut self, state: AvatarState, asset: impl Into<String>) {
        self.avatar_assets
            .insert(state.label().to_string(), asset.into());
    }

    /// Categories that take part in answer search, in load order.
    pub fn searchable_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| !is_reserved(&c.name))
    }

    /// Total number of searchable entries.
    pub fn entry_count(&self) -> usize {
        self.searchable_categories()
            .map(|c| c.entries.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Quick-question labels for `language`, skipping questions with no
    /// label in that language.
    pub fn quick_questions(&self, language: Language) -> Vec<String> {
        self.quick_questions
            .iter()
            .filter_map(|labels| labels.get(&language).cloned())
            .collect()
    }

    /// Animation asset for `state`, if the avatar sheet defines one.
    pub fn avatar_asset(&self, state: AvatarState) -> Option<&str> {
        self.avatar_assets.get(state.label()).map(String::as_str)
    }

    /// Parse the sheet-shaped payload.
    ///
    /// Accepts either `{"database": {…sheets…}}` or the bare sheets object.
    ///
    /// # Errors
    ///
    /// Returns [`KioskError::Serialization`] when the payload (or its
    /// `database` field) is not a JSON object.  Malformed rows inside an
    /// otherwise valid payload are skipped, not rejected.
    pub fn from_sheets(payload: &Value) -> Result<Self, KioskError> {
        let sheets = payload
            .get("database")
            .unwrap_or(payload)
            .as_object()
            .ok_or_else(|| {
                KioskError::Serialization("knowledge payload is not an object of sheets".into())
            })?;

        let mut table = Self::new();
        for (name, rows) in sheets {
            let rows: Vec<Vec<String>> = rows
                .as_array()
                .map(|rows| rows.iter().filter_map(row_cells).collect())
                .unwrap_or_default();

            match name.as_str() {
                QUICK_QUESTION_SHEET => {
                    for row in rows.iter().skip(1) {
                        table.push_quick_question([
                            (Language::Thai, cell(row, 0)),
                            (Language::English, cell(row, 1)),
                        ]);
                    }
                }
                AVATAR_SHEET => {
                    for row in &rows {
                        let state = cell(row, 0).trim().to_lowercase();
                        let asset = cell(row, 1).trim();
                        if !state.is_empty() && !asset.is_empty() {
                            table.avatar_assets.insert(state, asset.to_string());
                        }
                    }
                }
                CONFIG_SHEET => {}
                _ => {
                    let entries: Vec<KnowledgeEntry> = rows
                        .iter()
                        .map(|row| {
                            KnowledgeEntry::bilingual(cell(row, 0), cell(row, 1), cell(row, 2))
                        })
                        .filter(KnowledgeEntry::is_searchable)
                        .collect();
                    debug!(sheet = %name, entries = entries.len(), "loaded knowledge sheet");
                    table.push_category(name.clone(), entries);
                }
            }
        }
        Ok(table)
    }
}

fn row_cells(row: &Value) -> Option<Vec<String>> {
    row.as_array()
        .map(|cells| cells.iter().map(cell_text).collect())
}

/// Render a cell as text; sheet cells may be numbers or booleans.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}
