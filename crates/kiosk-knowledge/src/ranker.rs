//! Query ranking.
//!
//! # Algorithm
//!
//! For every sub-keyword `k` of every searchable entry (keywords of two
//! characters or fewer are too ambiguous and are skipped):
//!
//! * if the normalised query contains `k`, score `0.9 + len(k) / 100`
//!   (capped at `1.0`), so longer, more specific keywords win;
//! * otherwise score `similarity(query, k)`.
//!
//! The single best `(answer, score)` across the table is kept; ties keep the
//! entry seen first.  The answer is taken in the requested language, and an
//! entry with no answer in that language yields the
//! [`not_in_language`][crate::messages::not_in_language] message instead of
//! silently falling through to the other language.
//!
//! [`RankPolicy::decide`] then turns the raw score into a [`Decision`].

use kiosk_types::Language;

use crate::messages;
use crate::similarity::similarity;
use crate::table::KnowledgeTable;

/// Keywords this short or shorter never score.
const MIN_KEYWORD_CHARS: usize = 2;
/// Base score for a keyword found verbatim inside the query.
const CONTAINMENT_SCORE: f32 = 0.9;

/// Best match found for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Answer text in the requested language. Empty when nothing scored.
    pub answer: String,
    /// Confidence in `[0.0, 1.0]`.
    pub score: f32,
    /// Key phrase of the matched entry, as written in the sheet.
    pub key_phrase: String,
}

impl MatchResult {
    fn none() -> Self {
        Self {
            answer: String::new(),
            score: 0.0,
            key_phrase: String::new(),
        }
    }
}

/// Score `query` against every searchable entry in `table`.
///
/// Never fails: an empty table or an empty query yields a zero score.
pub fn rank(query: &str, table: &KnowledgeTable, language: Language) -> MatchResult {
    let query = query.trim().to_lowercase();
    let mut best = MatchResult::none();

    for category in table.searchable_categories() {
        for entry in category.entries.iter().filter(|e| e.is_searchable()) {
            for keyword in entry.keywords() {
                let chars = keyword.chars().count();
                if chars <= MIN_KEYWORD_CHARS {
                    continue;
                }
                let score = if query.contains(keyword.as_str()) {
                    (CONTAINMENT_SCORE + chars as f32 / 100.0).min(1.0)
                } else {
                    similarity(&query, keyword)
                };
                if score > best.score {
                    best = MatchResult {
                        answer: entry
                            .answer(language)
                            .map(str::to_string)
                            .unwrap_or_else(|| messages::not_in_language(language).to_string()),
                        score,
                        key_phrase: entry.key_phrase().to_string(),
                    };
                }
            }
        }
    }
    best
}

/// What the kiosk should do with a [`MatchResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Confident: speak the answer.
    Answer(MatchResult),
    /// Plausible: ask "did you mean …?" and wait for confirm / deny.
    Clarify(MatchResult),
    /// Nothing good enough: speak the fallback.
    NotFound,
}

/// Confidence thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankPolicy {
    /// Scores at or above this are answered directly.
    pub answer_threshold: f32,
    /// When set, scores in `[clarify_threshold, answer_threshold)` trigger a
    /// clarification prompt. `None` disables the band.
    pub clarify_threshold: Option<f32>,
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            answer_threshold: 0.45,
            clarify_threshold: None,
        }
    }
}

impl RankPolicy {
    pub fn decide(&self, result: MatchResult) -> Decision {
        if result.answer.is_empty() {
            return Decision::NotFound;
        }
        if result.score >= self.answer_threshold {
            return Decision::Answer(result);
        }
        match self.clarify_threshold {
            Some(floor) if result.score >= floor => Decision::Clarify(result),
            _ => Decision::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::KnowledgeEntry;

    fn table(entries: Vec<KnowledgeEntry>) -> KnowledgeTable {
        let mut t = KnowledgeTable::new();
        t.push_category("General", entries);
        t
    }

    #[test]
    fn thai_query_matches_license_entry() {
        let t = table(vec![KnowledgeEntry::bilingual(
            "ใบขับขี่ ทำใหม่",
            "ไปที่ช่อง 3",
            "Go to counter 3",
        )]);
        let result = rank("ทำใบขับขี่ใหม่ที่ไหน", &t, Language::Thai);
        assert!(result.score >= 0.45, "score was {}", result.score);
        assert_eq!(result.answer, "ไปที่ช่อง 3");
        assert_eq!(result.key_phrase, "ใบขับขี่ ทำใหม่");
    }

    #[test]
    fn answer_follows_requested_language() {
        let t = table(vec![KnowledgeEntry::bilingual("license", "ช่อง 3", "Counter 3")]);
        assert_eq!(rank("license?", &t, Language::English).answer, "Counter 3");
        assert_eq!(rank("license?", &t, Language::Thai).answer, "ช่อง 3");
    }

    #[test]
    fn missing_language_yields_not_available_message() {
        let t = table(vec![KnowledgeEntry::bilingual("ภาษีรถ", "ช่อง 5", "")]);
        let result = rank("ภาษีรถ", &t, Language::English);
        assert_eq!(result.answer, messages::not_in_language(Language::English));
        assert_ne!(result.answer, "ช่อง 5");
    }

    #[test]
    fn empty_table_scores_zero() {
        let result = rank("anything at all", &KnowledgeTable::new(), Language::Thai);
        assert_eq!(result.score, 0.0);
        assert!(result.answer.is_empty());
        assert_eq!(RankPolicy::default().decide(result), Decision::NotFound);
    }

    #[test]
    fn short_keywords_are_ignored() {
        let t = table(vec![KnowledgeEntry::bilingual("id ok", "a", "b")]);
        assert_eq!(rank("id ok", &t, Language::Thai).score, 0.0);
    }

    #[test]
    fn scores_stay_within_unit_interval() {
        let t = table(vec![
            KnowledgeEntry::bilingual("registration-certificate", "a", "b"),
            KnowledgeEntry::bilingual("tax", "c", "d"),
        ]);
        for q in ["", "registration-certificate copy", "tax", "zzzz", "ทะเบียน"] {
            let score = rank(q, &t, Language::English).score;
            assert!((0.0..=1.0).contains(&score), "{q}: {score}");
        }
    }

    #[test]
    fn longer_contained_keyword_wins() {
        let t = table(vec![
            KnowledgeEntry::bilingual("car", "short", "short"),
            KnowledgeEntry::bilingual("motorcycle", "long", "long"),
        ]);
        assert_eq!(rank("car or motorcycle", &t, Language::English).answer, "long");
    }

    #[test]
    fn ties_keep_first_seen_entry() {
        let mut t = KnowledgeTable::new();
        t.push_category("A", vec![KnowledgeEntry::bilingual("renew", "first", "first")]);
        t.push_category("B", vec![KnowledgeEntry::bilingual("renew", "second", "second")]);
        assert_eq!(rank("renew", &t, Language::Thai).answer, "first");
    }

    #[test]
    fn reserved_sheets_are_not_searched() {
        let mut t = KnowledgeTable::new();
        t.push_category("FAQ", vec![KnowledgeEntry::bilingual("renew", "faq", "faq")]);
        assert_eq!(rank("renew", &t, Language::Thai).score, 0.0);
    }

    #[test]
    fn policy_bands() {
        let result = |score: f32| MatchResult {
            answer: "x".to_string(),
            score,
            key_phrase: "k".to_string(),
        };
        let policy = RankPolicy {
            answer_threshold: 0.45,
            clarify_threshold: Some(0.35),
        };
        assert!(matches!(policy.decide(result(0.9)), Decision::Answer(_)));
        assert!(matches!(policy.decide(result(0.45)), Decision::Answer(_)));
        assert!(matches!(policy.decide(result(0.40)), Decision::Clarify(_)));
        assert_eq!(policy.decide(result(0.2)), Decision::NotFound);

        let strict = RankPolicy::default();
        assert_eq!(strict.decide(result(0.40)), Decision::NotFound);
    }
}
