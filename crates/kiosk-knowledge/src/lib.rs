//! `kiosk-knowledge` – The Knowledge Base.
//!
//! Holds the bilingual question/answer table the kiosk answers from and the
//! ranking logic that maps a free-text query onto it.
//!
//! # Modules
//!
//! - [`similarity`] – [`similarity`][similarity::similarity]: normalised
//!   edit-distance score between two short strings.
//! - [`table`] – [`KnowledgeTable`][table::KnowledgeTable]: categories of
//!   [`KnowledgeEntry`][table::KnowledgeEntry] rows plus the reserved
//!   quick-question and avatar-asset sheets, parsed from the sheet-shaped
//!   JSON payload.
//! - [`ranker`] – [`rank`][ranker::rank] and
//!   [`RankPolicy`][ranker::RankPolicy]: keyword containment + similarity
//!   scoring, and the answer / clarify / not-found decision on top of it.
//! - [`messages`] – fixed phrases (welcome, not found, please wait, …) in
//!   every supported language.
//! - [`source`] – [`KnowledgeSource`][source::KnowledgeSource]: loading the
//!   table from the remote endpoint or a local file, with retry, and the
//!   fire-and-forget [`QueryLog`][source::QueryLog].

pub mod messages;
pub mod ranker;
pub mod similarity;
pub mod source;
pub mod table;

pub use ranker::{Decision, MatchResult, RankPolicy, rank};
pub use similarity::{levenshtein, similarity};
pub use source::{
    FileKnowledgeSource, HttpKnowledgeSource, KnowledgeSource, QueryLog, fetch_with_retry,
};
pub use table::{Category, KnowledgeEntry, KnowledgeTable};
