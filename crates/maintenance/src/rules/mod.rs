//! Rule extraction pipeline.
//!
//! Rules are read from the `rules` table (joined with their template and the
//! tenant's metadata), converted into denormalized [`RuleDocument`]s and written
//! to the rules index.
//!
//! - [`RuleScroll`]: lazy, forward-only scroll producing documents
//! - [`RuleDocumentTransform`]: pure row-to-document conversion
//! - [`RuleIndexer`]: drains a scroll into the search index in bulk batches

mod indexer;
mod key;
mod markup;
mod model;
mod scroll;
mod transform;

pub use indexer::{IndexingReport, RuleIndexer, RuleIndexerConfig};
pub use key::{ParseRuleKeyError, RuleKey};
pub use markup::{MarkupRenderer, RuleMarkdown};
pub use model::{DescriptionFormat, RuleDocument, RuleRow, RuleType, Severity};
pub use scroll::{RuleDocumentSink, RuleDocuments, RuleScroll, SQL_ALL, SQL_RULE_KEY};
pub use transform::{RuleDocumentTransform, split_tags, union_tags};
