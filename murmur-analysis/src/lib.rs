//! Pure post-processing of fetched posts: text cleanup, sentiment labels and
//! a small tabular projection with summary statistics.
pub mod sentiment;
pub mod table;
pub mod text;

pub use sentiment::{PolarityScorer, Sentiment, VaderScorer, classify_sentiment};
pub use table::{Metric, PostRow, PostTable, Summary, to_table};
pub use text::clean_text;
