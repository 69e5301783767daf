// Resume screening pipeline
// Implements: semantic scoring, keyphrase extraction, skill coverage, score fusion,
// ranking, and report building. Model calls go through `embedding::Embedder` only.

pub mod handlers;
pub mod keywords;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod similarity;
pub mod skills;

pub use pipeline::Screener;
