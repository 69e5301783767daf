// Text preparation shared by the embedder and the skill matcher.
// Everything here is pure and synchronous: no model calls, no I/O.

pub mod chunker;
pub mod normalize;
pub mod tokenize;

pub use chunker::chunk;
pub use normalize::normalize;
pub use tokenize::tokenize_and_remove_stopwords;
