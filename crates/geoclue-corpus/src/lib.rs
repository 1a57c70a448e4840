pub mod builder;
pub mod query;
pub mod similarity;
pub mod snapshot;
pub mod store;

pub use builder::{BatchFailure, BuildOutput, BuildReport, CorpusBuilder};
pub use query::{rank_matches, QueryEngine};
pub use similarity::cosine_similarity;
pub use store::CorpusStore;
