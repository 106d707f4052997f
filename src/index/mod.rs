/*!
The two lookup structures scoring relies on: the canonical gold keys of a document collection and
the candidate mentions indexed by sentence and token span.
*/
mod candidates;
mod ground_truth;

pub use candidates::CandidateIndex;
pub use ground_truth::{BuildStats, GoldMention, GroundTruthIndex};
