mod convert;
mod model;
mod splice;

pub use model::{Exon, Exons, Gene, GeneGroup, Junction, Orientation, Transcript, TranscriptKind};
pub use splice::{FullLength, GeneOutcome, Outcome, Placement, SpliceMatcher};
