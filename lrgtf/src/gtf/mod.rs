mod reader;
mod record;
mod writer;

pub use reader::GeneGroupReader;
pub use record::{is_comment, Feature, GtfRecord, ParseError};
pub use writer::GtfWriter;
