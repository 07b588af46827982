use indexmap::IndexSet;
use noodles::sam;

/// Maps reference sequence names to the numeric ids used by the alignment file.
/// Both cursors of the merge are ordered by these ids, so the GTF must be sorted
/// in the same sequence order as the alignment header.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    names: IndexSet<String>,
}

impl ReferenceIndex {
    pub fn new(header: &sam::Header) -> Self {
        header
            .reference_sequences()
            .keys()
            .map(|name| name.to_string())
            .collect()
    }

    /// Id of a reference sequence, `None` if the alignment header does not know it.
    pub fn get_index_of(&self, chrom: &str) -> Option<usize> {
        self.names.get_index_of(chrom)
    }

    pub fn get_name(&self, tid: usize) -> Option<&str> {
        self.names.get_index(tid).map(|name| name.as_str())
    }

    /// Number of reference sequences.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ReferenceIndex {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
