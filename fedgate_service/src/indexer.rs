use fedgate_types::Fragment;

/// Replica entry every fragment is given. Hosts are not resolved, the field only exists for
/// compatibility with the response format.
pub const REPLICA_PLACEHOLDER: &str = "127.0.0.1";

/// Normalizes a freshly listed fragment list before it is published.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentIndexer;

impl FragmentIndexer {
    /// Number the fragments of each source `0, 1, ...` in list order, and replace their
    /// replicas with [`REPLICA_PLACEHOLDER`].
    ///
    /// Numbering restarts whenever the source name differs from the previous fragment's, so
    /// a source that shows up in two separate runs is numbered from zero twice.
    pub fn normalize(fragments: &mut [Fragment]) {
        let mut previous: Option<String> = None;
        let mut index = 0;

        for fragment in fragments {
            if previous.as_deref() != Some(fragment.source_name()) {
                previous = Some(fragment.source_name().to_owned());
                index = 0;
            }
            fragment.set_index(index);
            fragment.set_replicas(vec![REPLICA_PLACEHOLDER.to_owned()]);
            index += 1;
        }
    }
}
