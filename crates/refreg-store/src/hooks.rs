//! Hooks the registry exposes to its collaborators

use refreg_core::{Identity, RecordId, Result};

/// Read access to record content for indexing and presentation layers
pub trait RecordContent {
    /// Current content URI
    fn content_uri(&self, id: RecordId) -> Result<String>;

    /// Number of content updates since creation
    fn seq_num(&self, id: RecordId) -> Result<u64>;
}

/// Pre-transfer veto consulted by an external ledger before it moves a
/// record between holders
pub trait TransferHook {
    /// Succeed iff a holder-initiated transfer of `id` from `from` to `to`
    /// is currently permitted
    fn check_transfer(&self, id: RecordId, from: Identity, to: Identity) -> Result<()>;
}
