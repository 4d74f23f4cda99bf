//! Record contents

use serde::{Deserialize, Serialize};

/// Stored content of a live record.
///
/// A record exists exactly when the store holds an entry for its id; a
/// fresh record with `seq_num == 0` is still a live record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Primary payload reference
    pub content_uri: String,
    /// Number of content updates since creation
    pub seq_num: u64,
}

impl Record {
    /// New record at sequence zero
    pub fn new(content_uri: impl Into<String>) -> Self {
        Self {
            content_uri: content_uri.into(),
            seq_num: 0,
        }
    }

    /// Replace the content and bump the sequence number, returning the new
    /// sequence number
    pub fn replace_content(&mut self, content_uri: impl Into<String>) -> u64 {
        self.content_uri = content_uri.into();
        self.seq_num += 1;
        self.seq_num
    }
}
