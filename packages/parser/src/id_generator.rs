use crc32fast::Hasher;
use trellis_common::NodeUid;

/// Seed shared by every uid of one document: CRC32 of its path, as 8 hex digits
pub fn document_seed(path: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(path.as_bytes());
    format!("{:08x}", hasher.finalize())
}

/// Hands out `<seed>-<n>` uids in the order nodes are met. One generator
/// per parse, so the same text always yields the same uids.
#[derive(Clone, Debug)]
pub struct NodeUidGenerator {
    seed: String,
    issued: u32,
}

impl NodeUidGenerator {
    pub fn for_document(path: &str) -> Self {
        Self::from_seed(document_seed(path))
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            issued: 0,
        }
    }

    pub fn next_uid(&mut self) -> NodeUid {
        self.issued += 1;
        format!("{}-{}", self.seed, self.issued)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Number of uids handed out so far
    pub fn issued(&self) -> u32 {
        self.issued
    }
}
