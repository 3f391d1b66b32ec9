use std::{fmt, sync::Arc};

use crate::storage::FileUrlSigner;

/// Per-request inputs that output formatters need beyond the event itself.
#[derive(Clone, Default)]
pub struct StreamContext {
    /// Storage root that relative tool output paths resolve against.
    pub working_dir: Option<String>,
    pub signer: Option<Arc<dyn FileUrlSigner>>,
}

impl StreamContext {
    pub fn new(working_dir: Option<String>, signer: Option<Arc<dyn FileUrlSigner>>) -> Self {
        Self {
            working_dir: working_dir.filter(|dir| !dir.is_empty()),
            signer,
        }
    }
}

impl fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamContext")
            .field("working_dir", &self.working_dir)
            .field("signer", &self.signer.is_some())
            .finish()
    }
}
