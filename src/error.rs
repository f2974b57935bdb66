use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a run: the document cannot be read, modified or written.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to open PDF {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("malformed PDF structure: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to encode PDF: {0}")]
    Encode(String),

    #[error("failed to write annotated PDF {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
