use std::path::PathBuf;

/// Failures while building the reference model. These are fatal at startup.
#[derive(thiserror::Error, Debug)]
pub enum ReferenceError {
    #[error("no reference image path configured")]
    MissingPath,

    #[error("failed to load reference image {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("reference image contains no usable contour")]
    NoContours,
}
