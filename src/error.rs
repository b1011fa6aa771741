use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while assembling a disk image.
///
/// Every variant names the placement it came from so the operator can tell
/// which part of the layout failed.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// A file-backed source could not be opened.
    SourceNotFound {
        placement: String,
        path: PathBuf,
        reason: String,
    },
    /// A read from a source or a write of the image failed.
    IoFailure {
        placement: String,
        path: PathBuf,
        reason: String,
    },
    /// A region starts or ends past the last sector of the image.
    LayoutOverflow {
        placement: String,
        start_sector: usize,
        length_sectors: usize,
        total_sectors: usize,
    },
    /// Two regions share sectors while overlap is rejected.
    LayoutOverlap { first: String, second: String },
    /// Sector size, sector count or a region length is unusable.
    InvalidGeometry(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::SourceNotFound { placement, path, reason } => {
                write!(f, "{placement}: source not found: {} ({reason})", path.display())
            }
            BuildError::IoFailure { placement, path, reason } => {
                write!(f, "{placement}: I/O failure on {}: {reason}", path.display())
            }
            BuildError::LayoutOverflow {
                placement,
                start_sector,
                length_sectors,
                total_sectors,
            } => {
                write!(
                    f,
                    "{placement}: region at sector {start_sector} spanning {length_sectors} sectors \
                     does not fit in {total_sectors} sectors"
                )
            }
            BuildError::LayoutOverlap { first, second } => {
                write!(f, "{second}: region overlaps {first}")
            }
            BuildError::InvalidGeometry(msg) => {
                write!(f, "invalid geometry: {msg}")
            }
        }
    }
}

impl std::error::Error for BuildError {}
