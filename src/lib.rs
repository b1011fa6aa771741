//! Assembles a flat, bootable disk image from a boot sector, a kernel and a
//! few inline payloads, each placed at a fixed sector offset.
//!
//! The default [`BootLayout`] produces a 32-sector image of 512-byte sectors:
//!
//! | Order | Placement  | Sectors | Source                 |
//! |-------|------------|---------|------------------------|
//! | 1     | bootloader | 0       | `bootloader.bin`       |
//! | 2     | fat        | 1       | placeholder marker     |
//! | 3     | readme     | 2       | inline text            |
//! | 4     | message    | 3       | inline text            |
//! | 5     | kernel     | 2..=11  | `kernel.bin`           |
//!
//! The kernel region overlaps the two text sectors and is applied last, so
//! every byte the kernel supplies replaces the text underneath it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bootimg::BuildConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     bootimg::build(BuildConfig::default()).await?;
//!     Ok(())
//! }
//! ```

pub use assembler::{BuildReport, ImageAssembler, PlacementRecord, build};
pub use error::BuildError;
pub use image::{DiskImage, fit};
pub use layout::{BootLayout, BuildConfig, ByteSource, Fill, Placement, SectorRegion};

mod assembler;
pub mod error;
mod image;
pub mod layout;
mod source;

pub type Result<T> = std::result::Result<T, BuildError>;
