use std::path::PathBuf;

use crate::Result;
use crate::error::BuildError;

pub const SECTOR_SIZE: usize = 512;
pub const TOTAL_SECTORS: usize = 32;

pub const BOOT_SECTOR: usize = 0;
pub const FAT_SECTOR: usize = 1;
pub const README_SECTOR: usize = 2;
pub const MESSAGE_SECTOR: usize = 3;
pub const KERNEL_START_SECTOR: usize = 2;
pub const KERNEL_SECTORS: usize = 10;

/// Placeholder allocation table marker written at the start of the FAT sector.
pub const FAT_MARKER: [u8; 5] = [0xFF, 0xFF, 0x03, 0x04, 0xFF];

pub const README_TEXT: &str = "This is a README file. You can see me with the `cat` command!";
pub const MESSAGE_TEXT: &str = "This is a test message. Welcome to the terminal!";

/// A contiguous run of sectors reserved for one placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRegion {
    pub start_sector: usize,
    pub length_sectors: usize,
}

impl SectorRegion {
    pub fn new(start_sector: usize, length_sectors: usize) -> Self {
        Self { start_sector, length_sectors }
    }

    /// One past the last sector, or `None` on overflow.
    pub fn end_sector(&self) -> Option<usize> { self.start_sector.checked_add(self.length_sectors) }

    pub fn byte_offset(&self, sector_size: usize) -> usize { self.start_sector * sector_size }

    pub fn capacity(&self, sector_size: usize) -> usize { self.length_sectors * sector_size }

    pub fn overlaps(&self, other: &SectorRegion) -> bool {
        let (Some(end), Some(other_end)) = (self.end_sector(), other.end_sector()) else {
            return false;
        };
        self.start_sector < other_end && other.start_sector < end
    }
}

/// Where a placement takes its bytes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ByteSource {
    /// Read from the start of a file at build time.
    File(PathBuf),
    /// Embedded in the configuration.
    Inline(Vec<u8>),
}

impl ByteSource {
    pub fn file(path: impl Into<PathBuf>) -> Self { ByteSource::File(path.into()) }

    /// A NUL-terminated text payload.
    pub fn text(text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        ByteSource::Inline(bytes)
    }
}

/// How a placement treats the part of its region the source does not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Only the source bytes are written; the rest keeps its prior contents.
    Overlay,
    /// The whole region is rewritten, zero-padded after the source.
    ZeroPad,
}

/// One step of the build: copy `source` into `region`.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: String,
    pub region: SectorRegion,
    pub source: ByteSource,
    pub fill: Fill,
}

impl Placement {
    pub fn new(name: &str, region: SectorRegion, source: ByteSource, fill: Fill) -> Self {
        Self {
            name: name.to_string(),
            region,
            source,
            fill,
        }
    }
}

/// Immutable description of one build.
///
/// Placements are applied in list order; where regions overlap, the later
/// placement wins for every byte it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub image_path: PathBuf,
    pub sector_size: usize,
    pub total_sectors: usize,
    pub placements: Vec<Placement>,
    /// Fail validation instead of warning when regions overlap.
    pub reject_overlap: bool,
}

impl BuildConfig {
    /// Total image size in bytes, or `None` if it overflows.
    pub fn image_len(&self) -> Option<usize> { self.sector_size.checked_mul(self.total_sectors) }

    /// Checks geometry and that every region fits the image.
    ///
    /// Returns the pairs of placement names whose regions overlap, in
    /// application order. With `reject_overlap` set the first such pair is
    /// an error instead.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::InvalidGeometry` for a zero sector size, zero
    /// sector count, zero-length region or an image size that overflows.
    /// Returns `BuildError::LayoutOverflow` if a region ends past the last
    /// sector.
    /// Returns `BuildError::LayoutOverlap` if regions overlap and
    /// `reject_overlap` is set.
    pub fn validate(&self) -> Result<Vec<(String, String)>> {
        if self.sector_size == 0 {
            return Err(BuildError::InvalidGeometry("sector size must be positive".to_string()));
        }
        if self.total_sectors == 0 {
            return Err(BuildError::InvalidGeometry(
                "total sector count must be positive".to_string(),
            ));
        }
        if self.image_len().is_none() {
            return Err(BuildError::InvalidGeometry(format!(
                "{} sectors of {} bytes overflow the address space",
                self.total_sectors, self.sector_size
            )));
        }

        for placement in &self.placements {
            if placement.region.length_sectors == 0 {
                return Err(BuildError::InvalidGeometry(format!(
                    "{}: region length must be positive",
                    placement.name
                )));
            }
            let fits = placement
                .region
                .end_sector()
                .is_some_and(|end| end <= self.total_sectors);
            if !fits {
                return Err(BuildError::LayoutOverflow {
                    placement: placement.name.clone(),
                    start_sector: placement.region.start_sector,
                    length_sectors: placement.region.length_sectors,
                    total_sectors: self.total_sectors,
                });
            }
        }

        let mut overlaps = Vec::new();
        for (i, later) in self.placements.iter().enumerate() {
            for earlier in &self.placements[..i] {
                if earlier.region.overlaps(&later.region) {
                    if self.reject_overlap {
                        return Err(BuildError::LayoutOverlap {
                            first: earlier.name.clone(),
                            second: later.name.clone(),
                        });
                    }
                    overlaps.push((earlier.name.clone(), later.name.clone()));
                }
            }
        }

        Ok(overlaps)
    }
}

impl Default for BuildConfig {
    fn default() -> Self { BootLayout::default().into_config() }
}

/// The boot disk layout with every constant exposed.
///
/// `into_config` turns it into the ordered placement list: bootloader, FAT,
/// readme, message, kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct BootLayout {
    pub image_path: PathBuf,
    pub bootloader_path: PathBuf,
    pub kernel_path: PathBuf,
    pub sector_size: usize,
    pub total_sectors: usize,
    pub boot_sector: usize,
    pub fat_sector: usize,
    pub fat_marker: Vec<u8>,
    pub readme_sector: usize,
    pub readme_text: String,
    pub message_sector: usize,
    pub message_text: String,
    pub kernel_start_sector: usize,
    pub kernel_sectors: usize,
    pub reject_overlap: bool,
}

impl Default for BootLayout {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("disk.img"),
            bootloader_path: PathBuf::from("bootloader.bin"),
            kernel_path: PathBuf::from("kernel.bin"),
            sector_size: SECTOR_SIZE,
            total_sectors: TOTAL_SECTORS,
            boot_sector: BOOT_SECTOR,
            fat_sector: FAT_SECTOR,
            fat_marker: FAT_MARKER.to_vec(),
            readme_sector: README_SECTOR,
            readme_text: README_TEXT.to_string(),
            message_sector: MESSAGE_SECTOR,
            message_text: MESSAGE_TEXT.to_string(),
            kernel_start_sector: KERNEL_START_SECTOR,
            kernel_sectors: KERNEL_SECTORS,
            reject_overlap: false,
        }
    }
}

impl BootLayout {
    pub fn into_config(self) -> BuildConfig {
        let placements = vec![
            Placement::new(
                "bootloader",
                SectorRegion::new(self.boot_sector, 1),
                ByteSource::File(self.bootloader_path),
                Fill::Overlay,
            ),
            Placement::new(
                "fat",
                SectorRegion::new(self.fat_sector, 1),
                ByteSource::Inline(self.fat_marker),
                Fill::ZeroPad,
            ),
            Placement::new(
                "readme",
                SectorRegion::new(self.readme_sector, 1),
                ByteSource::text(&self.readme_text),
                Fill::ZeroPad,
            ),
            Placement::new(
                "message",
                SectorRegion::new(self.message_sector, 1),
                ByteSource::text(&self.message_text),
                Fill::ZeroPad,
            ),
            Placement::new(
                "kernel",
                SectorRegion::new(self.kernel_start_sector, self.kernel_sectors),
                ByteSource::File(self.kernel_path),
                Fill::Overlay,
            ),
        ];

        BuildConfig {
            image_path: self.image_path,
            sector_size: self.sector_size,
            total_sectors: self.total_sectors,
            placements,
            reject_overlap: self.reject_overlap,
        }
    }
}
