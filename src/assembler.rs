use log::{debug, info, warn};

use crate::Result;
use crate::image::{DiskImage, fit};
use crate::layout::{BuildConfig, Fill};
use crate::source::{self, io_failure};

/// What one placement did to the image.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRecord {
    pub name: String,
    pub start_sector: usize,
    pub length_sectors: usize,
    /// Source bytes copied into the region.
    pub copied: usize,
    /// The source was longer than the region.
    pub truncated: bool,
}

/// Summary of a finished build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub image_len: usize,
    pub placements: Vec<PlacementRecord>,
    /// Pairs of placements whose regions overlap; the second one won.
    pub overlaps: Vec<(String, String)>,
}

/// Builds one disk image from a [`BuildConfig`].
///
/// The image is assembled in memory and written to `image_path` only after
/// every placement has succeeded, so a failed build never creates or
/// truncates the output file.
///
/// # Examples
///
/// ```rust
/// use bootimg::{BootLayout, ImageAssembler};
///
/// # tokio_test::block_on(async {
/// let dir = std::env::temp_dir();
/// let pid = std::process::id();
/// let boot = dir.join(format!("doc-{pid}-boot.bin"));
/// let kernel = dir.join(format!("doc-{pid}-kernel.bin"));
/// tokio::fs::write(&boot, b"\xEB\xFE").await.unwrap();
/// tokio::fs::write(&kernel, vec![0x90u8; 16]).await.unwrap();
///
/// let config = BootLayout {
///     bootloader_path: boot,
///     kernel_path: kernel,
///     ..BootLayout::default()
/// }
/// .into_config();
///
/// let image = ImageAssembler::new(config).assemble().await.unwrap();
/// assert_eq!(image.len(), 16384);
/// assert_eq!(&image.sector(0)[..2], &[0xEB, 0xFE]);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ImageAssembler {
    config: BuildConfig,
}

impl ImageAssembler {
    pub fn new(config: BuildConfig) -> Self { Self { config } }

    pub fn config(&self) -> &BuildConfig { &self.config }

    /// Validates the layout and applies every placement to a fresh image.
    ///
    /// Nothing is written to `image_path`.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::InvalidGeometry`, `BuildError::LayoutOverflow` or
    /// `BuildError::LayoutOverlap` if the layout fails validation.
    /// Returns `BuildError::SourceNotFound` if a source file cannot be opened.
    /// Returns `BuildError::IoFailure` if reading a source file fails.
    pub async fn assemble(&self) -> Result<DiskImage> {
        self.assemble_with_report().await.map(|(image, _)| image)
    }

    /// Assembles the image and writes it to `image_path`.
    ///
    /// The file is created or truncated and ends up exactly
    /// `sector_size * total_sectors` bytes long.
    ///
    /// # Errors
    ///
    /// Returns every error [`ImageAssembler::assemble`] can, in which case the
    /// output file is left untouched.
    /// Returns `BuildError::IoFailure` with placement `finalize` if the image
    /// cannot be written.
    pub async fn run(&self) -> Result<BuildReport> {
        let (image, report) = self.assemble_with_report().await?;

        let path = &self.config.image_path;
        tokio::fs::write(path, image.as_bytes())
            .await
            .map_err(|e| io_failure("finalize", path, e))?;

        info!("wrote {} bytes to {}", image.len(), path.display());
        Ok(report)
    }

    async fn assemble_with_report(&self) -> Result<(DiskImage, BuildReport)> {
        let config = &self.config;
        let overlaps = config.validate()?;
        for (first, second) in &overlaps {
            warn!("{second} region overlaps {first}; {second} is applied last and wins");
        }

        let mut image = DiskImage::new(config.sector_size, config.total_sectors);
        debug!(
            "allocated {} sectors of {} bytes",
            config.total_sectors, config.sector_size
        );

        let mut placements = Vec::with_capacity(config.placements.len());
        for placement in &config.placements {
            let capacity = placement.region.capacity(config.sector_size);
            let offset = placement.region.byte_offset(config.sector_size);
            let loaded = source::load(&placement.name, &placement.source, capacity).await?;

            let len = match placement.fill {
                Fill::Overlay => loaded.bytes.len(),
                Fill::ZeroPad => capacity,
            };
            image.write(offset, &fit(&loaded.bytes, len));

            if loaded.truncated {
                debug!("{}: source truncated to {capacity} bytes", placement.name);
            }
            debug!(
                "{}: {} bytes at sector {} ({} sectors)",
                placement.name,
                loaded.bytes.len(),
                placement.region.start_sector,
                placement.region.length_sectors
            );

            placements.push(PlacementRecord {
                name: placement.name.clone(),
                start_sector: placement.region.start_sector,
                length_sectors: placement.region.length_sectors,
                copied: loaded.bytes.len(),
                truncated: loaded.truncated,
            });
        }

        let report = BuildReport {
            image_len: image.len(),
            placements,
            overlaps,
        };
        Ok((image, report))
    }
}

/// Builds the image described by `config` and writes it to disk.
///
/// # Errors
///
/// Same as [`ImageAssembler::run`].
pub async fn build(config: BuildConfig) -> Result<()> {
    ImageAssembler::new(config).run().await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::BuildError;
    use crate::layout::{
        BootLayout, ByteSource, FAT_MARKER, MESSAGE_TEXT, Placement, README_TEXT, SectorRegion,
    };

    struct Scratch {
        dir: PathBuf,
    }

    impl Scratch {
        async fn new(name: &str) -> Self {
            let dir = std::env::temp_dir()
                .join(format!("bootimg-assembler-{}-{name}", std::process::id()));
            tokio::fs::create_dir_all(&dir).await.unwrap();
            Self { dir }
        }

        fn path(&self, file: &str) -> PathBuf { self.dir.join(file) }

        async fn file(&self, file: &str, bytes: &[u8]) -> PathBuf {
            let path = self.path(file);
            tokio::fs::write(&path, bytes).await.unwrap();
            path
        }

        async fn layout(&self, bootloader: &[u8], kernel: &[u8]) -> BootLayout {
            BootLayout {
                image_path: self.path("disk.img"),
                bootloader_path: self.file("bootloader.bin", bootloader).await,
                kernel_path: self.file("kernel.bin", kernel).await,
                ..BootLayout::default()
            }
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) { let _ = std::fs::remove_dir_all(&self.dir); }
    }

    fn marker_sector() -> Vec<u8> { fit(&FAT_MARKER, 512) }

    fn text_sector(text: &str) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        fit(&bytes, 512)
    }

    #[tokio::test]
    async fn test_end_to_end_default_layout() -> Result<()> {
        let scratch = Scratch::new("end-to-end").await;
        let config = scratch.layout(&[0xAA; 512], &[0xBB; 5120]).await.into_config();
        let image_path = config.image_path.clone();

        build(config).await?;

        let bytes = tokio::fs::read(&image_path).await.unwrap();
        assert_eq!(bytes.len(), 16384);
        assert_eq!(&bytes[..512], &[0xAA; 512][..]);
        assert_eq!(&bytes[512..1024], &marker_sector()[..]);
        assert!(bytes[1024..6144].iter().all(|&b| b == 0xBB));
        assert!(bytes[6144..].iter().all(|&b| b == 0));

        Ok(())
    }

    #[tokio::test]
    async fn test_short_bootloader_is_zero_padded() -> Result<()> {
        let scratch = Scratch::new("short-boot").await;
        let config = scratch.layout(&[0xEB, 0x3C, 0x90], &[]).await.into_config();

        let image = ImageAssembler::new(config).assemble().await?;

        let mut expected = vec![0u8; 512];
        expected[..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        assert_eq!(image.sector(0), &expected[..]);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_kernel_keeps_text_sectors() -> Result<()> {
        let scratch = Scratch::new("empty-kernel").await;
        let config = scratch.layout(&[0x55; 512], &[]).await.into_config();

        let image = ImageAssembler::new(config).assemble().await?;

        assert_eq!(image.sector(1), &marker_sector()[..]);
        assert_eq!(image.sector(2), &text_sector(README_TEXT)[..]);
        assert_eq!(image.sector(3), &text_sector(MESSAGE_TEXT)[..]);
        assert!(image.read(4 * 512, 28 * 512).iter().all(|&b| b == 0));

        Ok(())
    }

    #[tokio::test]
    async fn test_short_kernel_overwrites_only_its_bytes() -> Result<()> {
        let scratch = Scratch::new("short-kernel").await;
        let config = scratch.layout(&[0x55; 512], &[0xCC; 10]).await.into_config();

        let image = ImageAssembler::new(config).assemble().await?;

        let readme = text_sector(README_TEXT);
        assert_eq!(&image.sector(2)[..10], &[0xCC; 10]);
        assert_eq!(&image.sector(2)[10..], &readme[10..]);
        assert_eq!(image.sector(3), &text_sector(MESSAGE_TEXT)[..]);

        Ok(())
    }

    #[tokio::test]
    async fn test_long_kernel_is_truncated() -> Result<()> {
        let scratch = Scratch::new("long-kernel").await;
        let kernel: Vec<u8> = (0..6000u32).map(|i| (i % 251) as u8).collect();
        let config = scratch.layout(&[0x55; 600], &kernel).await.into_config();

        let report = ImageAssembler::new(config.clone()).run().await?;

        let bytes = tokio::fs::read(&config.image_path).await.unwrap();
        assert_eq!(bytes.len(), 16384);
        assert_eq!(&bytes[1024..6144], &kernel[..5120]);
        assert!(bytes[6144..].iter().all(|&b| b == 0));
        assert_eq!(&bytes[..512], &[0x55; 512][..]);

        let boot = &report.placements[0];
        assert_eq!((boot.copied, boot.truncated), (512, true));
        let kernel_record = &report.placements[4];
        assert_eq!(kernel_record.name, "kernel");
        assert_eq!((kernel_record.copied, kernel_record.truncated), (5120, true));
        assert_eq!(report.overlaps.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_disjoint_kernel_region() -> Result<()> {
        let scratch = Scratch::new("disjoint").await;
        let layout = BootLayout {
            kernel_start_sector: 4,
            reject_overlap: true,
            ..scratch.layout(&[0x55; 512], &[0xBB; 5120]).await
        };

        let image = ImageAssembler::new(layout.into_config()).assemble().await?;

        assert_eq!(image.sector(2), &text_sector(README_TEXT)[..]);
        assert_eq!(image.sector(3), &text_sector(MESSAGE_TEXT)[..]);
        assert!(image.read(4 * 512, 5120).iter().all(|&b| b == 0xBB));
        assert!(image.read(14 * 512, 18 * 512).iter().all(|&b| b == 0));

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_bootloader_leaves_no_image() {
        let scratch = Scratch::new("missing-boot").await;
        let mut config = scratch.layout(&[], &[0xBB; 16]).await.into_config();
        let missing = scratch.path("nope.bin");
        config.placements[0].source = ByteSource::File(missing.clone());

        let result = build(config).await;

        assert!(matches!(
            &result,
            Err(BuildError::SourceNotFound { placement, path, .. })
                if placement == "bootloader" && *path == missing
        ));
        assert!(!scratch.path("disk.img").exists());
    }

    #[tokio::test]
    async fn test_overflow_fails_before_reading_sources() {
        let config = BuildConfig {
            image_path: PathBuf::from("unused.img"),
            sector_size: 512,
            total_sectors: 4,
            placements: vec![Placement::new(
                "kernel",
                SectorRegion::new(2, 10),
                ByteSource::file("does-not-exist.bin"),
                Fill::Overlay,
            )],
            reject_overlap: false,
        };

        let result = ImageAssembler::new(config).assemble().await;
        assert!(matches!(result, Err(BuildError::LayoutOverflow { .. })));
    }

    #[tokio::test]
    async fn test_unwritable_output_is_io_failure() {
        let scratch = Scratch::new("unwritable").await;
        let mut config = scratch.layout(&[0x55; 512], &[]).await.into_config();
        config.image_path = scratch.path("no-such-dir").join("disk.img");

        let result = build(config).await;
        assert!(matches!(
            result,
            Err(BuildError::IoFailure { ref placement, .. }) if placement == "finalize"
        ));
    }

    #[tokio::test]
    async fn test_custom_geometry() -> Result<()> {
        let config = BuildConfig {
            image_path: PathBuf::from("unused.img"),
            sector_size: 16,
            total_sectors: 4,
            placements: vec![
                Placement::new(
                    "a",
                    SectorRegion::new(1, 2),
                    ByteSource::Inline(vec![1; 40]),
                    Fill::ZeroPad,
                ),
                Placement::new(
                    "b",
                    SectorRegion::new(2, 1),
                    ByteSource::Inline(vec![2; 4]),
                    Fill::Overlay,
                ),
            ],
            reject_overlap: false,
        };

        let image = ImageAssembler::new(config).assemble().await?;

        // "a" fills sectors 1-2 with ones; "b" overlays only its 4 bytes.
        assert_eq!(image.len(), 64);
        assert_eq!(image.sector(0), &[0u8; 16]);
        assert_eq!(image.sector(1), &[1u8; 16]);
        assert_eq!(&image.sector(2)[..4], &[2u8; 4]);
        assert_eq!(&image.sector(2)[4..], &[1u8; 12]);
        assert_eq!(image.sector(3), &[0u8; 16]);

        Ok(())
    }
}
