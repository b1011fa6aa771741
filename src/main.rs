use std::path::PathBuf;
use std::process::ExitCode;

use bootimg::layout::{
    BOOT_SECTOR, FAT_SECTOR, KERNEL_SECTORS, KERNEL_START_SECTOR, MESSAGE_SECTOR, MESSAGE_TEXT,
    README_SECTOR, README_TEXT, SECTOR_SIZE, TOTAL_SECTORS,
};
use bootimg::{BootLayout, ImageAssembler};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::debug;

fn sector_arg(name: &'static str, env: &'static str, default: usize, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .env(env)
        .help(help)
        .action(ArgAction::Set)
        .value_parser(value_parser!(usize))
        .default_value(default.to_string())
}

fn path_arg(name: &'static str, env: &'static str, default: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .env(env)
        .help(help)
        .action(ArgAction::Set)
        .value_parser(value_parser!(PathBuf))
        .default_value(default)
}

fn cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(path_arg("bootloader", "BOOTIMG_BOOTLOADER", "bootloader.bin", "Boot sector binary"))
        .arg(path_arg("kernel", "BOOTIMG_KERNEL", "kernel.bin", "Kernel binary"))
        .arg(path_arg("output", "BOOTIMG_OUTPUT", "disk.img", "Image file to create").short('o'))
        .arg(sector_arg("sector-size", "BOOTIMG_SECTOR_SIZE", SECTOR_SIZE, "Bytes per sector"))
        .arg(sector_arg("total-sectors", "BOOTIMG_TOTAL_SECTORS", TOTAL_SECTORS, "Sectors in the image"))
        .arg(sector_arg("boot-sector", "BOOTIMG_BOOT_SECTOR", BOOT_SECTOR, "Sector of the boot code"))
        .arg(sector_arg("fat-sector", "BOOTIMG_FAT_SECTOR", FAT_SECTOR, "Sector of the allocation table"))
        .arg(sector_arg("readme-sector", "BOOTIMG_README_SECTOR", README_SECTOR, "Sector of the readme text"))
        .arg(sector_arg("message-sector", "BOOTIMG_MESSAGE_SECTOR", MESSAGE_SECTOR, "Sector of the message text"))
        .arg(sector_arg("kernel-start", "BOOTIMG_KERNEL_START", KERNEL_START_SECTOR, "First kernel sector"))
        .arg(sector_arg("kernel-sectors", "BOOTIMG_KERNEL_SECTORS", KERNEL_SECTORS, "Sectors reserved for the kernel"))
        .arg(
            Arg::new("readme-text")
                .long("readme-text")
                .env("BOOTIMG_README_TEXT")
                .action(ArgAction::Set)
                .default_value(README_TEXT),
        )
        .arg(
            Arg::new("message-text")
                .long("message-text")
                .env("BOOTIMG_MESSAGE_TEXT")
                .action(ArgAction::Set)
                .default_value(MESSAGE_TEXT),
        )
        .arg(
            Arg::new("reject-overlap")
                .long("reject-overlap")
                .help("Fail instead of warning when placement regions overlap")
                .action(ArgAction::SetTrue),
        )
}

fn layout_from(matches: &ArgMatches) -> BootLayout {
    let path = |name: &str| matches.get_one::<PathBuf>(name).cloned().unwrap_or_default();
    let sectors = |name: &str| matches.get_one::<usize>(name).copied().unwrap_or_default();
    let text = |name: &str| matches.get_one::<String>(name).cloned().unwrap_or_default();

    BootLayout {
        image_path: path("output"),
        bootloader_path: path("bootloader"),
        kernel_path: path("kernel"),
        sector_size: sectors("sector-size"),
        total_sectors: sectors("total-sectors"),
        boot_sector: sectors("boot-sector"),
        fat_sector: sectors("fat-sector"),
        readme_sector: sectors("readme-sector"),
        readme_text: text("readme-text"),
        message_sector: sectors("message-sector"),
        message_text: text("message-text"),
        kernel_start_sector: sectors("kernel-start"),
        kernel_sectors: sectors("kernel-sectors"),
        reject_overlap: matches.get_flag("reject-overlap"),
        ..BootLayout::default()
    }
}

async fn run(matches: &ArgMatches) -> ExitCode {
    let config = layout_from(matches).into_config();
    let image_path = config.image_path.clone();

    match ImageAssembler::new(config).run().await {
        Ok(report) => {
            for record in &report.placements {
                debug!(
                    "{}: sectors {}..{} <- {} bytes{}",
                    record.name,
                    record.start_sector,
                    record.start_sector + record.length_sectors,
                    record.copied,
                    if record.truncated { " (truncated)" } else { "" }
                );
            }
            println!("Disk image '{}' created successfully!", image_path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(&cli().get_matches()).await
}
