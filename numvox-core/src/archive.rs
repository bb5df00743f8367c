use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::layout::OutputLayout;

pub const DEFAULT_ARCHIVE_NAME: &str = "number_audio_files.zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub files: usize,
    pub bytes: u64,
}

impl ArchiveReport {
    pub fn size_mb(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Zip every generated WAV in `layout` into `archive_path`, stored under its
/// bare file name.
pub fn create_archive(layout: &OutputLayout, archive_path: &Path) -> Result<ArchiveReport> {
    info!("Creating zip archive...");

    let files = layout.generated_files()?;
    if files.is_empty() {
        bail!("No audio files found to archive in {:?}", layout.dir());
    }

    let archive = File::create(archive_path)
        .with_context(|| format!("Failed to create archive {archive_path:?}"))?;
    let mut writer = ZipWriter::new(archive);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Audio file without a name: {path:?}"))?;

        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {name} to archive"))?;
        let mut source = File::open(path).with_context(|| format!("Failed to open {path:?}"))?;
        io::copy(&mut source, &mut writer)
            .with_context(|| format!("Failed to compress {path:?}"))?;
    }

    writer.finish().context("Failed to finish archive")?;

    let bytes = std::fs::metadata(archive_path)
        .with_context(|| format!("Failed to stat {archive_path:?}"))?
        .len();
    let report = ArchiveReport {
        path: archive_path.to_path_buf(),
        files: files.len(),
        bytes,
    };

    info!(
        path = ?report.path,
        "Zip archive created ({:.1}MB)",
        report.size_mb()
    );
    info!("Archive contains {} audio files", report.files);
    Ok(report)
}
