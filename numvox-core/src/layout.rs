use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::range::NumberRange;
use crate::words::number_to_words;

const AUDIO_EXTENSION: &str = "wav";

/// One number queued for synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberRequest {
    pub index: u32,
    pub text: String,
    pub output_path: PathBuf,
}

/// Where generated audio lives on disk. The files themselves are the resume
/// state: an index whose file exists is never requested again.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if it is missing.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {:?}", self.dir))
    }

    pub fn file_name(index: u32) -> String {
        format!("{index:05}.{AUDIO_EXTENSION}")
    }

    pub fn path_for(&self, index: u32) -> PathBuf {
        self.dir.join(Self::file_name(index))
    }

    pub fn already_generated(&self, index: u32) -> bool {
        self.path_for(index).is_file()
    }

    pub fn request_for(&self, index: u32) -> NumberRequest {
        NumberRequest {
            index,
            text: number_to_words(index),
            output_path: self.path_for(index),
        }
    }

    /// All generated audio files, sorted by name. A missing directory holds
    /// no files.
    pub fn generated_files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read output directory {:?}", self.dir))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_audio = path.extension().and_then(|e| e.to_str()) == Some(AUDIO_EXTENSION);
            if is_audio && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Number of indices in `range` that already have a file.
    pub fn count_generated(&self, range: NumberRange) -> usize {
        range
            .iter()
            .filter(|index| self.already_generated(*index))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_is_zero_padded() {
        assert_eq!(OutputLayout::file_name(7), "00007.wav");
        assert_eq!(OutputLayout::file_name(8000), "08000.wav");
    }

    #[test]
    fn test_request_for() {
        let layout = OutputLayout::new("out");
        let request = layout.request_for(101);
        assert_eq!(request.index, 101);
        assert_eq!(request.text, "one oh one");
        assert_eq!(request.output_path, PathBuf::from("out").join("00101.wav"));
    }

    #[test]
    fn test_already_generated() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());

        assert!(!layout.already_generated(3));
        fs::write(layout.path_for(3), b"RIFF").unwrap();
        assert!(layout.already_generated(3));
        assert!(!layout.already_generated(4));
    }

    #[test]
    fn test_partial_file_is_not_generated() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());

        fs::write(temp.path().join("00003.wav.part"), b"RIF").unwrap();
        assert!(!layout.already_generated(3));
        assert!(layout.generated_files().unwrap().is_empty());
    }

    #[test]
    fn test_generated_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());

        for name in ["00010.wav", "00002.wav", "notes.txt"] {
            fs::write(temp.path().join(name), b"x").unwrap();
        }
        fs::create_dir(temp.path().join("nested.wav")).unwrap();

        let names: Vec<String> = layout
            .generated_files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["00002.wav", "00010.wav"]);
    }

    #[test]
    fn test_missing_dir_has_no_files() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path().join("absent"));
        assert!(layout.generated_files().unwrap().is_empty());
    }

    #[test]
    fn test_count_generated_respects_range() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        for index in [1, 2, 50] {
            fs::write(layout.path_for(index), b"x").unwrap();
        }

        let range = NumberRange::new(1, 10).unwrap();
        assert_eq!(layout.count_generated(range), 2);
    }
}
