use crate::import::{Extracted, ExtractedPicture, MetadataExtractor};
use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

/// Reads tags, cover art and duration with lofty.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyExtractor;

impl MetadataExtractor for LoftyExtractor {
    fn extract(&self, path: &Path) -> Result<Extracted> {
        let stripped = crate::config::strip_windows_verbatim_prefix(path);
        let tagged_file = Probe::open(&stripped)
            .with_context(|| format!("failed to open {}", stripped.display()))?
            .read()
            .with_context(|| format!("failed to parse {}", stripped.display()))?;

        let duration = tagged_file.properties().duration();
        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag());

        Ok(Extracted {
            title: tag.and_then(|tag| clean(tag.title().as_deref())),
            artist: tag.and_then(|tag| clean(tag.artist().as_deref())),
            album: tag.and_then(|tag| clean(tag.album().as_deref())),
            duration_seconds: (!duration.is_zero()).then(|| duration.as_secs_f64()),
            picture: tag.and_then(cover_picture).map(|picture| ExtractedPicture {
                data: picture.data().to_vec(),
                mime_type: picture.mime_type().map(|mime| mime.as_str().to_string()),
            }),
        })
    }
}

fn cover_picture(tag: &Tag) -> Option<&Picture> {
    let pictures = tag.pictures();
    pictures
        .iter()
        .find(|picture| picture.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .filter(|picture| !picture.data().is_empty())
}

fn clean(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Turns a user selection into the list of files to import. Directories
/// contribute their audio files in path order; plain files are kept as given.
pub fn expand_selection(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_audio(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }

    files
}

/// Splits an input line into paths. Quoted segments may contain spaces.
pub fn parse_selection(input: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in input.chars() {
        match ch {
            '"' => quoted = !quoted,
            ch if ch.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            ch => current.push(ch),
        }
    }
    if !current.is_empty() {
        paths.push(PathBuf::from(current));
    }

    paths
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn directories_expand_to_sorted_audio_files() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("album");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(nested.join("b.flac"), b"").expect("write");
        fs::write(dir.path().join("a.MP3"), b"").expect("write");
        fs::write(dir.path().join("notes.txt"), b"").expect("write");

        let expanded = expand_selection(&[dir.path().to_path_buf()]);

        assert_eq!(
            expanded,
            vec![dir.path().join("a.MP3"), nested.join("b.flac")]
        );
    }

    #[test]
    fn plain_files_are_kept_even_when_missing() {
        let selection = vec![PathBuf::from("missing.ogg")];
        assert_eq!(expand_selection(&selection), selection);
    }

    #[test]
    fn selection_parsing_honours_quotes() {
        let parsed = parse_selection(r#"one.mp3 "My Music/two.flac"   three.wav"#);
        assert_eq!(
            parsed,
            vec![
                PathBuf::from("one.mp3"),
                PathBuf::from("My Music/two.flac"),
                PathBuf::from("three.wav"),
            ]
        );
        assert!(parse_selection("   ").is_empty());
    }

    #[test]
    fn lofty_rejects_unknown_formats() {
        let dir = tempdir().expect("tempdir");
        let bogus = dir.path().join("bogus.dat");
        fs::write(&bogus, b"definitely not audio").expect("write");

        assert!(LoftyExtractor.extract(&bogus).is_err());
    }

    #[test]
    fn audio_extension_check_is_case_insensitive() {
        assert!(is_audio(Path::new("x.OPUS")));
        assert!(!is_audio(Path::new("x.jpg")));
        assert!(!is_audio(Path::new("noext")));
    }
}
