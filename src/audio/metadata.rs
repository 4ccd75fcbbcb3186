//! Song titles from audio file tags
//!
//! Uses lofty to read ID3v2 (MP3), Vorbis comments (FLAC/OGG), MP4 and AIFF tags.

use lofty::{Accessor, Probe, TaggedFileExt};
use std::path::Path;
use tracing::{debug, warn};

/// Title for a song file: the tag title if present, otherwise the file stem
///
/// Tag read failures are logged and fall back to the file name.
pub fn extract_title(path: &Path) -> String {
    let tagged = match read_tag_title(path) {
        Ok(title) => title,
        Err(e) => {
            warn!("Failed to read tags from {}: {}", path.display(), e);
            None
        }
    };

    tagged.unwrap_or_else(|| file_title(path))
}

/// Title derived from the file name alone
pub fn file_title(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_tag_title(path: &Path) -> Result<Option<String>, lofty::error::LoftyError> {
    let tagged_file = Probe::open(path)?.read()?;
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    match tag {
        Some(tag) => Ok(tag
            .title()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())),
        None => {
            debug!("No tags found in {}", path.display());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_title_uses_stem() {
        assert_eq!(file_title(Path::new("/music/Blue Monday.mp3")), "Blue Monday");
        assert_eq!(file_title(Path::new("track")), "track");
    }

    #[test]
    fn test_missing_file_falls_back_to_name() {
        assert_eq!(extract_title(Path::new("/nope/Song Name.flac")), "Song Name");
    }
}
