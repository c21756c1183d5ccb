use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LoadError, LoadErrorKind};

/// Program image: origin address followed by the words to place there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    origin: u16,
    words: Vec<u16>,
}

impl Image {
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        Image { origin, words }
    }

    pub fn origin(&self) -> u16 {
        self.origin
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Parse the object file format: a big-endian origin, then big-endian words.
    pub fn from_bytes(bytes: &[u8]) -> Result<Image, LoadErrorKind> {
        if bytes.len() < 2 {
            return Err(LoadErrorKind::MissingOrigin);
        }
        if bytes.len() % 2 != 0 {
            return Err(LoadErrorKind::Unaligned);
        }

        let mut words = bytes
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]));
        // Checked above
        let origin = words.next().unwrap_or_default();
        Ok(Image::new(origin, words.collect()))
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Image, LoadError> {
        let path = path.as_ref();
        let error = |kind| LoadError {
            path: PathBuf::from(path),
            kind,
        };
        let bytes = fs::read(path).map_err(|e| error(LoadErrorKind::Io(e)))?;
        Image::from_bytes(&bytes).map_err(error)
    }

    /// Address of the last word this image places in memory, `None` if it has no words.
    pub fn end(&self) -> Option<u16> {
        let len = self.words.len().min(0x10000 - self.origin as usize);
        let last = len.checked_sub(1)?;
        Some(self.origin.wrapping_add(last as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_big_endian() {
        let image = Image::from_bytes(&[0x30, 0x00, 0x54, 0x20, 0x10, 0x25]).unwrap();
        assert_eq!(image.origin(), 0x3000);
        assert_eq!(image.words(), &[0x5420, 0x1025]);
        assert_eq!(image.end(), Some(0x3001));
    }

    #[test]
    fn origin_only() {
        let image = Image::from_bytes(&[0x40, 0x00]).unwrap();
        assert_eq!(image.origin(), 0x4000);
        assert!(image.words().is_empty());
        assert_eq!(image.end(), None);
    }

    #[test]
    fn end_stops_at_top_of_memory() {
        let image = Image::new(0xfffe, vec![1, 2, 3]);
        assert_eq!(image.end(), Some(0xffff));
    }

    #[test]
    fn rejects_short_and_unaligned() {
        assert!(matches!(
            Image::from_bytes(&[]),
            Err(LoadErrorKind::MissingOrigin)
        ));
        assert!(matches!(
            Image::from_bytes(&[0x30]),
            Err(LoadErrorKind::MissingOrigin)
        ));
        assert!(matches!(
            Image::from_bytes(&[0x30, 0x00, 0x12]),
            Err(LoadErrorKind::Unaligned)
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Image::read("does/not/exist.obj").unwrap_err();
        assert_eq!(err.path, PathBuf::from("does/not/exist.obj"));
        assert!(matches!(err.kind, LoadErrorKind::Io(_)));
        assert!(err.to_string().contains("does/not/exist.obj"));
    }
}
