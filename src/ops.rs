//! The five buffer-in, buffer-out operations.
//!
//! Every call opens its own [`Image`] over a private copy of the input and
//! drops it before returning, so calls share no state. The free functions
//! use the default [`Config`] and collapse every failure into an empty
//! record or `None`; [`Dispatcher`] carries a configuration and also
//! exposes the typed errors through its `try_*` methods.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::key::Key;
use crate::value::{self, TypedValue};

/// All metadata of an image, rendered to strings and keyed by full key.
///
/// A key that occurs several times in a store maps to its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub exif: BTreeMap<String, String>,
    pub iptc: BTreeMap<String, String>,
    pub xmp: BTreeMap<String, String>,
}

impl MetadataRecord {
    /// Build the record from the stores of an image that was already read.
    pub fn from_image(image: &Image) -> Self {
        fn render<'a, K: ToString + 'a>(
            entries: impl Iterator<Item = &'a crate::store::Entry<K>>,
        ) -> BTreeMap<String, String> {
            entries
                .map(|e| (e.key.to_string(), e.value.to_string()))
                .collect()
        }

        Self {
            exif: render(image.exif_data().iter()),
            iptc: render(image.iptc_data().iter()),
            xmp: render(image.xmp_data().iter()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exif.is_empty() && self.iptc.is_empty() && self.xmp.is_empty()
    }
}

/// Runs the operations under one configuration.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: Config,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn open(&self, buf: &[u8]) -> Result<Image> {
        let mut image = Image::open_with(buf, &self.config)?;
        image.read_metadata()?;
        Ok(image)
    }

    pub fn try_read(&self, buf: &[u8]) -> Result<MetadataRecord> {
        let image = self.open(buf)?;
        Ok(MetadataRecord::from_image(&image))
    }

    /// Rendered value of the first entry with `key`.
    pub fn try_read_tag_text(&self, buf: &[u8], key: &str) -> Result<String> {
        let key = Key::parse(key)?;
        let image = self.open(buf)?;
        image
            .find(&key)
            .map(ToString::to_string)
            .ok_or_else(|| Error::TagNotFound(key.to_string()))
    }

    /// Rendered value of `key` read back as decimal byte tokens.
    pub fn try_read_tag_bytes(&self, buf: &[u8], key: &str) -> Result<Vec<u8>> {
        let text = self.try_read_tag_text(buf, key)?;
        let bytes = value::parse_bytes(&text, self.config.codec.byte_tokens)?;
        if bytes.is_empty() {
            return Err(Error::encoding(format!("{key} has no byte representation")));
        }
        Ok(bytes)
    }

    /// Set `key` from text and return the rewritten buffer.
    pub fn try_write_string(&self, buf: &[u8], key: &str, text: &str) -> Result<Vec<u8>> {
        let key = Key::parse(key)?;
        let mut image = self.open(buf)?;
        image.assign_str(&key, text)?;
        image.write_metadata()?;
        image.flush()
    }

    /// Set `key` to a byte array and return the rewritten buffer.
    pub fn try_write_bytes(&self, buf: &[u8], key: &str, bytes: &[u8]) -> Result<Vec<u8>> {
        let key = Key::parse(key)?;
        self.write_value(buf, &key, value::build_from_bytes(bytes))
    }

    fn write_value(&self, buf: &[u8], key: &Key, value: TypedValue) -> Result<Vec<u8>> {
        let mut image = self.open(buf)?;
        image.set(key, value);
        image.write_metadata()?;
        image.flush()
    }

    pub fn read(&self, buf: &[u8]) -> MetadataRecord {
        self.try_read(buf)
            .map_err(|e| log_failure("read", None, &e))
            .unwrap_or_default()
    }

    pub fn read_tag_text(&self, buf: &[u8], key: &str) -> Option<String> {
        self.try_read_tag_text(buf, key)
            .map_err(|e| log_failure("readTagText", Some(key), &e))
            .ok()
    }

    pub fn read_tag_bytes(&self, buf: &[u8], key: &str) -> Option<Vec<u8>> {
        self.try_read_tag_bytes(buf, key)
            .map_err(|e| log_failure("readTagBytes", Some(key), &e))
            .ok()
    }

    pub fn write_string(&self, buf: &[u8], key: &str, text: &str) -> Option<Vec<u8>> {
        self.try_write_string(buf, key, text)
            .map_err(|e| log_failure("writeString", Some(key), &e))
            .ok()
    }

    pub fn write_bytes(&self, buf: &[u8], key: &str, bytes: &[u8]) -> Option<Vec<u8>> {
        self.try_write_bytes(buf, key, bytes)
            .map_err(|e| log_failure("writeBytes", Some(key), &e))
            .ok()
    }
}

fn log_failure(op: &str, key: Option<&str>, err: &Error) {
    let key = key.map(|k| format!(" {k}")).unwrap_or_default();
    match err {
        Error::TagNotFound(_) => log::debug!("{op}{key}: {err}"),
        _ => log::warn!("{op}{key} failed: {err}"),
    }
}

/// All Exif, IPTC and XMP metadata in `buf`. Empty on any failure.
pub fn read(buf: &[u8]) -> MetadataRecord {
    Dispatcher::default().read(buf)
}

/// Rendered value of `key`, or `None` if the buffer or key is unusable or
/// the tag is absent.
pub fn read_tag_text(buf: &[u8], key: &str) -> Option<String> {
    Dispatcher::default().read_tag_text(buf, key)
}

/// Value of `key` as bytes. `None` when the value renders to no byte
/// tokens at all.
pub fn read_tag_bytes(buf: &[u8], key: &str) -> Option<Vec<u8>> {
    Dispatcher::default().read_tag_bytes(buf, key)
}

/// Copy of `buf` with `key` set to `text`.
pub fn write_string(buf: &[u8], key: &str, text: &str) -> Option<Vec<u8>> {
    Dispatcher::default().write_string(buf, key, text)
}

/// Copy of `buf` with `key` set to the byte array `bytes`.
pub fn write_bytes(buf: &[u8], key: &str, bytes: &[u8]) -> Option<Vec<u8>> {
    Dispatcher::default().write_bytes(buf, key, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenPolicy;

    /// Little-endian TIFF with an empty IFD0.
    const EMPTY_TIFF: &[u8] = b"II*\0\x08\0\0\0\0\0\0\0\0\0";

    // ── read ──

    #[test]
    fn unsupported_buffer_reads_as_empty() {
        assert!(read(b"definitely not an image").is_empty());
        assert!(read(&[]).is_empty());
    }

    #[test]
    fn record_serializes_to_json() {
        let buf = write_string(EMPTY_TIFF, "Exif.Image.Artist", "Jane").unwrap();
        let json = serde_json::to_value(read(&buf)).unwrap();
        assert_eq!(json["exif"]["Exif.Image.Artist"], "Jane");
        assert!(json["iptc"].as_object().unwrap().is_empty());
    }

    // ── readTagText ──

    #[test]
    fn unknown_key_is_absent() {
        assert_eq!(read_tag_text(EMPTY_TIFF, "Bogus.Foo"), None);
        assert_eq!(read_tag_text(EMPTY_TIFF, "Exif.Image.Artist"), None);
        assert_eq!(read_tag_text(b"garbage", "Exif.Image.Artist"), None);
    }

    #[test]
    fn typed_errors_are_available() {
        let d = Dispatcher::default();
        assert!(matches!(d.try_read_tag_text(EMPTY_TIFF, "Bogus.Foo"), Err(Error::InvalidKey(_))));
        assert!(matches!(
            d.try_read_tag_text(EMPTY_TIFF, "Exif.Image.Artist"),
            Err(Error::TagNotFound(_))
        ));
        assert!(matches!(d.try_read(b"garbage"), Err(Error::UnsupportedFormat)));
    }

    // ── readTagBytes ──

    #[test]
    fn bytes_round_trip_through_exif() {
        let buf = write_bytes(EMPTY_TIFF, "Exif.Photo.UserComment", &[0, 1, 127, 255]).unwrap();
        assert_eq!(read_tag_text(&buf, "Exif.Photo.UserComment").as_deref(), Some("0 1 127 255"));
        assert_eq!(read_tag_bytes(&buf, "Exif.Photo.UserComment"), Some(vec![0, 1, 127, 255]));
    }

    #[test]
    fn text_without_byte_tokens_is_absent() {
        let buf = write_string(EMPTY_TIFF, "Exif.Image.Artist", "nobody").unwrap();
        assert_eq!(read_tag_bytes(&buf, "Exif.Image.Artist"), None);
    }

    #[test]
    fn strict_policy_rejects_out_of_range_tokens() {
        let buf = write_string(EMPTY_TIFF, "Exif.Image.Artist", "1 300 2").unwrap();
        assert_eq!(read_tag_bytes(&buf, "Exif.Image.Artist"), Some(vec![1, 2]));

        let mut config = Config::default();
        config.codec.byte_tokens = TokenPolicy::Strict;
        let strict = Dispatcher::new(config);
        assert!(matches!(
            strict.try_read_tag_bytes(&buf, "Exif.Image.Artist"),
            Err(Error::Encoding(_))
        ));
    }

    // ── write ──

    #[test]
    fn write_rejects_bad_input() {
        assert_eq!(write_string(EMPTY_TIFF, "Nope.Image.Artist", "x"), None);
        assert_eq!(write_string(b"garbage", "Exif.Image.Artist", "x"), None);
        assert_eq!(write_bytes(b"garbage", "Exif.Image.Artist", &[1]), None);
    }

    #[test]
    fn write_leaves_input_untouched() {
        let input = EMPTY_TIFF.to_vec();
        let output = write_string(&input, "Exif.Image.Artist", "Jane").unwrap();
        assert_eq!(input, EMPTY_TIFF);
        assert_ne!(output, input);
    }

    #[test]
    fn existing_entry_keeps_its_type() {
        let buf = write_string(EMPTY_TIFF, "Exif.Image.Orientation", "6").unwrap();
        let buf = write_string(&buf, "Exif.Image.Orientation", "3").unwrap();
        assert_eq!(read_tag_text(&buf, "Exif.Image.Orientation").as_deref(), Some("3"));
        assert_eq!(read(&buf).exif.len(), 1);
    }
}
