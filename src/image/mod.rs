//! Image containers: format detection, metadata extraction and commit.
//!
//! An [`Image`] owns a private copy of the input buffer in a [`MemIo`]
//! stream. [`Image::read_metadata`] splits the container into the three
//! namespace stores; [`Image::write_metadata`] re-encodes the stores that
//! were modified and rebuilds the container around them, leaving every
//! other segment as it was.

mod jpeg;
mod png;
mod tiff;

use std::fmt;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exif::ExifData;
use crate::io::MemIo;
use crate::iptc::{self, IptcData};
use crate::key::{Key, MetadataKey};
use crate::value::TypedValue;
use crate::xmp::{self, XmpData};

/// Container formats with a metadata handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Tiff,
}

impl ImageFormat {
    /// Identify a buffer by its leading signature.
    pub fn detect(data: &[u8]) -> Option<Self> {
        HANDLERS
            .iter()
            .find(|h| h.matches(data))
            .map(|h| h.format())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Tiff => "TIFF",
        }
    }

    fn handler(self) -> &'static dyn FormatHandler {
        match self {
            Self::Jpeg => &jpeg::JpegHandler,
            Self::Png => &png::PngHandler,
            Self::Tiff => &tiff::TiffHandler,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static HANDLERS: &[&dyn FormatHandler] = &[&jpeg::JpegHandler, &png::PngHandler, &tiff::TiffHandler];

/// Namespace blocks pulled out of a container.
///
/// Exif is decoded by the handler because TIFF files carry IPTC and XMP
/// inside it. IPTC is the bare IIM stream, XMP the packet bytes.
#[derive(Debug, Default)]
pub(crate) struct Extracted {
    pub exif: ExifData,
    pub iptc: Option<Vec<u8>>,
    pub xmp: Option<Vec<u8>>,
}

/// Encoded IPTC or XMP block handed to a handler on commit.
#[derive(Debug)]
pub(crate) struct Segment {
    /// New encoding when `changed`, otherwise the bytes originally read.
    /// `None` means the namespace is absent.
    pub bytes: Option<Vec<u8>>,
    pub changed: bool,
}

/// Everything a handler needs to rebuild its container.
#[derive(Debug)]
pub(crate) struct Commit<'a> {
    pub exif: &'a ExifData,
    pub iptc: Segment,
    pub xmp: Segment,
}

/// Per-format metadata access.
pub(crate) trait FormatHandler: Sync {
    fn format(&self) -> ImageFormat;

    fn matches(&self, data: &[u8]) -> bool;

    fn extract(&self, data: &[u8]) -> Result<Extracted>;

    /// Rebuild `data` with the committed metadata.
    fn write(&self, data: &[u8], commit: &Commit<'_>) -> Result<Vec<u8>>;
}

/// Decode an embedded Exif block, treating garbage as no metadata.
pub(crate) fn decode_embedded_exif(format: ImageFormat, data: &[u8]) -> ExifData {
    match crate::exif::decode(data) {
        Ok(exif) => exif,
        Err(e) => {
            log::warn!("Ignoring unreadable Exif block in {format}: {e}");
            ExifData::default()
        }
    }
}

/// An opened in-memory image and its metadata stores.
#[derive(Debug)]
pub struct Image {
    io: MemIo,
    format: ImageFormat,
    config: Config,
    exif: ExifData,
    iptc: IptcData,
    xmp: XmpData,
    raw_iptc: Option<Vec<u8>>,
    raw_xmp: Option<Vec<u8>>,
}

impl Image {
    /// Open `data` with the default configuration.
    pub fn open(data: &[u8]) -> Result<Self> {
        Self::open_with(data, &Config::default())
    }

    /// Copy `data` into a new image. Only the signature is checked here;
    /// call [`read_metadata`](Self::read_metadata) to parse the container.
    pub fn open_with(data: &[u8], config: &Config) -> Result<Self> {
        xmp::initialize();
        let format = ImageFormat::detect(data).ok_or(Error::UnsupportedFormat)?;
        log::debug!("Opened {} byte {format} buffer", data.len());
        Ok(Self {
            io: MemIo::new(data),
            format,
            config: config.clone(),
            exif: ExifData::default(),
            iptc: IptcData::default(),
            xmp: XmpData::default(),
            raw_iptc: None,
            raw_xmp: None,
        })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Parse the container and fill the three stores.
    pub fn read_metadata(&mut self) -> Result<()> {
        let extracted = self.format.handler().extract(self.io.as_slice())?;

        self.iptc = match extracted.iptc.as_deref().map(iptc::decode) {
            Some(Ok(data)) => data,
            Some(Err(e)) => {
                log::warn!("Ignoring unreadable IPTC block in {}: {e}", self.format);
                IptcData::default()
            }
            None => IptcData::default(),
        };
        self.xmp = match extracted.xmp.as_deref().map(xmp::decode) {
            Some(Ok(data)) => data,
            Some(Err(e)) => {
                log::warn!("Ignoring unreadable XMP packet in {}: {e}", self.format);
                XmpData::default()
            }
            None => XmpData::default(),
        };
        self.exif = extracted.exif;
        self.raw_iptc = extracted.iptc;
        self.raw_xmp = extracted.xmp;

        log::debug!(
            "{}: {} Exif, {} IPTC, {} XMP entries",
            self.format,
            self.exif.len(),
            self.iptc.len(),
            self.xmp.len()
        );
        Ok(())
    }

    pub fn exif_data(&self) -> &ExifData {
        &self.exif
    }

    pub fn iptc_data(&self) -> &IptcData {
        &self.iptc
    }

    pub fn xmp_data(&self) -> &XmpData {
        &self.xmp
    }

    /// Value of the first entry with `key`.
    pub fn find(&self, key: &Key) -> Option<&TypedValue> {
        match key {
            Key::Exif(k) => self.exif.find(k).map(|e| &e.value),
            Key::Iptc(k) => self.iptc.find(k).map(|e| &e.value),
            Key::Xmp(k) => self.xmp.find(k).map(|e| &e.value),
        }
    }

    /// Replace the first entry with `key` or append one.
    pub fn set(&mut self, key: &Key, value: TypedValue) {
        match key {
            Key::Exif(k) => self.exif.upsert(*k, value),
            Key::Iptc(k) => self.iptc.upsert(*k, value),
            Key::Xmp(k) => self.xmp.upsert(k.clone(), value),
        }
    }

    /// Assign text to `key`. An existing entry keeps its type and parses the
    /// text accordingly; a new entry takes the key's default type.
    pub fn assign_str(&mut self, key: &Key, text: &str) -> Result<()> {
        let policy = self.config.codec.byte_tokens;
        let value = match self.find(key) {
            Some(current) => {
                let mut value = current.clone();
                value.assign_str(text, policy)?;
                value
            }
            None => TypedValue::parse(key.default_type(), text, policy)?,
        };
        self.set(key, value);
        Ok(())
    }

    /// `true` if any store was modified since it was read.
    pub fn is_modified(&self) -> bool {
        self.exif.is_dirty() || self.iptc.is_dirty() || self.xmp.is_dirty()
    }

    /// Encode the modified stores back into the in-memory container.
    pub fn write_metadata(&mut self) -> Result<()> {
        if !self.is_modified() {
            log::debug!("{}: nothing to commit", self.format);
            return Ok(());
        }

        let iptc = if self.iptc.is_dirty() {
            Segment {
                bytes: iptc::encode(&self.iptc),
                changed: true,
            }
        } else {
            Segment {
                bytes: self.raw_iptc.clone(),
                changed: false,
            }
        };
        let xmp = if self.xmp.is_dirty() {
            Segment {
                bytes: xmp::encode(&self.xmp, self.config.xmp.padding)?,
                changed: true,
            }
        } else {
            Segment {
                bytes: self.raw_xmp.clone(),
                changed: false,
            }
        };
        let commit = Commit {
            exif: &self.exif,
            iptc,
            xmp,
        };

        let output = self.format.handler().write(self.io.as_slice(), &commit)?;
        log::debug!(
            "{}: committed metadata, {} -> {} bytes",
            self.format,
            self.io.size(),
            output.len()
        );

        self.raw_iptc = commit.iptc.bytes;
        self.raw_xmp = commit.xmp.bytes;
        self.io.transfer(output);
        self.exif.store.mark_clean();
        self.iptc.store.mark_clean();
        self.xmp.store.mark_clean();
        Ok(())
    }

    /// Copy of the whole current buffer, reflecting the last commit.
    pub fn flush(&mut self) -> Result<Vec<u8>> {
        self.io.read_all()
    }
}
