//! Textual metadata keys of the form `<Namespace>.<Path>`.
//!
//! - `Exif.<Group>.<Tag>`: group is one of `Image`, `Photo`, `GPSInfo`,
//!   `Iop`, `Thumbnail`; the tag is a dictionary name or `0xNNNN`.
//! - `Iptc.<Record>.<Dataset>`: record is `Envelope` or `Application2`
//!   (or its number in hex); the dataset is a dictionary name or `0xNNNN`.
//! - `Xmp.<prefix>.<path>`: the path is kept whole, e.g.
//!   `Xmp.dc.title` or `Xmp.iptcExt.LocationShown[1]/Iptc4xmpExt:City`.
//!
//! Prefix matching is exact and case-sensitive.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::tags::{self, ExifGroup, IptcRecord};
use crate::value::TypeId;

/// The three metadata namespaces a key can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Exif,
    Iptc,
    Xmp,
}

/// Behavior shared by the per-namespace key types.
pub trait MetadataKey: fmt::Display + Clone + PartialEq {
    /// Value type used when a key is written for the first time.
    fn default_type(&self) -> TypeId;
}

/// An Exif tag address: IFD group plus numeric tag id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExifKey {
    pub group: ExifGroup,
    pub tag: u16,
}

impl ExifKey {
    pub fn new(group: ExifGroup, tag: u16) -> Self {
        Self { group, tag }
    }

    /// Dictionary name of the tag, if it has one.
    pub fn tag_name(&self) -> Option<&'static str> {
        tags::exif_tag_by_id(self.group, self.tag).map(|t| t.name)
    }

    fn parse_rest(full: &str, rest: &str) -> Result<Self> {
        let (group, name) = rest
            .split_once('.')
            .ok_or_else(|| Error::InvalidKey(full.to_string()))?;
        let group = ExifGroup::from_name(group).ok_or_else(|| Error::InvalidKey(full.to_string()))?;
        let tag = tags::exif_tag_by_name(group, name)
            .map(|t| t.id)
            .or_else(|| tags::parse_hex(name))
            .ok_or_else(|| Error::InvalidKey(full.to_string()))?;
        Ok(Self { group, tag })
    }
}

impl fmt::Display for ExifKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag_name() {
            Some(name) => write!(f, "Exif.{}.{}", self.group.name(), name),
            None => write!(f, "Exif.{}.0x{:04x}", self.group.name(), self.tag),
        }
    }
}

impl MetadataKey for ExifKey {
    fn default_type(&self) -> TypeId {
        tags::exif_tag_by_id(self.group, self.tag)
            .map(|t| t.type_id)
            .unwrap_or(TypeId::Undefined)
    }
}

/// An IPTC dataset address: record plus dataset number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IptcKey {
    pub record: IptcRecord,
    pub dataset: u8,
}

impl IptcKey {
    pub fn new(record: IptcRecord, dataset: u8) -> Self {
        Self { record, dataset }
    }

    fn parse_rest(full: &str, rest: &str) -> Result<Self> {
        let invalid = || Error::InvalidKey(full.to_string());
        let (record, name) = rest.split_once('.').ok_or_else(invalid)?;
        let record = IptcRecord::from_name(record).ok_or_else(invalid)?;
        let dataset = match tags::iptc_dataset_by_name(record, name) {
            Some(info) => info.id,
            None => tags::parse_hex(name)
                .and_then(|id| u8::try_from(id).ok())
                .ok_or_else(invalid)?,
        };
        Ok(Self { record, dataset })
    }
}

impl fmt::Display for IptcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match tags::iptc_dataset_by_id(self.record, self.dataset) {
            Some(info) => write!(f, "Iptc.{}.{}", self.record.name(), info.name),
            None => write!(f, "Iptc.{}.0x{:04x}", self.record.name(), self.dataset),
        }
    }
}

impl MetadataKey for IptcKey {
    fn default_type(&self) -> TypeId {
        tags::iptc_dataset_by_id(self.record, self.dataset)
            .map(|d| d.type_id)
            .unwrap_or(TypeId::Undefined)
    }
}

/// An XMP property address: schema prefix plus the full property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmpKey {
    pub prefix: String,
    pub property: String,
}

impl XmpKey {
    pub fn new(prefix: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            property: property.into(),
        }
    }

    /// Name of the top-level property, without any struct or index path.
    pub fn base_property(&self) -> &str {
        let end = self
            .property
            .find(['/', '['])
            .unwrap_or(self.property.len());
        &self.property[..end]
    }

    fn parse_rest(full: &str, rest: &str) -> Result<Self> {
        let invalid = || Error::InvalidKey(full.to_string());
        let (prefix, property) = rest.split_once('.').ok_or_else(invalid)?;
        if !is_xml_name(prefix) || property.is_empty() {
            return Err(invalid());
        }
        let key = Self::new(prefix, property);
        if !is_xml_name(key.base_property()) {
            return Err(invalid());
        }
        Ok(key)
    }
}

impl fmt::Display for XmpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Xmp.{}.{}", self.prefix, self.property)
    }
}

impl MetadataKey for XmpKey {
    fn default_type(&self) -> TypeId {
        if self.property != self.base_property() {
            return TypeId::Text;
        }
        tags::xmp_property_type(&self.prefix, &self.property)
    }
}

/// Loose XML NCName check: a letter or underscore, then letters, digits,
/// `_`, `-` or `.`.
pub(crate) fn is_xml_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// A resolved key in one of the three namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Exif(ExifKey),
    Iptc(IptcKey),
    Xmp(XmpKey),
}

impl Key {
    /// Resolve a textual key into its namespace and tag path.
    pub fn parse(text: &str) -> Result<Self> {
        if let Some(rest) = text.strip_prefix("Exif.") {
            ExifKey::parse_rest(text, rest).map(Key::Exif)
        } else if let Some(rest) = text.strip_prefix("Iptc.") {
            IptcKey::parse_rest(text, rest).map(Key::Iptc)
        } else if let Some(rest) = text.strip_prefix("Xmp.") {
            XmpKey::parse_rest(text, rest).map(Key::Xmp)
        } else {
            Err(Error::InvalidKey(text.to_string()))
        }
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Exif(_) => Namespace::Exif,
            Self::Iptc(_) => Namespace::Iptc,
            Self::Xmp(_) => Namespace::Xmp,
        }
    }
}

impl MetadataKey for Key {
    fn default_type(&self) -> TypeId {
        match self {
            Self::Exif(k) => k.default_type(),
            Self::Iptc(k) => k.default_type(),
            Self::Xmp(k) => k.default_type(),
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exif(k) => k.fmt(f),
            Self::Iptc(k) => k.fmt(f),
            Self::Xmp(k) => k.fmt(f),
        }
    }
}
