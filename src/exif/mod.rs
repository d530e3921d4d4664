//! Exif metadata: the TIFF-structured block found in JPEG `APP1`, PNG
//! `eXIf` and at the head of TIFF files.
//!
//! - [`decode`] walks IFD0, the Exif/GPS/Interop sub-IFDs and IFD1 into an
//!   [`ExifData`] store.
//! - [`encode`] lays the store out as a fresh standalone TIFF block.
//! - [`encode_into`] appends a rebuilt IFD chain to an existing TIFF file so
//!   that everything the original offsets point at stays valid.

mod reader;
mod writer;

pub use reader::decode;
pub use writer::{encode, encode_into};

use crate::key::ExifKey;
use crate::store::{Entry, Store};
use crate::value::{ByteOrder, TypedValue};

/// Decoded Exif entries plus the structural details needed to write them
/// back.
#[derive(Debug, Clone, Default)]
pub struct ExifData {
    pub(crate) store: Store<ExifKey>,
    pub(crate) byte_order: ByteOrder,
    /// JPEG thumbnail referenced from IFD1.
    pub(crate) thumbnail: Option<Vec<u8>>,
    /// `next` pointer of the last decoded IFD. Non-zero for multi-page TIFF.
    pub(crate) next_ifd: u32,
}

impl ExifData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// The embedded IFD1 thumbnail, if any.
    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    pub fn store(&self) -> &Store<ExifKey> {
        &self.store
    }

    pub fn find(&self, key: &ExifKey) -> Option<&Entry<ExifKey>> {
        self.store.find(key)
    }

    pub fn upsert(&mut self, key: ExifKey, value: TypedValue) {
        self.store.upsert(key, value);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<ExifKey>> {
        self.store.iter()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }
}
