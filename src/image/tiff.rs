use super::{Commit, Extracted, FormatHandler, ImageFormat};
use crate::error::Result;
use crate::exif::{self, ExifData};
use crate::key::ExifKey;
use crate::tags::{ExifGroup, TAG_IPTC_NAA, TAG_XMP_PACKET};
use crate::value::{TypeId, TypedValue};

pub(crate) struct TiffHandler;

impl FormatHandler for TiffHandler {
    fn format(&self) -> ImageFormat {
        ImageFormat::Tiff
    }

    fn matches(&self, data: &[u8]) -> bool {
        data.starts_with(b"II*\0") || data.starts_with(b"MM\0*")
    }

    fn extract(&self, data: &[u8]) -> Result<Extracted> {
        let mut exif = exif::decode(data)?;
        let iptc = take_blob(&mut exif, TAG_IPTC_NAA);
        let xmp = take_blob(&mut exif, TAG_XMP_PACKET);
        Ok(Extracted { exif, iptc, xmp })
    }

    fn write(&self, data: &[u8], commit: &Commit<'_>) -> Result<Vec<u8>> {
        let mut exif = commit.exif.clone();
        let order = exif.byte_order;

        if let Some(iim) = commit.iptc.bytes.as_deref() {
            // Conventionally typed LONG, so the stream is padded to whole words
            let mut padded = iim.to_vec();
            padded.resize(iim.len().next_multiple_of(4), 0);
            let words = padded.chunks_exact(4).map(|w| order.read_u32(w)).collect();
            exif.store
                .push(ExifKey::new(ExifGroup::Image, TAG_IPTC_NAA), TypedValue::Long(words));
        }
        if let Some(packet) = commit.xmp.bytes.as_deref() {
            exif.store.push(
                ExifKey::new(ExifGroup::Image, TAG_XMP_PACKET),
                TypedValue::Byte(packet.to_vec()),
            );
        }

        exif::encode_into(data, &exif)
    }
}

/// Detach an IFD0 tag holding an embedded metadata block and return its
/// raw bytes as they appear in the file.
fn take_blob(exif: &mut ExifData, tag: u16) -> Option<Vec<u8>> {
    let order = exif.byte_order;
    let value = exif.store.take(&ExifKey::new(ExifGroup::Image, tag))?;
    let (_, _, mut bytes) = value.to_tiff(order);
    if value.type_id() == TypeId::Ascii {
        bytes.pop();
    }
    Some(bytes)
}
