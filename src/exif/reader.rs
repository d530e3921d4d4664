use std::collections::HashSet;

use super::ExifData;
use crate::error::{Error, Result};
use crate::key::ExifKey;
use crate::tags::{
    ExifGroup, TAG_EXIF_IFD, TAG_GPS_IFD, TAG_INTEROP_IFD, TAG_THUMBNAIL_LENGTH,
    TAG_THUMBNAIL_OFFSET,
};
use crate::value::{ByteOrder, TypeId, TypedValue};

const FORMAT: &str = "TIFF";

/// Sub-IFD pointers. They describe layout, not metadata, so they never
/// become store entries.
pub(crate) fn is_pointer_tag(tag: u16) -> bool {
    matches!(tag, TAG_EXIF_IFD | TAG_GPS_IFD | TAG_INTEROP_IFD)
}

/// A directory entry with its value bytes resolved.
struct RawEntry<'a> {
    tag: u16,
    type_code: u16,
    type_id: Option<TypeId>,
    count: u32,
    data: &'a [u8],
}

struct Ifd<'a> {
    entries: Vec<RawEntry<'a>>,
    next: u32,
}

impl Ifd<'_> {
    /// First numeric component of `tag`, for offsets and lengths.
    fn first_u32(&self, tag: u16, order: ByteOrder) -> Option<u32> {
        let entry = self.entries.iter().find(|e| e.tag == tag)?;
        match entry.type_id? {
            TypeId::Long | TypeId::SLong if entry.data.len() >= 4 => Some(order.read_u32(entry.data)),
            TypeId::Short | TypeId::SShort if entry.data.len() >= 2 => {
                Some(order.read_u16(entry.data) as u32)
            }
            _ => None,
        }
    }
}

/// Parse the 8-byte TIFF header: byte order, magic 42, IFD0 offset.
pub(crate) fn read_header(data: &[u8]) -> Result<(ByteOrder, u32)> {
    if data.len() < 8 {
        return Err(Error::corrupt(FORMAT, "header truncated"));
    }
    let order = match &data[0..2] {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return Err(Error::corrupt(FORMAT, "invalid byte order mark")),
    };
    if order.read_u16(&data[2..]) != 42 {
        return Err(Error::corrupt(FORMAT, "bad magic number"));
    }
    Ok((order, order.read_u32(&data[4..])))
}

/// Decode a TIFF-structured Exif block.
///
/// A malformed IFD0 fails the whole block. Broken sub-IFDs and individual
/// entries that point outside the buffer are skipped.
pub fn decode(data: &[u8]) -> Result<ExifData> {
    let (order, ifd0_offset) = read_header(data)?;
    let mut exif = ExifData {
        byte_order: order,
        ..Default::default()
    };
    let mut visited = HashSet::new();

    let ifd0 = read_ifd(data, ifd0_offset, order, &mut visited)?;
    collect(&mut exif, ExifGroup::Image, &ifd0, order);

    let photo = ifd0
        .first_u32(TAG_EXIF_IFD, order)
        .and_then(|off| read_sub_ifd(data, ExifGroup::Photo, off, order, &mut visited));
    if let Some(photo) = &photo {
        collect(&mut exif, ExifGroup::Photo, photo, order);
        if let Some(iop) = photo
            .first_u32(TAG_INTEROP_IFD, order)
            .and_then(|off| read_sub_ifd(data, ExifGroup::Iop, off, order, &mut visited))
        {
            collect(&mut exif, ExifGroup::Iop, &iop, order);
        }
    }

    if let Some(gps) = ifd0
        .first_u32(TAG_GPS_IFD, order)
        .and_then(|off| read_sub_ifd(data, ExifGroup::GpsInfo, off, order, &mut visited))
    {
        collect(&mut exif, ExifGroup::GpsInfo, &gps, order);
    }

    if ifd0.next != 0 {
        if let Some(ifd1) = read_sub_ifd(data, ExifGroup::Thumbnail, ifd0.next, order, &mut visited) {
            collect(&mut exif, ExifGroup::Thumbnail, &ifd1, order);
            exif.thumbnail = thumbnail(data, &ifd1, order);
            exif.next_ifd = ifd1.next;
        }
    }

    log::debug!(
        "Decoded {} Exif entries ({:?}, thumbnail: {})",
        exif.store.len(),
        order,
        exif.thumbnail.is_some()
    );
    Ok(exif)
}

fn collect(exif: &mut ExifData, group: ExifGroup, ifd: &Ifd<'_>, order: ByteOrder) {
    for entry in &ifd.entries {
        if is_pointer_tag(entry.tag) {
            continue;
        }
        let value = match entry.type_id {
            Some(type_id) => TypedValue::from_tiff(type_id, entry.data, order),
            None => TypedValue::Opaque {
                code: entry.type_code,
                count: entry.count,
                data: entry.data.to_vec(),
            },
        };
        exif.store.push(ExifKey::new(group, entry.tag), value);
    }
}

fn read_sub_ifd<'a>(
    data: &'a [u8],
    group: ExifGroup,
    offset: u32,
    order: ByteOrder,
    visited: &mut HashSet<usize>,
) -> Option<Ifd<'a>> {
    match read_ifd(data, offset, order, visited) {
        Ok(ifd) => Some(ifd),
        Err(e) => {
            log::warn!("Skipping {} IFD: {e}", group.name());
            None
        }
    }
}

fn read_ifd<'a>(
    data: &'a [u8],
    offset: u32,
    order: ByteOrder,
    visited: &mut HashSet<usize>,
) -> Result<Ifd<'a>> {
    let offset = offset as usize;
    if !visited.insert(offset) {
        return Err(Error::corrupt(FORMAT, format!("IFD loop at offset {offset}")));
    }
    let entries_start = offset
        .checked_add(2)
        .filter(|start| *start <= data.len())
        .ok_or_else(|| Error::corrupt(FORMAT, format!("IFD offset {offset} out of bounds")))?;
    let count = order.read_u16(&data[offset..]) as usize;
    let entries_end = entries_start + count * 12;
    if entries_end.checked_add(4).is_none_or(|end| end > data.len()) {
        return Err(Error::corrupt(
            FORMAT,
            format!("IFD at {offset} with {count} entries runs past end of data"),
        ));
    }

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let raw = &data[entries_start + i * 12..entries_start + (i + 1) * 12];
        let tag = order.read_u16(raw);
        let type_code = order.read_u16(&raw[2..]);
        let components = order.read_u32(&raw[4..]) as usize;

        // Unknown types are read with one byte per component and kept opaque
        let type_id = TypeId::from_tiff_code(type_code);
        if type_id.is_none() {
            log::debug!("Tag 0x{tag:04x} has unknown field type {type_code}, keeping raw bytes");
        }
        let size = type_id.map_or(1, TypeId::tiff_size);
        let Some(len) = components.checked_mul(size) else {
            log::debug!("Skipping tag 0x{tag:04x}: component count overflows");
            continue;
        };

        let value = if len <= 4 {
            &raw[8..8 + len]
        } else {
            let value_offset = order.read_u32(&raw[8..]) as usize;
            match value_offset
                .checked_add(len)
                .and_then(|end| data.get(value_offset..end))
            {
                Some(v) => v,
                None => {
                    log::debug!(
                        "Skipping tag 0x{tag:04x}: {len} bytes at offset {value_offset} out of bounds"
                    );
                    continue;
                }
            }
        };
        entries.push(RawEntry {
            tag,
            type_code,
            type_id,
            count: components as u32,
            data: value,
        });
    }

    let next = order.read_u32(&data[entries_end..]);
    Ok(Ifd { entries, next })
}

fn thumbnail(data: &[u8], ifd1: &Ifd<'_>, order: ByteOrder) -> Option<Vec<u8>> {
    let offset = ifd1.first_u32(TAG_THUMBNAIL_OFFSET, order)? as usize;
    let length = ifd1.first_u32(TAG_THUMBNAIL_LENGTH, order)? as usize;
    match offset.checked_add(length).and_then(|end| data.get(offset..end)) {
        Some(blob) if !blob.is_empty() => Some(blob.to_vec()),
        _ => {
            log::debug!("Thumbnail at {offset} (+{length}) out of bounds");
            None
        }
    }
}
