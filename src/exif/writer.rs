use super::ExifData;
use super::reader::{is_pointer_tag, read_header};
use crate::error::{Error, Result};
use crate::tags::{
    ExifGroup, TAG_EXIF_IFD, TAG_GPS_IFD, TAG_INTEROP_IFD, TAG_THUMBNAIL_LENGTH,
    TAG_THUMBNAIL_OFFSET,
};
use crate::value::{ByteOrder, TypedValue};

/// A directory entry built in the target byte order.
struct RawIfdEntry {
    tag_id: u16,
    data_format: u16,
    count: u32,
    data: Vec<u8>,
}

impl RawIfdEntry {
    fn from_value(tag_id: u16, value: &TypedValue, order: ByteOrder) -> Self {
        let (_, count, data) = value.to_tiff(order);
        Self {
            tag_id,
            data_format: value.tiff_code(),
            count,
            data,
        }
    }

    /// Single LONG, used for offsets patched in after layout.
    fn long(tag_id: u16, value: u32, order: ByteOrder) -> Self {
        Self {
            tag_id,
            data_format: 4,
            count: 1,
            data: order.u32_bytes(value).to_vec(),
        }
    }

    /// Bytes this entry needs outside the 12-byte slot, padded to even.
    fn external_len(&self) -> usize {
        if self.data.len() <= 4 {
            0
        } else {
            self.data.len() + self.data.len() % 2
        }
    }
}

/// One IFD waiting to be serialized.
struct IfdPlan {
    entries: Vec<RawIfdEntry>,
    offset: u32,
}

impl IfdPlan {
    /// Entries are sorted by tag; repeated tags keep their relative order.
    fn new(mut entries: Vec<RawIfdEntry>) -> Self {
        entries.sort_by_key(|e| e.tag_id);
        Self { entries, offset: 0 }
    }

    fn size(&self) -> usize {
        2 + self.entries.len() * 12 + 4 + self.entries.iter().map(|e| e.external_len()).sum::<usize>()
    }

    fn set_long(&mut self, tag_id: u16, value: u32, order: ByteOrder) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.tag_id == tag_id) {
            entry.data = order.u32_bytes(value).to_vec();
        }
    }

    fn insert(&mut self, entry: RawIfdEntry) {
        self.entries.retain(|e| e.tag_id != entry.tag_id);
        let pos = self.entries.partition_point(|e| e.tag_id < entry.tag_id);
        self.entries.insert(pos, entry);
    }

    fn write(&self, out: &mut Vec<u8>, next: u32, order: ByteOrder) {
        out.extend_from_slice(&order.u16_bytes(self.entries.len() as u16));

        let mut data_off = self.offset + 2 + self.entries.len() as u32 * 12 + 4;
        let mut external = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(&order.u16_bytes(entry.tag_id));
            out.extend_from_slice(&order.u16_bytes(entry.data_format));
            out.extend_from_slice(&order.u32_bytes(entry.count));
            if entry.data.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..entry.data.len()].copy_from_slice(&entry.data);
                out.extend_from_slice(&inline);
            } else {
                out.extend_from_slice(&order.u32_bytes(data_off));
                external.extend_from_slice(&entry.data);
                if entry.data.len() % 2 != 0 {
                    external.push(0);
                }
                data_off += entry.external_len() as u32;
            }
        }
        out.extend_from_slice(&order.u32_bytes(next));
        out.extend_from_slice(&external);
    }
}

/// Store entries of `group` in store order, pointer tags dropped.
fn group_entries(exif: &ExifData, group: ExifGroup, order: ByteOrder) -> Vec<RawIfdEntry> {
    exif.store
        .iter()
        .filter(|e| e.key.group == group && !is_pointer_tag(e.key.tag))
        .map(|e| RawIfdEntry::from_value(e.key.tag, &e.value, order))
        .collect()
}

/// Lay out every IFD starting at absolute offset `base`.
///
/// Returns the serialized bytes and the absolute offset of IFD0. `trailing`
/// becomes the `next` pointer of the last IFD in the chain.
fn layout(exif: &ExifData, base: usize, order: ByteOrder, trailing: u32) -> Result<(Vec<u8>, u32)> {
    let mut ifd0 = IfdPlan::new(group_entries(exif, ExifGroup::Image, order));
    let photo = group_entries(exif, ExifGroup::Photo, order);
    let iop = group_entries(exif, ExifGroup::Iop, order);
    let gps = group_entries(exif, ExifGroup::GpsInfo, order);
    let ifd1 = group_entries(exif, ExifGroup::Thumbnail, order);

    // An Interop IFD hangs off the Exif IFD, so it forces one to exist.
    let mut photo = (!photo.is_empty() || !iop.is_empty()).then(|| IfdPlan::new(photo));
    let mut iop = (!iop.is_empty()).then(|| IfdPlan::new(iop));
    let mut gps = (!gps.is_empty()).then(|| IfdPlan::new(gps));
    let mut ifd1 = (!ifd1.is_empty()).then(|| IfdPlan::new(ifd1));

    if photo.is_some() {
        ifd0.insert(RawIfdEntry::long(TAG_EXIF_IFD, 0, order));
    }
    if gps.is_some() {
        ifd0.insert(RawIfdEntry::long(TAG_GPS_IFD, 0, order));
    }
    if let (Some(photo), Some(_)) = (photo.as_mut(), iop.as_ref()) {
        photo.insert(RawIfdEntry::long(TAG_INTEROP_IFD, 0, order));
    }
    let thumbnail = match (ifd1.as_mut(), exif.thumbnail.as_deref()) {
        (Some(ifd1), Some(blob)) => {
            ifd1.insert(RawIfdEntry::long(TAG_THUMBNAIL_OFFSET, 0, order));
            ifd1.insert(RawIfdEntry::long(TAG_THUMBNAIL_LENGTH, blob.len() as u32, order));
            Some(blob)
        }
        _ => None,
    };

    for plan in [Some(&ifd0), photo.as_ref(), iop.as_ref(), gps.as_ref(), ifd1.as_ref()]
        .into_iter()
        .flatten()
    {
        if plan.entries.len() > u16::MAX as usize {
            return Err(Error::write("too many entries in one IFD"));
        }
    }

    // Phase one: assign absolute offsets in write order.
    let mut cursor = base;
    let mut place = |plan: &mut IfdPlan| -> Result<()> {
        plan.offset = u32::try_from(cursor).map_err(|_| Error::write("Exif data exceeds 4 GiB"))?;
        cursor += plan.size();
        Ok(())
    };
    place(&mut ifd0)?;
    for plan in [photo.as_mut(), iop.as_mut(), gps.as_mut(), ifd1.as_mut()]
        .into_iter()
        .flatten()
    {
        place(plan)?;
    }
    let thumbnail_offset =
        u32::try_from(cursor).map_err(|_| Error::write("Exif data exceeds 4 GiB"))?;
    let end = cursor + thumbnail.map_or(0, |b| b.len());
    u32::try_from(end).map_err(|_| Error::write("Exif data exceeds 4 GiB"))?;

    // Phase two: patch links, then serialize.
    if let Some(photo) = &photo {
        ifd0.set_long(TAG_EXIF_IFD, photo.offset, order);
    }
    if let Some(gps) = &gps {
        ifd0.set_long(TAG_GPS_IFD, gps.offset, order);
    }
    if let (Some(photo), Some(iop)) = (photo.as_mut(), iop.as_ref()) {
        photo.set_long(TAG_INTEROP_IFD, iop.offset, order);
    }
    if let (Some(ifd1), Some(_)) = (ifd1.as_mut(), thumbnail) {
        ifd1.set_long(TAG_THUMBNAIL_OFFSET, thumbnail_offset, order);
    }

    let mut out = Vec::with_capacity(end - base);
    let ifd0_next = ifd1.as_ref().map_or(trailing, |p| p.offset);
    ifd0.write(&mut out, ifd0_next, order);
    for plan in [photo.as_ref(), iop.as_ref(), gps.as_ref()].into_iter().flatten() {
        plan.write(&mut out, 0, order);
    }
    if let Some(ifd1) = &ifd1 {
        ifd1.write(&mut out, trailing, order);
    }
    if let Some(blob) = thumbnail {
        out.extend_from_slice(blob);
    }
    debug_assert_eq!(base + out.len(), end);

    Ok((out, ifd0.offset))
}

/// Serialize the store as a standalone TIFF block (`II*\0` or `MM\0*`
/// header, IFD0 at offset 8). Returns `None` for an empty store.
pub fn encode(exif: &ExifData) -> Result<Option<Vec<u8>>> {
    if exif.is_empty() {
        return Ok(None);
    }
    let order = exif.byte_order;
    let mut out = Vec::new();
    out.extend_from_slice(match order {
        ByteOrder::Little => b"II",
        ByteOrder::Big => b"MM",
    });
    out.extend_from_slice(&order.u16_bytes(42));
    out.extend_from_slice(&order.u32_bytes(8));

    let (body, _) = layout(exif, out.len(), order, 0)?;
    out.extend_from_slice(&body);
    log::debug!("Encoded {} Exif entries into {} bytes", exif.len(), out.len());
    Ok(Some(out))
}

/// Append a rebuilt IFD chain to the TIFF file `original` and point its
/// header at the new IFD0.
///
/// The original bytes stay in place, so strip and tile offsets and any
/// further pages remain valid.
pub fn encode_into(original: &[u8], exif: &ExifData) -> Result<Vec<u8>> {
    let (order, _) = read_header(original)?;

    let mut result = original.to_vec();
    if result.len() % 2 != 0 {
        result.push(0);
    }
    let (body, ifd0_offset) = layout(exif, result.len(), order, exif.next_ifd)?;
    result.extend_from_slice(&body);

    // Update TIFF header to point to new IFD0
    result[4..8].copy_from_slice(&order.u32_bytes(ifd0_offset));

    log::debug!(
        "Appended {} bytes of IFD data, IFD0 now at {ifd0_offset}",
        body.len()
    );
    Ok(result)
}
