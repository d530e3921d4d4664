//! IPTC-IIM datasets and the Photoshop image resource blocks that carry them.
//!
//! An IIM stream is a run of datasets, each `0x1C <record> <dataset>
//! <length> <data>`. Lengths above `0x7FFF` use the extended form. In JPEG
//! and PNG the stream sits inside an 8BIM resource with id `0x0404`; TIFF
//! stores it bare in tag `0x83BB`.

use chrono::{Datelike, NaiveDate};

use crate::error::Result;
use crate::key::IptcKey;
use crate::store::{Entry, Store};
use crate::tags::{self, IptcRecord};
use crate::value::{IptcTime, TypeId, TypedValue};

const IIM_MARKER: u8 = 0x1C;

pub(crate) const IRB_SIGNATURE: &[u8] = b"8BIM";
pub(crate) const IRB_IPTC_NAA: u16 = 0x0404;

/// Decoded IPTC datasets in stream order.
#[derive(Debug, Clone, Default)]
pub struct IptcData {
    pub(crate) store: Store<IptcKey>,
}

impl IptcData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &Store<IptcKey> {
        &self.store
    }

    pub fn find(&self, key: &IptcKey) -> Option<&Entry<IptcKey>> {
        self.store.find(key)
    }

    pub fn upsert(&mut self, key: IptcKey, value: TypedValue) {
        self.store.upsert(key, value);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<IptcKey>> {
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

/// Decode an IIM dataset stream.
///
/// Bytes between datasets are skipped. A dataset whose length runs past
/// the end stops decoding; everything before it is kept.
pub fn decode(data: &[u8]) -> Result<IptcData> {
    let mut iptc = IptcData::new();
    let mut pos = 0;

    while pos < data.len() {
        if data[pos] != IIM_MARKER {
            pos += 1;
            continue;
        }
        if pos + 5 > data.len() {
            log::warn!("IPTC dataset header truncated at offset {pos}");
            break;
        }
        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let raw_len = u16::from_be_bytes([data[pos + 3], data[pos + 4]]);
        pos += 5;

        let len = if raw_len & 0x8000 != 0 {
            // extended length: the low bits give the size of the length field
            let n = (raw_len & 0x7FFF) as usize;
            if n == 0 || n > 4 || pos.checked_add(n).is_none_or(|end| end > data.len()) {
                log::warn!("Bad extended IPTC length for {record}:{dataset}");
                break;
            }
            let len = data[pos..pos + n]
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | *b as usize);
            pos += n;
            len
        } else {
            raw_len as usize
        };

        let Some(value) = pos.checked_add(len).and_then(|end| data.get(pos..end)) else {
            log::warn!("IPTC dataset {record}:{dataset} runs past end of data");
            break;
        };
        pos += len;

        let Some(record) = IptcRecord::from_id(record) else {
            log::debug!("Skipping IPTC dataset {record}:{dataset} in unsupported record");
            continue;
        };
        let key = IptcKey::new(record, dataset);
        iptc.store.push(key, from_iim(key_type(&key), value));
    }

    log::debug!("Decoded {} IPTC datasets", iptc.store.len());
    Ok(iptc)
}

/// Encode the store as an IIM stream, envelope record first. Returns
/// `None` when there is nothing to write.
pub fn encode(iptc: &IptcData) -> Option<Vec<u8>> {
    if iptc.is_empty() {
        return None;
    }
    let mut entries: Vec<&Entry<IptcKey>> = iptc.iter().collect();
    // stable, so repeated datasets keep their order
    entries.sort_by_key(|e| e.key.record.id());

    let mut out = Vec::new();
    for entry in entries {
        let bytes = to_iim(&entry.value);
        out.extend_from_slice(&[IIM_MARKER, entry.key.record.id(), entry.key.dataset]);
        if bytes.len() <= 0x7FFF {
            out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        } else {
            out.extend_from_slice(&0x8004u16.to_be_bytes());
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        }
        out.extend_from_slice(&bytes);
    }
    Some(out)
}

fn key_type(key: &IptcKey) -> TypeId {
    tags::iptc_dataset_by_id(key.record, key.dataset)
        .map(|d| d.type_id)
        .unwrap_or(TypeId::Undefined)
}

/// Interpret raw dataset bytes by the dataset's dictionary type. A value
/// that would not re-encode to the same bytes is kept as text instead.
fn from_iim(type_id: TypeId, data: &[u8]) -> TypedValue {
    let text = std::str::from_utf8(data).ok();
    let parsed = match type_id {
        TypeId::Short if data.len() == 2 => {
            Some(TypedValue::Short(vec![u16::from_be_bytes([data[0], data[1]])]))
        }
        TypeId::Date => text
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y%m%d").ok())
            .map(TypedValue::Date),
        TypeId::Time => text.and_then(IptcTime::parse).map(TypedValue::Time),
        TypeId::Undefined => Some(TypedValue::Undefined(data.to_vec())),
        _ => None,
    };
    parsed
        .filter(|v| to_iim(v) == data)
        .unwrap_or_else(|| TypedValue::text_from_bytes(TypeId::Text, data))
}

fn to_iim(value: &TypedValue) -> Vec<u8> {
    match value {
        TypedValue::Byte(b) | TypedValue::Undefined(b) | TypedValue::RawText(_, b) => b.clone(),
        TypedValue::Short(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        TypedValue::Long(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
        TypedValue::Date(d) => format!("{:04}{:02}{:02}", d.year(), d.month(), d.day()).into_bytes(),
        TypedValue::Time(t) => t.to_iim().into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

/// Find the IIM stream inside a run of 8BIM image resources.
pub fn extract_from_irb(irb: &[u8]) -> Option<&[u8]> {
    irb_resources(irb)
        .find(|r| r.id == IRB_IPTC_NAA)
        .map(|r| r.data)
}

/// Rebuild an 8BIM resource run: every existing resource except IPTC-NAA
/// is copied, then `iim` (if any) is appended as resource `0x0404`.
pub fn build_irb(existing: Option<&[u8]>, iim: Option<&[u8]>) -> Vec<u8> {
    let mut result = Vec::new();

    if let Some(data) = existing {
        for resource in irb_resources(data).filter(|r| r.id != IRB_IPTC_NAA) {
            result.extend_from_slice(resource.raw);
        }
    }

    if let Some(iim) = iim.filter(|d| !d.is_empty()) {
        result.extend_from_slice(IRB_SIGNATURE);
        result.extend_from_slice(&IRB_IPTC_NAA.to_be_bytes());
        result.push(0x00); // pascal string (empty, length 0)
        result.push(0x00); // padding to even
        result.extend_from_slice(&(iim.len() as u32).to_be_bytes());
        result.extend_from_slice(iim);
        if iim.len() % 2 != 0 {
            result.push(0x00);
        }
    }

    result
}

/// One image resource: id, payload and the full padded record.
struct Resource<'a> {
    id: u16,
    data: &'a [u8],
    raw: &'a [u8],
}

fn irb_resources(data: &[u8]) -> impl Iterator<Item = Resource<'_>> {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos + 12 > data.len() || &data[pos..pos + 4] != IRB_SIGNATURE {
            return None;
        }
        let id = u16::from_be_bytes([data[pos + 4], data[pos + 5]]);
        // Pascal name: length byte + string, padded to even
        let name_len = data[pos + 6] as usize;
        let name_padded = if (name_len + 1) % 2 == 0 { name_len + 1 } else { name_len + 2 };
        let data_start = pos + 6 + name_padded;
        if data_start + 4 > data.len() {
            return None;
        }
        let data_len = u32::from_be_bytes([
            data[data_start],
            data[data_start + 1],
            data[data_start + 2],
            data[data_start + 3],
        ]) as usize;
        let payload_start = data_start + 4;
        let payload_end = payload_start.checked_add(data_len)?;
        if payload_end > data.len() {
            log::debug!("8BIM resource 0x{id:04x} truncated");
            return None;
        }
        let padded_end = (payload_end + data_len % 2).min(data.len());
        let resource = Resource {
            id,
            data: &data[payload_start..payload_end],
            raw: &data[pos..padded_end],
        };
        pos = padded_end;
        Some(resource)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption() -> IptcKey {
        IptcKey::new(IptcRecord::Application2, 120)
    }

    fn dataset(record: u8, id: u8, data: &[u8]) -> Vec<u8> {
        let mut out = vec![IIM_MARKER, record, id];
        out.extend_from_slice(&(data.len() as u16).to_be_bytes());
        out.extend_from_slice(data);
        out
    }

    // ── IIM ──────────────────────────────────────────────────────────

    #[test]
    fn decode_typed_datasets() {
        let mut stream = dataset(2, 0, &[0x00, 0x04]);
        stream.extend(dataset(2, 120, b"A caption"));
        stream.extend(dataset(2, 55, b"20240131"));
        stream.extend(dataset(2, 60, b"101500+0100"));

        let iptc = decode(&stream).unwrap();
        assert_eq!(iptc.len(), 4);
        let values: Vec<String> = iptc.iter().map(|e| e.value.to_string()).collect();
        assert_eq!(values, ["4", "A caption", "2024-01-31", "10:15:00+01:00"]);
    }

    #[test]
    fn decode_keeps_legacy_bytes() {
        let mut stream = dataset(2, 120, b"Caf\xe9");
        stream.extend(dataset(2, 60, b"101500"));
        stream.extend(dataset(2, 55, b"2024-01-31"));

        let iptc = decode(&stream).unwrap();
        let caption = iptc.find(&caption()).unwrap();
        assert_eq!(caption.value.to_string(), "Caf\u{fffd}");
        assert_eq!(caption.value.type_id(), TypeId::Text);
        assert_eq!(encode(&iptc).unwrap(), stream);
    }

    #[test]
    fn decode_keeps_repeated_datasets() {
        let mut stream = dataset(2, 25, b"one");
        stream.extend(dataset(2, 25, b"two"));
        let iptc = decode(&stream).unwrap();
        assert_eq!(iptc.len(), 2);
        let keywords = IptcKey::new(IptcRecord::Application2, 25);
        assert_eq!(iptc.find(&keywords).unwrap().value.to_string(), "one");
    }

    #[test]
    fn decode_stops_at_truncated_dataset() {
        let mut stream = dataset(2, 120, b"ok");
        stream.extend_from_slice(&[IIM_MARKER, 2, 5, 0x00, 0x40, b'x']);
        let iptc = decode(&stream).unwrap();
        assert_eq!(iptc.len(), 1);
    }

    #[test]
    fn huge_extended_length_stops_decoding() {
        let mut stream = dataset(2, 120, b"ok");
        stream.extend_from_slice(&[IIM_MARKER, 2, 25, 0x80, 0x04, 0xFF, 0xFF, 0xFF, 0xFF, b'x']);
        let iptc = decode(&stream).unwrap();
        assert_eq!(iptc.len(), 1);
        assert_eq!(iptc.find(&caption()).unwrap().value.to_string(), "ok");
    }

    #[test]
    fn encode_puts_envelope_first() {
        let mut iptc = IptcData::new();
        iptc.upsert(caption(), TypedValue::Text("hello".into()));
        iptc.upsert(
            IptcKey::new(IptcRecord::Envelope, 90),
            TypedValue::Text("\x1b%G".into()),
        );
        let stream = encode(&iptc).unwrap();
        assert_eq!(&stream[..3], &[IIM_MARKER, 1, 90]);

        let back = decode(&stream).unwrap();
        assert_eq!(back.find(&caption()).unwrap().value.to_string(), "hello");
    }

    #[test]
    fn extended_length_round_trip() {
        let long = "x".repeat(40_000);
        let mut iptc = IptcData::new();
        iptc.upsert(caption(), TypedValue::Text(long.clone()));
        let stream = encode(&iptc).unwrap();
        assert_eq!(&stream[3..5], &[0x80, 0x04]);
        assert_eq!(decode(&stream).unwrap().find(&caption()).unwrap().value.to_string(), long);
    }

    #[test]
    fn encode_empty_is_none() {
        assert!(encode(&IptcData::new()).is_none());
    }

    // ── 8BIM ─────────────────────────────────────────────────────────

    #[test]
    fn irb_replaces_only_iptc_resource() {
        // resource 0x03ED (resolution info) with a 3-byte payload
        let mut existing = b"8BIM".to_vec();
        existing.extend_from_slice(&[0x03, 0xED, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 1, 2, 3, 0]);
        let old = build_irb(Some(&existing), Some(b"old"));
        assert_eq!(extract_from_irb(&old), Some(&b"old"[..]));

        let new = build_irb(Some(&old), Some(b"new iim"));
        assert!(new.starts_with(&existing));
        assert_eq!(extract_from_irb(&new), Some(&b"new iim"[..]));

        let removed = build_irb(Some(&new), None);
        assert_eq!(removed, existing);
        assert_eq!(extract_from_irb(&removed), None);
    }
}
