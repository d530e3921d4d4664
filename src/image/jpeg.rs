use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, JpegSegment};

use super::{Commit, Extracted, FormatHandler, ImageFormat, decode_embedded_exif};
use crate::error::{Error, Result};
use crate::exif;
use crate::iptc;

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP13: u8 = 0xED;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const IPTC_HEADER: &[u8] = b"Photoshop 3.0\0";

/// Largest payload a marker segment can hold (length field counts itself).
const MAX_SEGMENT_CONTENTS: usize = 65533;

/// The metadata segments this handler manages, in the order they are
/// inserted after `APP0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Exif,
    Xmp,
    Iptc,
}

impl Slot {
    fn marker(self) -> u8 {
        match self {
            Self::Exif | Self::Xmp => APP1,
            Self::Iptc => APP13,
        }
    }

    fn header(self) -> &'static [u8] {
        match self {
            Self::Exif => EXIF_HEADER,
            Self::Xmp => XMP_HEADER,
            Self::Iptc => IPTC_HEADER,
        }
    }

    fn of(segment: &JpegSegment) -> Option<Self> {
        [Self::Exif, Self::Xmp, Self::Iptc]
            .into_iter()
            .find(|slot| segment.marker() == slot.marker() && segment.contents().starts_with(slot.header()))
    }
}

pub(crate) struct JpegHandler;

impl FormatHandler for JpegHandler {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn matches(&self, data: &[u8]) -> bool {
        data.starts_with(&[0xFF, 0xD8, 0xFF])
    }

    fn extract(&self, data: &[u8]) -> Result<Extracted> {
        let jpeg = parse(data)?;
        let mut extracted = Extracted::default();

        if let Some(pos) = find_segment_pos(&jpeg, Slot::Exif) {
            let contents = jpeg.segments()[pos].contents();
            extracted.exif = decode_embedded_exif(ImageFormat::Jpeg, &contents[EXIF_HEADER.len()..]);
        }
        if let Some(pos) = find_segment_pos(&jpeg, Slot::Xmp) {
            let contents = jpeg.segments()[pos].contents();
            extracted.xmp = Some(contents[XMP_HEADER.len()..].to_vec());
        }
        if let Some(pos) = find_segment_pos(&jpeg, Slot::Iptc) {
            let contents = jpeg.segments()[pos].contents();
            extracted.iptc = iptc::extract_from_irb(&contents[IPTC_HEADER.len()..]).map(<[u8]>::to_vec);
            if extracted.iptc.is_none() {
                log::debug!("APP13 segment without an IPTC-NAA resource");
            }
        }

        Ok(extracted)
    }

    fn write(&self, data: &[u8], commit: &Commit<'_>) -> Result<Vec<u8>> {
        let mut jpeg = parse(data)?;

        if commit.exif.is_dirty() {
            let contents = exif::encode(commit.exif)?.map(|tiff| [EXIF_HEADER, tiff.as_slice()].concat());
            replace_segment(&mut jpeg, Slot::Exif, contents)?;
        }

        if commit.xmp.changed {
            let contents = commit
                .xmp
                .bytes
                .as_deref()
                .map(|packet| [XMP_HEADER, packet].concat());
            replace_segment(&mut jpeg, Slot::Xmp, contents)?;
        }

        if commit.iptc.changed {
            // Keep the other Photoshop resources that share the segment
            let existing = find_segment_pos(&jpeg, Slot::Iptc)
                .map(|pos| jpeg.segments()[pos].contents()[IPTC_HEADER.len()..].to_vec());
            let irb = iptc::build_irb(existing.as_deref(), commit.iptc.bytes.as_deref());
            let contents = (!irb.is_empty()).then(|| [IPTC_HEADER, irb.as_slice()].concat());
            replace_segment(&mut jpeg, Slot::Iptc, contents)?;
        }

        Ok(jpeg.encoder().bytes().to_vec())
    }
}

fn parse(data: &[u8]) -> Result<Jpeg> {
    Jpeg::from_bytes(Bytes::from(data.to_vec())).map_err(|e| Error::corrupt("JPEG", e))
}

/// Find the position of the first segment holding `slot`.
fn find_segment_pos(jpeg: &Jpeg, slot: Slot) -> Option<usize> {
    jpeg.segments().iter().position(|s| Slot::of(s) == Some(slot))
}

/// Where a new `slot` segment goes: after the leading `APP0` segments and
/// any metadata segments that sort before it.
fn insert_pos(segments: &[JpegSegment], slot: Slot) -> usize {
    let mut pos = segments.iter().take_while(|s| s.marker() == APP0).count();
    while pos < segments.len() && Slot::of(&segments[pos]).is_some_and(|s| s < slot) {
        pos += 1;
    }
    pos
}

/// Put `contents` in place of every `slot` segment. The first existing
/// segment keeps its position; `None` removes the slot entirely.
fn replace_segment(jpeg: &mut Jpeg, slot: Slot, contents: Option<Vec<u8>>) -> Result<()> {
    if let Some(contents) = &contents {
        if contents.len() > MAX_SEGMENT_CONTENTS {
            return Err(Error::write(format!(
                "{slot:?} segment needs {} bytes, JPEG allows {MAX_SEGMENT_CONTENTS}",
                contents.len()
            )));
        }
    }

    let segments = jpeg.segments_mut();
    let existing = segments.iter().position(|s| Slot::of(s) == Some(slot));
    segments.retain(|s| Slot::of(s) != Some(slot));

    match contents {
        Some(contents) => {
            let pos = existing.unwrap_or_else(|| insert_pos(segments, slot));
            let pos = pos.min(segments.len());
            log::debug!("Writing {slot:?} segment ({} bytes) at position {pos}", contents.len());
            segments.insert(pos, JpegSegment::new_with_contents(slot.marker(), Bytes::from(contents)));
        }
        None => {
            if existing.is_some() {
                log::debug!("Removing {slot:?} segment");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::ExifData;
    use crate::image::Segment;

    fn minimal_jpeg() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        data.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
        data.extend_from_slice(&[0x12, 0x34, 0x56]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    fn unchanged() -> Segment {
        Segment {
            bytes: None,
            changed: false,
        }
    }

    // ── extract ──

    #[test]
    fn plain_jpeg_has_no_metadata() {
        let extracted = JpegHandler.extract(&minimal_jpeg()).unwrap();
        assert!(extracted.exif.is_empty());
        assert!(extracted.iptc.is_none());
        assert!(extracted.xmp.is_none());
    }

    // ── write ──

    #[test]
    fn xmp_segment_goes_after_app0() {
        let exif = ExifData::default();
        let commit = Commit {
            exif: &exif,
            iptc: unchanged(),
            xmp: Segment {
                bytes: Some(b"<x:xmpmeta/>".to_vec()),
                changed: true,
            },
        };
        let out = JpegHandler.write(&minimal_jpeg(), &commit).unwrap();
        let jpeg = parse(&out).unwrap();
        assert_eq!(jpeg.segments()[0].marker(), APP0);
        assert_eq!(Slot::of(&jpeg.segments()[1]), Some(Slot::Xmp));

        let extracted = JpegHandler.extract(&out).unwrap();
        assert_eq!(extracted.xmp.as_deref(), Some(&b"<x:xmpmeta/>"[..]));
    }

    #[test]
    fn slots_are_inserted_in_order() {
        let exif = ExifData::default();
        let iptc_commit = Commit {
            exif: &exif,
            iptc: Segment {
                bytes: Some(vec![0x1C, 0x02, 0x78, 0x00, 0x02, b'h', b'i']),
                changed: true,
            },
            xmp: unchanged(),
        };
        let with_iptc = JpegHandler.write(&minimal_jpeg(), &iptc_commit).unwrap();

        let xmp_commit = Commit {
            exif: &exif,
            iptc: unchanged(),
            xmp: Segment {
                bytes: Some(b"<x/>".to_vec()),
                changed: true,
            },
        };
        let out = JpegHandler.write(&with_iptc, &xmp_commit).unwrap();
        let jpeg = parse(&out).unwrap();
        let slots: Vec<_> = jpeg.segments().iter().filter_map(Slot::of).collect();
        assert_eq!(slots, vec![Slot::Xmp, Slot::Iptc]);
    }

    #[test]
    fn oversized_segment_is_rejected() {
        let exif = ExifData::default();
        let commit = Commit {
            exif: &exif,
            iptc: unchanged(),
            xmp: Segment {
                bytes: Some(vec![b' '; 70_000]),
                changed: true,
            },
        };
        assert!(matches!(
            JpegHandler.write(&minimal_jpeg(), &commit),
            Err(Error::Write(_))
        ));
    }

    #[test]
    fn emptied_namespace_removes_segment() {
        let exif = ExifData::default();
        let add = Commit {
            exif: &exif,
            iptc: unchanged(),
            xmp: Segment {
                bytes: Some(b"<x/>".to_vec()),
                changed: true,
            },
        };
        let with_xmp = JpegHandler.write(&minimal_jpeg(), &add).unwrap();

        let remove = Commit {
            exif: &exif,
            iptc: unchanged(),
            xmp: Segment {
                bytes: None,
                changed: true,
            },
        };
        let out = JpegHandler.write(&with_xmp, &remove).unwrap();
        assert_eq!(out, minimal_jpeg());
    }
}
