mod common;

use common::{JPEG_SCAN, contains, jpeg, jpeg_segments, jpeg_with};
use exif_mem::{read, read_tag_text, write_bytes, write_string};

const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

fn xmp_segment(data: &[u8]) -> Option<Vec<u8>> {
    jpeg_segments(data)
        .into_iter()
        .find(|(marker, contents)| *marker == 0xE1 && contents.starts_with(XMP_HEADER))
        .map(|(_, contents)| contents)
}

/// Caption and headline datasets, the caption in Latin-1.
const FOREIGN_IIM: &[u8] = b"\x1c\x02\x78\x00\x04Caf\xe9\x1c\x02\x69\x00\x05Title";

/// APP1 Exif (Make in Latin-1 with NUL padding, Orientation) and APP13
/// IPTC as another writer would lay them out.
fn foreign_jpeg() -> Vec<u8> {
    let mut exif = b"Exif\0\0II*\0\x08\0\0\0\x02\0".to_vec();
    exif.extend_from_slice(&[0x0F, 0x01, 0x02, 0x00, 0x08, 0, 0, 0, 38, 0, 0, 0]);
    exif.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0, 0, 0, 6, 0, 0, 0]);
    exif.extend_from_slice(&[0, 0, 0, 0]);
    exif.extend_from_slice(b"Caf\xe9\0\0\0\0");

    let mut app13 = b"Photoshop 3.0\08BIM\x04\x04\0\0".to_vec();
    app13.extend_from_slice(&(FOREIGN_IIM.len() as u32).to_be_bytes());
    app13.extend_from_slice(FOREIGN_IIM);

    jpeg_with(&[(0xE1, exif), (0xED, app13)])
}

fn segment(data: &[u8], marker: u8) -> Vec<u8> {
    jpeg_segments(data)
        .into_iter()
        .find(|(m, _)| *m == marker)
        .map(|(_, contents)| contents)
        .unwrap()
}

// ── foreign metadata ──

#[test]
fn legacy_text_reads_lossily() {
    let record = read(&foreign_jpeg());
    assert_eq!(record.exif["Exif.Image.Make"], "Caf\u{fffd}");
    assert_eq!(record.exif["Exif.Image.Orientation"], "6");
    assert_eq!(record.iptc["Iptc.Application2.Caption"], "Caf\u{fffd}");
    assert_eq!(record.iptc["Iptc.Application2.Headline"], "Title");
}

#[test]
fn iptc_write_keeps_untouched_datasets_verbatim() {
    let original = foreign_jpeg();
    let buf = write_string(&original, "Iptc.Application2.Keywords", "boat").unwrap();

    let app13 = segment(&buf, 0xED);
    assert!(contains(&app13, FOREIGN_IIM));
    assert!(!contains(&buf, "\u{fffd}".as_bytes()));
    assert_eq!(segment(&buf, 0xE1), segment(&original, 0xE1));
    assert_eq!(read_tag_text(&buf, "Iptc.Application2.Keywords").as_deref(), Some("boat"));
}

#[test]
fn exif_write_keeps_untouched_tags_verbatim() {
    let buf = write_string(&foreign_jpeg(), "Exif.Image.Artist", "Jane").unwrap();

    let app1 = segment(&buf, 0xE1);
    assert!(contains(&app1, b"Caf\xe9\0\0\0\0"));
    assert!(!contains(&app1, "\u{fffd}".as_bytes()));
    let record = read(&buf);
    assert_eq!(record.exif["Exif.Image.Orientation"], "6");
    assert_eq!(record.exif["Exif.Image.Artist"], "Jane");
    assert_eq!(record.iptc.len(), 2);
}

// ── exif ──

#[test]
fn exif_string_round_trip() {
    let buf = write_string(&jpeg(), "Exif.Image.Make", "Canon").unwrap();
    assert_eq!(read_tag_text(&buf, "Exif.Image.Make").as_deref(), Some("Canon"));

    let buf = write_string(&buf, "Exif.Photo.ExposureTime", "1/250").unwrap();
    let record = read(&buf);
    assert_eq!(record.exif["Exif.Image.Make"], "Canon");
    assert_eq!(record.exif["Exif.Photo.ExposureTime"], "1/250");
    assert_eq!(record.exif.len(), 2);
}

#[test]
fn exif_segment_follows_app0() {
    let buf = write_string(&jpeg(), "Exif.Image.Model", "EOS").unwrap();
    let segments = jpeg_segments(&buf);
    assert_eq!(segments[0].0, 0xE0);
    assert_eq!(segments[1].0, 0xE1);
    assert!(segments[1].1.starts_with(b"Exif\0\0"));
}

#[test]
fn scan_data_is_preserved() {
    let buf = write_string(&jpeg(), "Exif.Image.Model", "EOS").unwrap();
    let buf = write_string(&buf, "Xmp.dc.title", "Harbour").unwrap();
    let buf = write_string(&buf, "Iptc.Application2.Caption", "Boats").unwrap();
    assert!(buf.ends_with(JPEG_SCAN));
}

#[test]
fn byte_values_round_trip() {
    let bytes = [0u8, 7, 128, 255];
    let buf = write_bytes(&jpeg(), "Exif.Photo.UserComment", &bytes).unwrap();
    assert_eq!(exif_mem::read_tag_bytes(&buf, "Exif.Photo.UserComment"), Some(bytes.to_vec()));
}

// ── iptc ──

#[test]
fn iptc_datasets_round_trip() {
    let buf = write_string(&jpeg(), "Iptc.Application2.Keywords", "harbour").unwrap();
    let buf = write_string(&buf, "Iptc.Application2.DateCreated", "2024-05-01").unwrap();
    let buf = write_string(&buf, "Iptc.Application2.TimeCreated", "18:30:00+02:00").unwrap();

    let record = read(&buf);
    assert_eq!(record.iptc["Iptc.Application2.Keywords"], "harbour");
    assert_eq!(record.iptc["Iptc.Application2.DateCreated"], "2024-05-01");
    assert_eq!(record.iptc["Iptc.Application2.TimeCreated"], "18:30:00+02:00");
    assert!(jpeg_segments(&buf).iter().any(|(m, c)| *m == 0xED && c.starts_with(b"Photoshop 3.0\0")));
}

#[test]
fn invalid_iptc_date_fails_write() {
    assert_eq!(write_string(&jpeg(), "Iptc.Application2.DateCreated", "yesterday"), None);
}

// ── xmp ──

#[test]
fn xmp_language_alternatives() {
    let buf = write_string(&jpeg(), "Xmp.dc.title", "Harbour").unwrap();
    assert_eq!(
        read_tag_text(&buf, "Xmp.dc.title").as_deref(),
        Some("lang=\"x-default\" Harbour")
    );

    let buf = write_string(&buf, "Xmp.dc.title", "lang=\"de\" Hafen").unwrap();
    assert_eq!(
        read_tag_text(&buf, "Xmp.dc.title").as_deref(),
        Some("lang=\"x-default\" Harbour, lang=\"de\" Hafen")
    );
}

#[test]
fn xmp_bag_is_replaced_by_string() {
    let buf = write_string(&jpeg(), "Xmp.dc.subject", "boats").unwrap();
    let buf = write_string(&buf, "Xmp.dc.subject", "ships").unwrap();
    assert_eq!(read_tag_text(&buf, "Xmp.dc.subject").as_deref(), Some("ships"));
}

// ── isolation ──

#[test]
fn other_namespaces_pass_through() {
    let with_xmp = write_string(&jpeg(), "Xmp.dc.creator", "Jane").unwrap();
    let before = xmp_segment(&with_xmp).unwrap();

    let with_exif = write_string(&with_xmp, "Exif.Image.Artist", "Jane").unwrap();
    assert_eq!(xmp_segment(&with_exif).unwrap(), before);

    let record = read(&with_exif);
    assert_eq!(record.xmp["Xmp.dc.creator"], "Jane");
    assert_eq!(record.exif["Exif.Image.Artist"], "Jane");
    assert!(record.iptc.is_empty());
}

#[test]
fn upsert_touches_one_entry() {
    let buf = write_string(&jpeg(), "Exif.Image.Make", "Canon").unwrap();
    let buf = write_string(&buf, "Exif.Image.Model", "EOS").unwrap();
    let buf = write_string(&buf, "Exif.Image.Make", "Nikon").unwrap();

    let record = read(&buf);
    assert_eq!(record.exif.len(), 2);
    assert_eq!(record.exif["Exif.Image.Make"], "Nikon");
    assert_eq!(record.exif["Exif.Image.Model"], "EOS");
}
