//! Minimal container fixtures built in code.

#![allow(dead_code)]

/// Entropy-coded bytes of the fixture JPEG, followed by EOI.
pub const JPEG_SCAN: &[u8] = &[
    0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0x12, 0x34, 0x56, 0xFF, 0xD9,
];

/// SOI, a JFIF APP0, one scan and EOI.
pub fn jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    data.extend_from_slice(JPEG_SCAN);
    data
}

/// The fixture JPEG with extra segments inserted after APP0.
pub fn jpeg_with(segments: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let plain = jpeg();
    let mut data = plain[..20].to_vec();
    for (marker, contents) in segments {
        data.extend_from_slice(&[0xFF, *marker]);
        data.extend_from_slice(&((contents.len() + 2) as u16).to_be_bytes());
        data.extend_from_slice(contents);
    }
    data.extend_from_slice(&plain[20..]);
    data
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Marker and contents of every segment before the scan.
pub fn jpeg_segments(data: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut segments = Vec::new();
    let mut pos = 2;
    while pos + 4 <= data.len() && data[pos] == 0xFF && data[pos + 1] != 0xDA {
        let marker = data[pos + 1];
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        segments.push((marker, data[pos + 4..pos + 2 + len].to_vec()));
        pos += 2 + len;
    }
    segments
}

pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in bytes {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
        }
    }
    !crc
}

fn push_chunk(data: &mut Vec<u8>, kind: &[u8; 4], contents: &[u8]) {
    data.extend_from_slice(&(contents.len() as u32).to_be_bytes());
    data.extend_from_slice(kind);
    data.extend_from_slice(contents);
    data.extend_from_slice(&crc32(&[kind.as_slice(), contents].concat()).to_be_bytes());
}

/// Compressed pixel data of the 1x1 fixture PNG.
pub const PNG_IDAT: &[u8] = &[0x78, 0x9C, 0x63, 0x60, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01];

/// A 1x1 greyscale PNG.
pub fn png() -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    push_chunk(&mut data, b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]);
    push_chunk(&mut data, b"IDAT", PNG_IDAT);
    push_chunk(&mut data, b"IEND", &[]);
    data
}

/// Kind and contents of every chunk.
pub fn png_chunks(data: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
    let mut chunks = Vec::new();
    let mut pos = 8;
    while pos + 12 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&data[pos + 4..pos + 8]);
        chunks.push((kind, data[pos + 8..pos + 8 + len].to_vec()));
        pos += 12 + len;
    }
    chunks
}

/// One-strip 2x1 greyscale TIFF. The strip holds `0xAB 0xCD` at offset 8.
pub fn tiff(big_endian: bool) -> Vec<u8> {
    tiff_with(big_endian, &[])
}

/// [`tiff`] with `extra` IFD0 entries appended, given as
/// `(tag, type, count, value slot)`.
pub fn tiff_with(big_endian: bool, extra: &[(u16, u16, u32, [u8; 4])]) -> Vec<u8> {
    let u16b = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let u32b = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let short = |v: u16| {
        let b = u16b(v);
        [b[0], b[1], 0, 0]
    };

    let mut data = if big_endian { b"MM".to_vec() } else { b"II".to_vec() };
    data.extend_from_slice(&u16b(42));
    data.extend_from_slice(&u32b(10));
    data.extend_from_slice(&[0xAB, 0xCD]);

    let mut entries = vec![
        (0x0100, 3, 1, short(2)),
        (0x0101, 3, 1, short(1)),
        (0x0111, 4, 1, u32b(8)),
        (0x0116, 3, 1, short(1)),
        (0x0117, 4, 1, u32b(2)),
    ];
    entries.extend_from_slice(extra);
    data.extend_from_slice(&u16b(entries.len() as u16));
    for (tag, kind, count, slot) in entries {
        data.extend_from_slice(&u16b(tag));
        data.extend_from_slice(&u16b(kind));
        data.extend_from_slice(&u32b(count));
        data.extend_from_slice(&slot);
    }
    data.extend_from_slice(&u32b(0));
    data
}
