use img_parts::Bytes;
use img_parts::png::{Png, PngChunk};

use super::{Commit, Extracted, FormatHandler, ImageFormat, decode_embedded_exif};
use crate::error::{Error, Result};
use crate::exif;
use crate::iptc;

const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

const EXIF_CHUNK: [u8; 4] = *b"eXIf";
const ITXT_CHUNK: [u8; 4] = *b"iTXt";
const TEXT_CHUNK: [u8; 4] = *b"tEXt";
const ZTXT_CHUNK: [u8; 4] = *b"zTXt";
const IDAT_CHUNK: [u8; 4] = *b"IDAT";

const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp";
const IPTC_KEYWORD: &[u8] = b"Raw profile type iptc";
const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";

/// Hex digits per line in a raw profile.
const HEX_LINE: usize = 72;

pub(crate) struct PngHandler;

impl FormatHandler for PngHandler {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn matches(&self, data: &[u8]) -> bool {
        data.starts_with(SIGNATURE)
    }

    fn extract(&self, data: &[u8]) -> Result<Extracted> {
        let png = parse(data)?;
        let mut extracted = Extracted::default();
        let mut have_exif = false;

        for chunk in png.chunks() {
            let contents: &[u8] = chunk.contents();
            match chunk.kind() {
                EXIF_CHUNK if !have_exif => {
                    let tiff = contents.strip_prefix(EXIF_PREFIX).unwrap_or(contents);
                    extracted.exif = decode_embedded_exif(ImageFormat::Png, tiff);
                    have_exif = true;
                }
                ITXT_CHUNK if extracted.xmp.is_none() => {
                    if let Some(text) = parse_itxt(contents, XMP_KEYWORD) {
                        extracted.xmp = Some(text.to_vec());
                    }
                }
                TEXT_CHUNK if extracted.iptc.is_none() => {
                    if let Some(text) = text_value(contents, IPTC_KEYWORD) {
                        extracted.iptc = decode_raw_profile(text).and_then(iim_from_profile);
                    }
                }
                ZTXT_CHUNK => {
                    if text_value(contents, IPTC_KEYWORD).is_some() {
                        log::debug!("Skipping compressed IPTC raw profile");
                    }
                }
                _ => {}
            }
        }

        Ok(extracted)
    }

    fn write(&self, data: &[u8], commit: &Commit<'_>) -> Result<Vec<u8>> {
        let mut png = parse(data)?;

        if commit.exif.is_dirty() {
            let chunk = exif::encode(commit.exif)?.map(|tiff| PngChunk::new(EXIF_CHUNK, Bytes::from(tiff)));
            replace_chunks(&mut png, |c| c.kind() == EXIF_CHUNK, chunk);
        }

        if commit.xmp.changed {
            let chunk = commit.xmp.bytes.as_deref().map(|packet| {
                let mut contents = Vec::with_capacity(XMP_KEYWORD.len() + 5 + packet.len());
                contents.extend_from_slice(XMP_KEYWORD);
                // NUL, uncompressed, method 0, empty language, empty translation
                contents.extend_from_slice(&[0, 0, 0, 0, 0]);
                contents.extend_from_slice(packet);
                PngChunk::new(ITXT_CHUNK, Bytes::from(contents))
            });
            replace_chunks(&mut png, is_xmp_chunk, chunk);
        }

        if commit.iptc.changed {
            let existing = png
                .chunks()
                .iter()
                .filter(|c| c.kind() == TEXT_CHUNK)
                .find_map(|c| text_value(c.contents(), IPTC_KEYWORD))
                .and_then(decode_raw_profile)
                .filter(|p| is_irb(p));
            let chunk = commit.iptc.bytes.as_deref().map(|iim| {
                // An existing Photoshop profile keeps its other resources
                let payload = match &existing {
                    Some(profile) => iptc::build_irb(Some(strip_photoshop_header(profile)), Some(iim)),
                    None => iim.to_vec(),
                };
                let mut contents = IPTC_KEYWORD.to_vec();
                contents.push(0);
                contents.extend_from_slice(encode_raw_profile("iptc", &payload).as_bytes());
                PngChunk::new(TEXT_CHUNK, Bytes::from(contents))
            });
            replace_chunks(&mut png, is_iptc_chunk, chunk);
        }

        Ok(png.encoder().bytes().to_vec())
    }
}

fn parse(data: &[u8]) -> Result<Png> {
    Png::from_bytes(Bytes::from(data.to_vec())).map_err(|e| Error::corrupt("PNG", e))
}

fn is_xmp_chunk(chunk: &PngChunk) -> bool {
    chunk.kind() == ITXT_CHUNK && keyword(chunk.contents()) == Some(XMP_KEYWORD)
}

fn is_iptc_chunk(chunk: &PngChunk) -> bool {
    matches!(chunk.kind(), TEXT_CHUNK | ZTXT_CHUNK) && keyword(chunk.contents()) == Some(IPTC_KEYWORD)
}

/// Drop every chunk matching `select` and put `chunk` where the first one
/// was, or before the first `IDAT` if there was none.
fn replace_chunks(png: &mut Png, select: impl Fn(&PngChunk) -> bool, chunk: Option<PngChunk>) {
    let chunks = png.chunks_mut();
    let existing = chunks.iter().position(&select);
    chunks.retain(|c| !select(c));

    if let Some(chunk) = chunk {
        let pos = existing
            .or_else(|| chunks.iter().position(|c| c.kind() == IDAT_CHUNK))
            .unwrap_or(chunks.len().saturating_sub(1))
            .min(chunks.len());
        log::debug!(
            "Writing {} chunk ({} bytes) at position {pos}",
            String::from_utf8_lossy(&chunk.kind()),
            chunk.contents().len()
        );
        chunks.insert(pos, chunk);
    }
}

/// Keyword of a text chunk: the bytes before the first NUL.
fn keyword(contents: &[u8]) -> Option<&[u8]> {
    let end = contents.iter().position(|&b| b == 0)?;
    Some(&contents[..end])
}

/// Text of a `tEXt`/`zTXt` chunk if its keyword is `wanted`.
fn text_value<'a>(contents: &'a [u8], wanted: &[u8]) -> Option<&'a [u8]> {
    (keyword(contents)? == wanted).then(|| &contents[wanted.len() + 1..])
}

/// Text of an uncompressed `iTXt` chunk with keyword `wanted`.
///
/// Layout: keyword NUL, compression flag, method, language NUL,
/// translated keyword NUL, text.
fn parse_itxt<'a>(contents: &'a [u8], wanted: &[u8]) -> Option<&'a [u8]> {
    let rest = text_value(contents, wanted)?;
    let (&flag, rest) = rest.split_first()?;
    let (_method, rest) = rest.split_first()?;
    if flag != 0 {
        log::debug!(
            "Skipping compressed iTXt chunk {}",
            String::from_utf8_lossy(wanted)
        );
        return None;
    }
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = &rest[lang_end + 1..];
    let translated_end = rest.iter().position(|&b| b == 0)?;
    Some(&rest[translated_end + 1..])
}

/// Decode an ImageMagick raw profile:
/// `\n<name>\n<decimal length>\n<hex digits, wrapped>\n`.
fn decode_raw_profile(text: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(text).ok()?;
    let mut lines = text.trim_start_matches('\n').splitn(3, '\n');
    let _name = lines.next()?;
    let length: usize = lines.next()?.trim().parse().ok()?;
    let digits: Vec<u8> = lines
        .next()?
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let Some(needed) = length.checked_mul(2).filter(|n| *n <= digits.len()) else {
        log::debug!("Raw profile shorter than its declared {length} bytes");
        return None;
    };
    hex::decode(&digits[..needed])
        .map_err(|e| log::debug!("Raw profile is not valid hex: {e}"))
        .ok()
}

fn encode_raw_profile(name: &str, payload: &[u8]) -> String {
    let mut text = format!("\n{name}\n{:8}\n", payload.len());
    for line in payload.chunks(HEX_LINE / 2) {
        text.push_str(&hex::encode(line));
        text.push('\n');
    }
    text
}

fn strip_photoshop_header(profile: &[u8]) -> &[u8] {
    profile.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(profile)
}

fn is_irb(profile: &[u8]) -> bool {
    strip_photoshop_header(profile).starts_with(iptc::IRB_SIGNATURE)
}

/// A raw IPTC profile holds either a Photoshop resource block or bare IIM.
fn iim_from_profile(profile: Vec<u8>) -> Option<Vec<u8>> {
    if is_irb(&profile) {
        iptc::extract_from_irb(strip_photoshop_header(&profile)).map(<[u8]>::to_vec)
    } else {
        Some(profile)
    }
}
