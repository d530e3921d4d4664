//! Typed metadata values and their text and byte representations.
//!
//! Every value renders to a canonical display string via [`fmt::Display`].
//! Byte arrays render as space-separated decimals (`"65 0 66 0"`), which
//! [`parse_bytes`] turns back into bytes.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use std::fmt;

use crate::config::TokenPolicy;
use crate::error::{Error, Result};

/// Value type identifiers. The first twelve are the TIFF field types; the
/// rest only occur in IPTC and XMP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
    Text,
    Date,
    Time,
    XmpBag,
    XmpSeq,
    XmpAlt,
    LangAlt,
}

impl TypeId {
    /// TIFF field type code, for the types that have one.
    pub fn tiff_code(self) -> Option<u16> {
        Some(match self {
            Self::Byte => 1,
            Self::Ascii => 2,
            Self::Short => 3,
            Self::Long => 4,
            Self::Rational => 5,
            Self::SByte => 6,
            Self::Undefined => 7,
            Self::SShort => 8,
            Self::SLong => 9,
            Self::SRational => 10,
            Self::Float => 11,
            Self::Double => 12,
            _ => return None,
        })
    }

    /// Map a TIFF field type code. `IFD` (13) reads as `Long`.
    pub fn from_tiff_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 | 13 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            _ => return None,
        })
    }

    /// Size in bytes of one component of a TIFF field of this type.
    pub fn tiff_size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
            _ => 1,
        }
    }
}

/// Byte order of a TIFF structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    pub fn read_u16(self, b: &[u8]) -> u16 {
        let bytes = [b[0], b[1]];
        match self {
            Self::Little => u16::from_le_bytes(bytes),
            Self::Big => u16::from_be_bytes(bytes),
        }
    }

    pub fn read_u32(self, b: &[u8]) -> u32 {
        let bytes = [b[0], b[1], b[2], b[3]];
        match self {
            Self::Little => u32::from_le_bytes(bytes),
            Self::Big => u32::from_be_bytes(bytes),
        }
    }

    pub fn read_u64(self, b: &[u8]) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&b[..8]);
        match self {
            Self::Little => u64::from_le_bytes(bytes),
            Self::Big => u64::from_be_bytes(bytes),
        }
    }

    pub fn u16_bytes(self, v: u16) -> [u8; 2] {
        match self {
            Self::Little => v.to_le_bytes(),
            Self::Big => v.to_be_bytes(),
        }
    }

    pub fn u32_bytes(self, v: u32) -> [u8; 4] {
        match self {
            Self::Little => v.to_le_bytes(),
            Self::Big => v.to_be_bytes(),
        }
    }

    pub fn u64_bytes(self, v: u64) -> [u8; 8] {
        match self {
            Self::Little => v.to_le_bytes(),
            Self::Big => v.to_be_bytes(),
        }
    }
}

/// The container kind of an XMP array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Bag,
    Seq,
    Alt,
}

impl ArrayKind {
    pub fn rdf_name(self) -> &'static str {
        match self {
            Self::Bag => "rdf:Bag",
            Self::Seq => "rdf:Seq",
            Self::Alt => "rdf:Alt",
        }
    }
}

/// An IPTC time of day with its UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IptcTime {
    pub time: NaiveTime,
    pub offset_minutes: i16,
}

impl IptcTime {
    /// Accepts `HH:MM:SS±HH:MM`, `HHMMSS±HHMM`, or either without offset.
    pub fn parse(s: &str) -> Option<Self> {
        let compact: String = s.trim().chars().filter(|c| *c != ':').collect();
        let (clock, offset) = match compact.find(['+', '-']) {
            Some(pos) => compact.split_at(pos),
            None => (compact.as_str(), ""),
        };
        if clock.len() != 6 || !clock.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let time = NaiveTime::from_hms_opt(
            clock[0..2].parse().ok()?,
            clock[2..4].parse().ok()?,
            clock[4..6].parse().ok()?,
        )?;
        let offset_minutes = if offset.is_empty() {
            0
        } else {
            let digits = &offset[1..];
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let hours: i16 = digits[0..2].parse().ok()?;
            let minutes: i16 = digits[2..4].parse().ok()?;
            if hours > 23 || minutes > 59 {
                return None;
            }
            let total = hours * 60 + minutes;
            if offset.starts_with('-') { -total } else { total }
        };
        Some(Self { time, offset_minutes })
    }

    /// IIM wire form, `HHMMSS±HHMM`.
    pub fn to_iim(&self) -> String {
        let (sign, h, m) = self.offset_parts();
        format!(
            "{:02}{:02}{:02}{sign}{h:02}{m:02}",
            self.time.hour(),
            self.time.minute(),
            self.time.second()
        )
    }

    fn offset_parts(&self) -> (char, i16, i16) {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let abs = self.offset_minutes.abs();
        (sign, abs / 60, abs % 60)
    }
}

impl fmt::Display for IptcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, h, m) = self.offset_parts();
        write!(
            f,
            "{:02}:{:02}:{:02}{sign}{h:02}:{m:02}",
            self.time.hour(),
            self.time.minute(),
            self.time.second()
        )
    }
}

/// A typed metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    /// IPTC string dataset or XMP simple property.
    Text(String),
    Date(NaiveDate),
    Time(IptcTime),
    /// XMP `Bag`/`Seq`/`Alt` of simple items.
    Array(ArrayKind, Vec<String>),
    /// XMP language alternative, `(language, text)` pairs.
    LangAlt(Vec<(String, String)>),
    /// `Ascii` or `Text` whose bytes are not UTF-8. Rendered lossily and
    /// written back byte for byte.
    RawText(TypeId, Vec<u8>),
    /// TIFF field of a type code this crate does not know, carried as read.
    Opaque { code: u16, count: u32, data: Vec<u8> },
}

impl TypedValue {
    pub fn type_id(&self) -> TypeId {
        match self {
            Self::Byte(_) => TypeId::Byte,
            Self::Ascii(_) => TypeId::Ascii,
            Self::Short(_) => TypeId::Short,
            Self::Long(_) => TypeId::Long,
            Self::Rational(_) => TypeId::Rational,
            Self::SByte(_) => TypeId::SByte,
            Self::Undefined(_) => TypeId::Undefined,
            Self::SShort(_) => TypeId::SShort,
            Self::SLong(_) => TypeId::SLong,
            Self::SRational(_) => TypeId::SRational,
            Self::Float(_) => TypeId::Float,
            Self::Double(_) => TypeId::Double,
            Self::Text(_) => TypeId::Text,
            Self::Date(_) => TypeId::Date,
            Self::Time(_) => TypeId::Time,
            Self::Array(ArrayKind::Bag, _) => TypeId::XmpBag,
            Self::Array(ArrayKind::Seq, _) => TypeId::XmpSeq,
            Self::Array(ArrayKind::Alt, _) => TypeId::XmpAlt,
            Self::LangAlt(_) => TypeId::LangAlt,
            Self::RawText(type_id, _) => *type_id,
            Self::Opaque { .. } => TypeId::Undefined,
        }
    }

    /// Text value from stored bytes, keeping them verbatim when they are
    /// not UTF-8.
    pub fn text_from_bytes(type_id: TypeId, data: &[u8]) -> Self {
        match (type_id, std::str::from_utf8(data)) {
            (TypeId::Ascii, Ok(s)) => Self::Ascii(s.to_string()),
            (_, Ok(s)) => Self::Text(s.to_string()),
            (_, Err(_)) => Self::RawText(type_id, data.to_vec()),
        }
    }

    /// TIFF field type code this value is written with.
    pub fn tiff_code(&self) -> u16 {
        match self {
            Self::Opaque { code, .. } => *code,
            other => other.type_id().tiff_code().unwrap_or(2),
        }
    }

    /// Build a value of type `type_id` from its text form.
    pub fn parse(type_id: TypeId, s: &str, policy: TokenPolicy) -> Result<Self> {
        Ok(match type_id {
            TypeId::Byte => Self::Byte(parse_bytes(s, policy)?),
            TypeId::Undefined => Self::Undefined(parse_bytes(s, policy)?),
            TypeId::Ascii => Self::Ascii(s.to_string()),
            TypeId::Short => Self::Short(parse_tokens(s)?),
            TypeId::Long => Self::Long(parse_tokens(s)?),
            TypeId::SByte => Self::SByte(parse_tokens(s)?),
            TypeId::SShort => Self::SShort(parse_tokens(s)?),
            TypeId::SLong => Self::SLong(parse_tokens(s)?),
            TypeId::Float => Self::Float(parse_tokens(s)?),
            TypeId::Double => Self::Double(parse_tokens(s)?),
            TypeId::Rational => Self::Rational(
                s.split_whitespace()
                    .map(parse_fraction::<u32>)
                    .collect::<Result<_>>()?,
            ),
            TypeId::SRational => Self::SRational(
                s.split_whitespace()
                    .map(parse_fraction::<i32>)
                    .collect::<Result<_>>()?,
            ),
            TypeId::Text => Self::Text(s.to_string()),
            TypeId::Date => Self::Date(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(s.trim(), "%Y%m%d"))
                    .map_err(|e| Error::encoding(format!("invalid date '{s}': {e}")))?,
            ),
            TypeId::Time => Self::Time(
                IptcTime::parse(s).ok_or_else(|| Error::encoding(format!("invalid time '{s}'")))?,
            ),
            TypeId::XmpBag => Self::Array(ArrayKind::Bag, vec![s.to_string()]),
            TypeId::XmpSeq => Self::Array(ArrayKind::Seq, vec![s.to_string()]),
            TypeId::XmpAlt => Self::Array(ArrayKind::Alt, vec![s.to_string()]),
            TypeId::LangAlt => {
                let (lang, text) = split_lang_qualifier(s)?;
                Self::LangAlt(vec![(lang, text)])
            }
        })
    }

    /// Overwrite this value from text, keeping its type.
    ///
    /// A language alternative only replaces (or adds) the addressed language.
    pub fn assign_str(&mut self, s: &str, policy: TokenPolicy) -> Result<()> {
        if let Self::LangAlt(items) = self {
            let (lang, text) = split_lang_qualifier(s)?;
            match items.iter_mut().find(|(l, _)| *l == lang) {
                Some(item) => item.1 = text,
                None => items.push((lang, text)),
            }
            return Ok(());
        }
        *self = Self::parse(self.type_id(), s, policy)?;
        Ok(())
    }

    /// Decode a TIFF field. `data` holds exactly `count` components.
    pub fn from_tiff(type_id: TypeId, data: &[u8], order: ByteOrder) -> Self {
        let chunks = |n: usize| data.chunks_exact(n);
        match type_id {
            TypeId::Byte => Self::Byte(data.to_vec()),
            TypeId::Undefined => Self::Undefined(data.to_vec()),
            TypeId::SByte => Self::SByte(data.iter().map(|b| *b as i8).collect()),
            // Only the terminator is dropped; padding after it is kept
            TypeId::Ascii => {
                Self::text_from_bytes(TypeId::Ascii, data.strip_suffix(&[0u8]).unwrap_or(data))
            }
            TypeId::Short => Self::Short(chunks(2).map(|c| order.read_u16(c)).collect()),
            TypeId::SShort => Self::SShort(chunks(2).map(|c| order.read_u16(c) as i16).collect()),
            TypeId::Long => Self::Long(chunks(4).map(|c| order.read_u32(c)).collect()),
            TypeId::SLong => Self::SLong(chunks(4).map(|c| order.read_u32(c) as i32).collect()),
            TypeId::Float => Self::Float(
                chunks(4)
                    .map(|c| f32::from_bits(order.read_u32(c)))
                    .collect(),
            ),
            TypeId::Double => Self::Double(
                chunks(8)
                    .map(|c| f64::from_bits(order.read_u64(c)))
                    .collect(),
            ),
            TypeId::Rational => Self::Rational(
                chunks(8)
                    .map(|c| (order.read_u32(c), order.read_u32(&c[4..])))
                    .collect(),
            ),
            TypeId::SRational => Self::SRational(
                chunks(8)
                    .map(|c| (order.read_u32(c) as i32, order.read_u32(&c[4..]) as i32))
                    .collect(),
            ),
            // Not a TIFF type; callers only pass types from `from_tiff_code`.
            _ => Self::Undefined(data.to_vec()),
        }
    }

    /// Encode as a TIFF field: `(type, count, data)`.
    ///
    /// Values without a TIFF representation are written as ASCII text.
    pub fn to_tiff(&self, order: ByteOrder) -> (TypeId, u32, Vec<u8>) {
        let mut out = Vec::new();
        let count = match self {
            Self::Byte(v) | Self::Undefined(v) => {
                out.extend_from_slice(v);
                v.len()
            }
            Self::SByte(v) => {
                out.extend(v.iter().map(|b| *b as u8));
                v.len()
            }
            Self::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
                out.len()
            }
            Self::RawText(_, bytes) => {
                out.extend_from_slice(bytes);
                out.push(0);
                return (TypeId::Ascii, out.len() as u32, out);
            }
            Self::Opaque { count, data, .. } => {
                return (TypeId::Undefined, *count, data.clone());
            }
            Self::Short(v) => {
                v.iter().for_each(|x| out.extend_from_slice(&order.u16_bytes(*x)));
                v.len()
            }
            Self::SShort(v) => {
                v.iter().for_each(|x| out.extend_from_slice(&order.u16_bytes(*x as u16)));
                v.len()
            }
            Self::Long(v) => {
                v.iter().for_each(|x| out.extend_from_slice(&order.u32_bytes(*x)));
                v.len()
            }
            Self::SLong(v) => {
                v.iter().for_each(|x| out.extend_from_slice(&order.u32_bytes(*x as u32)));
                v.len()
            }
            Self::Float(v) => {
                v.iter().for_each(|x| out.extend_from_slice(&order.u32_bytes(x.to_bits())));
                v.len()
            }
            Self::Double(v) => {
                v.iter().for_each(|x| out.extend_from_slice(&order.u64_bytes(x.to_bits())));
                v.len()
            }
            Self::Rational(v) => {
                for (n, d) in v {
                    out.extend_from_slice(&order.u32_bytes(*n));
                    out.extend_from_slice(&order.u32_bytes(*d));
                }
                v.len()
            }
            Self::SRational(v) => {
                for (n, d) in v {
                    out.extend_from_slice(&order.u32_bytes(*n as u32));
                    out.extend_from_slice(&order.u32_bytes(*d as u32));
                }
                v.len()
            }
            other => {
                return Self::Ascii(other.to_string()).to_tiff(order);
            }
        };
        (self.type_id(), count as u32, out)
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) | Self::Undefined(v) => write_joined(f, v, " "),
            Self::Opaque { data, .. } => write_joined(f, data, " "),
            Self::SByte(v) => write_joined(f, v, " "),
            Self::Short(v) => write_joined(f, v, " "),
            Self::SShort(v) => write_joined(f, v, " "),
            Self::Long(v) => write_joined(f, v, " "),
            Self::SLong(v) => write_joined(f, v, " "),
            Self::Float(v) => write_joined(f, v, " "),
            Self::Double(v) => write_joined(f, v, " "),
            Self::Rational(v) => {
                let parts: Vec<String> = v.iter().map(|(n, d)| format!("{n}/{d}")).collect();
                f.write_str(&parts.join(" "))
            }
            Self::SRational(v) => {
                let parts: Vec<String> = v.iter().map(|(n, d)| format!("{n}/{d}")).collect();
                f.write_str(&parts.join(" "))
            }
            Self::Ascii(s) => f.write_str(s.split('\0').next().unwrap_or_default()),
            Self::Text(s) => f.write_str(s),
            Self::RawText(type_id, bytes) => {
                let text = String::from_utf8_lossy(bytes);
                match type_id {
                    TypeId::Ascii => f.write_str(text.split('\0').next().unwrap_or_default()),
                    _ => f.write_str(&text),
                }
            }
            Self::Date(d) => write!(f, "{:04}-{:02}-{:02}", d.year(), d.month(), d.day()),
            Self::Time(t) => t.fmt(f),
            Self::Array(_, items) => f.write_str(&items.join(", ")),
            Self::LangAlt(items) => {
                // x-default first, then the rest in stored order
                let ordered = items
                    .iter()
                    .filter(|(l, _)| l == "x-default")
                    .chain(items.iter().filter(|(l, _)| l != "x-default"));
                let parts: Vec<String> = ordered
                    .map(|(lang, text)| format!("lang=\"{lang}\" {text}"))
                    .collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn parse_tokens<T: std::str::FromStr>(s: &str) -> Result<Vec<T>> {
    s.split_whitespace()
        .map(|tok| {
            tok.parse::<T>()
                .map_err(|_| Error::encoding(format!("invalid number '{tok}'")))
        })
        .collect()
}

fn parse_fraction<T: std::str::FromStr + From<u8>>(tok: &str) -> Result<(T, T)> {
    let bad = || Error::encoding(format!("invalid rational '{tok}'"));
    match tok.split_once('/') {
        Some((n, d)) => Ok((n.parse().map_err(|_| bad())?, d.parse().map_err(|_| bad())?)),
        None => Ok((tok.parse().map_err(|_| bad())?, T::from(1))),
    }
}

/// Split an optional `lang="xx" ` qualifier off a language-alternative string.
fn split_lang_qualifier(s: &str) -> Result<(String, String)> {
    let Some(rest) = s.strip_prefix("lang=") else {
        return Ok(("x-default".to_string(), s.to_string()));
    };
    let (lang, text) = match rest.strip_prefix('"') {
        Some(quoted) => {
            let end = quoted
                .find('"')
                .ok_or_else(|| Error::encoding(format!("unterminated language in '{s}'")))?;
            let text = &quoted[end + 1..];
            (&quoted[..end], text.strip_prefix(' ').unwrap_or(text))
        }
        None => rest.split_once(' ').unwrap_or((rest, "")),
    };
    if lang.is_empty() {
        return Err(Error::encoding(format!("empty language in '{s}'")));
    }
    Ok((lang.to_string(), text.to_string()))
}

/// Turn a rendered byte array back into bytes.
///
/// Splits on whitespace and parses each token as a decimal integer. Under
/// [`TokenPolicy::Lenient`] tokens outside `0..=255` or not integers at all
/// are dropped; under [`TokenPolicy::Strict`] they are an error. An empty
/// result is not an error here.
pub fn parse_bytes(s: &str, policy: TokenPolicy) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for tok in s.split_whitespace() {
        match tok.parse::<i64>().ok().and_then(|n| u8::try_from(n).ok()) {
            Some(b) => out.push(b),
            None if policy == TokenPolicy::Lenient => {
                log::debug!("dropping byte token '{tok}'");
            }
            None => return Err(Error::encoding(format!("'{tok}' is not a byte value"))),
        }
    }
    Ok(out)
}

/// Build an unsigned-byte-array value from raw bytes.
///
/// Each input byte is one component, so the little-endian interpretation
/// of multi-byte components never comes into play for this type.
pub fn build_from_bytes(bytes: &[u8]) -> TypedValue {
    TypedValue::Byte(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── render ───────────────────────────────────────────────────────

    #[test]
    fn render_byte_arrays_as_decimals() {
        assert_eq!(TypedValue::Byte(vec![65, 0, 66, 0]).to_string(), "65 0 66 0");
        assert_eq!(TypedValue::Undefined(vec![]).to_string(), "");
    }

    #[test]
    fn render_numbers_and_rationals() {
        assert_eq!(TypedValue::Short(vec![1, 2, 3]).to_string(), "1 2 3");
        assert_eq!(TypedValue::SLong(vec![-5]).to_string(), "-5");
        assert_eq!(TypedValue::Rational(vec![(72, 1), (1, 3)]).to_string(), "72/1 1/3");
        assert_eq!(TypedValue::SRational(vec![(-1, 3)]).to_string(), "-1/3");
    }

    #[test]
    fn render_ascii_stops_at_nul() {
        assert_eq!(TypedValue::Ascii("Canon\0junk".into()).to_string(), "Canon");
    }

    #[test]
    fn render_date_and_time() {
        let date = TypedValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(date.to_string(), "2024-03-09");
        let time = TypedValue::parse(TypeId::Time, "143005-0130", TokenPolicy::Lenient).unwrap();
        assert_eq!(time.to_string(), "14:30:05-01:30");
    }

    #[test]
    fn render_xmp_values() {
        let bag = TypedValue::Array(ArrayKind::Bag, vec!["a".into(), "b".into()]);
        assert_eq!(bag.to_string(), "a, b");
        let alt = TypedValue::LangAlt(vec![
            ("de".into(), "Hallo".into()),
            ("x-default".into(), "Hello".into()),
        ]);
        assert_eq!(alt.to_string(), "lang=\"x-default\" Hello, lang=\"de\" Hallo");
    }

    // ── parse ────────────────────────────────────────────────────────

    #[test]
    fn parse_numeric_types() {
        let v = TypedValue::parse(TypeId::Short, "1 2  3", TokenPolicy::Lenient).unwrap();
        assert_eq!(v, TypedValue::Short(vec![1, 2, 3]));
        let r = TypedValue::parse(TypeId::Rational, "300/1 7", TokenPolicy::Lenient).unwrap();
        assert_eq!(r, TypedValue::Rational(vec![(300, 1), (7, 1)]));
        assert!(TypedValue::parse(TypeId::Short, "1 x", TokenPolicy::Lenient).is_err());
        assert!(TypedValue::parse(TypeId::Short, "70000", TokenPolicy::Lenient).is_err());
    }

    #[test]
    fn parse_dates_both_forms() {
        let a = TypedValue::parse(TypeId::Date, "2021-12-31", TokenPolicy::Lenient).unwrap();
        let b = TypedValue::parse(TypeId::Date, "20211231", TokenPolicy::Lenient).unwrap();
        assert_eq!(a, b);
        assert!(TypedValue::parse(TypeId::Date, "2021-13-01", TokenPolicy::Lenient).is_err());
    }

    #[test]
    fn parse_time_without_offset() {
        let t = IptcTime::parse("08:15:00").unwrap();
        assert_eq!(t.offset_minutes, 0);
        assert_eq!(t.to_iim(), "081500+0000");
        assert!(IptcTime::parse("25:00:00").is_none());
        assert!(IptcTime::parse("081500+2").is_none());
    }

    #[test]
    fn lang_alt_assignment() {
        let mut v = TypedValue::parse(TypeId::LangAlt, "Hello", TokenPolicy::Lenient).unwrap();
        assert_eq!(v.to_string(), "lang=\"x-default\" Hello");
        v.assign_str("lang=\"de\" Hallo", TokenPolicy::Lenient).unwrap();
        v.assign_str("Hi", TokenPolicy::Lenient).unwrap();
        assert_eq!(v.to_string(), "lang=\"x-default\" Hi, lang=\"de\" Hallo");
        assert!(v.assign_str("lang=\"de Hallo", TokenPolicy::Lenient).is_err());
    }

    #[test]
    fn array_assignment_replaces_items() {
        let mut v = TypedValue::Array(ArrayKind::Bag, vec!["a".into(), "b".into()]);
        v.assign_str("c", TokenPolicy::Lenient).unwrap();
        assert_eq!(v, TypedValue::Array(ArrayKind::Bag, vec!["c".into()]));
    }

    // ── parse_bytes ──────────────────────────────────────────────────

    #[test]
    fn parse_bytes_lenient_drops_bad_tokens() {
        let bytes = parse_bytes("65 0 256 -1 abc 66", TokenPolicy::Lenient).unwrap();
        assert_eq!(bytes, vec![65, 0, 66]);
    }

    #[test]
    fn parse_bytes_strict_rejects_bad_tokens() {
        assert!(parse_bytes("65 256", TokenPolicy::Strict).is_err());
        assert_eq!(parse_bytes("1 2", TokenPolicy::Strict).unwrap(), vec![1, 2]);
    }

    #[test]
    fn parse_bytes_nothing_survives() {
        assert!(parse_bytes("Canon", TokenPolicy::Lenient).unwrap().is_empty());
        assert!(parse_bytes("", TokenPolicy::Lenient).unwrap().is_empty());
    }

    #[test]
    fn build_from_bytes_renders_back() {
        let raw = [0u8, 127, 255];
        let v = build_from_bytes(&raw);
        assert_eq!(v.type_id(), TypeId::Byte);
        assert_eq!(parse_bytes(&v.to_string(), TokenPolicy::Strict).unwrap(), raw);
    }

    // ── TIFF form ────────────────────────────────────────────────────

    #[test]
    fn tiff_short_big_endian() {
        let v = TypedValue::from_tiff(TypeId::Short, &[0x00, 0x01, 0x01, 0x00], ByteOrder::Big);
        assert_eq!(v, TypedValue::Short(vec![1, 256]));
        let (ty, count, data) = v.to_tiff(ByteOrder::Little);
        assert_eq!((ty, count), (TypeId::Short, 2));
        assert_eq!(data, vec![0x01, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn tiff_ascii_gets_terminator() {
        let (ty, count, data) = TypedValue::Ascii("Nikon".into()).to_tiff(ByteOrder::Little);
        assert_eq!(ty, TypeId::Ascii);
        assert_eq!(count, 6);
        assert_eq!(data, b"Nikon\0");
    }

    #[test]
    fn tiff_ascii_keeps_padding_and_legacy_bytes() {
        let v = TypedValue::from_tiff(TypeId::Ascii, b"Canon\0\0\0", ByteOrder::Little);
        assert_eq!(v.to_string(), "Canon");
        assert_eq!(v.to_tiff(ByteOrder::Little).2, b"Canon\0\0\0");

        let latin1 = TypedValue::from_tiff(TypeId::Ascii, b"Caf\xe9\0", ByteOrder::Big);
        assert_eq!(latin1, TypedValue::RawText(TypeId::Ascii, b"Caf\xe9".to_vec()));
        assert_eq!(latin1.to_string(), "Caf\u{fffd}");
        let (ty, count, data) = latin1.to_tiff(ByteOrder::Big);
        assert_eq!((ty, count), (TypeId::Ascii, 5));
        assert_eq!(data, b"Caf\xe9\0");
    }

    #[test]
    fn raw_text_assignment_becomes_plain_text() {
        let mut v = TypedValue::RawText(TypeId::Text, b"\xff".to_vec());
        v.assign_str("plain", TokenPolicy::Lenient).unwrap();
        assert_eq!(v, TypedValue::Text("plain".into()));
    }

    #[test]
    fn opaque_fields_keep_their_code() {
        let v = TypedValue::Opaque { code: 99, count: 3, data: vec![1, 2, 3] };
        assert_eq!(v.tiff_code(), 99);
        assert_eq!(v.to_string(), "1 2 3");
        assert_eq!(v.to_tiff(ByteOrder::Little), (TypeId::Undefined, 3, vec![1, 2, 3]));
        assert_eq!(TypedValue::Text("x".into()).tiff_code(), 2);
        assert_eq!(TypedValue::Short(vec![1]).tiff_code(), 3);
    }

    #[test]
    fn tiff_text_falls_back_to_ascii() {
        let (ty, _, data) = TypedValue::Text("hi".into()).to_tiff(ByteOrder::Big);
        assert_eq!(ty, TypeId::Ascii);
        assert_eq!(data, b"hi\0");
    }

    #[test]
    fn tiff_signed_rational() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x02, 0x00, 0x00, 0x00];
        let v = TypedValue::from_tiff(TypeId::SRational, &data, ByteOrder::Little);
        assert_eq!(v, TypedValue::SRational(vec![(-1, 2)]));
    }
}
