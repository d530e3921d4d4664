//! Built-in tag dictionaries: Exif tags per IFD group, IPTC datasets per
//! record, and the value types of well-known XMP properties.

use crate::value::TypeId;

/// The IFD an Exif tag lives in, named the way keys spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExifGroup {
    /// IFD0, the primary image.
    Image,
    /// The Exif sub-IFD.
    Photo,
    GpsInfo,
    /// The interoperability sub-IFD.
    Iop,
    /// IFD1, usually the embedded thumbnail.
    Thumbnail,
}

impl ExifGroup {
    pub const ALL: [ExifGroup; 5] = [
        ExifGroup::Image,
        ExifGroup::Photo,
        ExifGroup::GpsInfo,
        ExifGroup::Iop,
        ExifGroup::Thumbnail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Photo => "Photo",
            Self::GpsInfo => "GPSInfo",
            Self::Iop => "Iop",
            Self::Thumbnail => "Thumbnail",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }

    /// IFD1 shares the IFD0 tag vocabulary.
    fn table(self) -> &'static [ExifTagInfo] {
        match self {
            Self::Image | Self::Thumbnail => IMAGE_TAGS,
            Self::Photo => PHOTO_TAGS,
            Self::GpsInfo => GPS_TAGS,
            Self::Iop => IOP_TAGS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExifTagInfo {
    pub id: u16,
    pub name: &'static str,
    pub type_id: TypeId,
}

const fn tag(id: u16, name: &'static str, type_id: TypeId) -> ExifTagInfo {
    ExifTagInfo { id, name, type_id }
}

// Sub-IFD pointer tags. These are structural and regenerated on write.
pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD: u16 = 0x8825;
pub const TAG_INTEROP_IFD: u16 = 0xA005;

pub const TAG_THUMBNAIL_OFFSET: u16 = 0x0201;
pub const TAG_THUMBNAIL_LENGTH: u16 = 0x0202;
pub const TAG_XMP_PACKET: u16 = 0x02BC;
pub const TAG_IPTC_NAA: u16 = 0x83BB;

const IMAGE_TAGS: &[ExifTagInfo] = &[
    tag(0x000B, "ProcessingSoftware", TypeId::Ascii),
    tag(0x00FE, "NewSubfileType", TypeId::Long),
    tag(0x0100, "ImageWidth", TypeId::Long),
    tag(0x0101, "ImageLength", TypeId::Long),
    tag(0x0102, "BitsPerSample", TypeId::Short),
    tag(0x0103, "Compression", TypeId::Short),
    tag(0x0106, "PhotometricInterpretation", TypeId::Short),
    tag(0x010D, "DocumentName", TypeId::Ascii),
    tag(0x010E, "ImageDescription", TypeId::Ascii),
    tag(0x010F, "Make", TypeId::Ascii),
    tag(0x0110, "Model", TypeId::Ascii),
    tag(0x0111, "StripOffsets", TypeId::Long),
    tag(0x0112, "Orientation", TypeId::Short),
    tag(0x0115, "SamplesPerPixel", TypeId::Short),
    tag(0x0116, "RowsPerStrip", TypeId::Long),
    tag(0x0117, "StripByteCounts", TypeId::Long),
    tag(0x011A, "XResolution", TypeId::Rational),
    tag(0x011B, "YResolution", TypeId::Rational),
    tag(0x011C, "PlanarConfiguration", TypeId::Short),
    tag(0x0128, "ResolutionUnit", TypeId::Short),
    tag(0x012D, "TransferFunction", TypeId::Short),
    tag(0x0131, "Software", TypeId::Ascii),
    tag(0x0132, "DateTime", TypeId::Ascii),
    tag(0x013B, "Artist", TypeId::Ascii),
    tag(0x013E, "WhitePoint", TypeId::Rational),
    tag(0x013F, "PrimaryChromaticities", TypeId::Rational),
    tag(TAG_THUMBNAIL_OFFSET, "JPEGInterchangeFormat", TypeId::Long),
    tag(TAG_THUMBNAIL_LENGTH, "JPEGInterchangeFormatLength", TypeId::Long),
    tag(0x0211, "YCbCrCoefficients", TypeId::Rational),
    tag(0x0212, "YCbCrSubSampling", TypeId::Short),
    tag(0x0213, "YCbCrPositioning", TypeId::Short),
    tag(0x0214, "ReferenceBlackWhite", TypeId::Rational),
    tag(TAG_XMP_PACKET, "XMLPacket", TypeId::Byte),
    tag(0x4746, "Rating", TypeId::Short),
    tag(0x4749, "RatingPercent", TypeId::Short),
    tag(0x8298, "Copyright", TypeId::Ascii),
    tag(TAG_IPTC_NAA, "IPTCNAA", TypeId::Long),
    tag(TAG_EXIF_IFD, "ExifTag", TypeId::Long),
    tag(TAG_GPS_IFD, "GPSTag", TypeId::Long),
    tag(0x9C9B, "XPTitle", TypeId::Byte),
    tag(0x9C9C, "XPComment", TypeId::Byte),
    tag(0x9C9D, "XPAuthor", TypeId::Byte),
    tag(0x9C9E, "XPKeywords", TypeId::Byte),
    tag(0x9C9F, "XPSubject", TypeId::Byte),
    tag(0xC612, "DNGVersion", TypeId::Byte),
];

const PHOTO_TAGS: &[ExifTagInfo] = &[
    tag(0x829A, "ExposureTime", TypeId::Rational),
    tag(0x829D, "FNumber", TypeId::Rational),
    tag(0x8822, "ExposureProgram", TypeId::Short),
    tag(0x8827, "ISOSpeedRatings", TypeId::Short),
    tag(0x8830, "SensitivityType", TypeId::Short),
    tag(0x9000, "ExifVersion", TypeId::Undefined),
    tag(0x9003, "DateTimeOriginal", TypeId::Ascii),
    tag(0x9004, "DateTimeDigitized", TypeId::Ascii),
    tag(0x9010, "OffsetTime", TypeId::Ascii),
    tag(0x9011, "OffsetTimeOriginal", TypeId::Ascii),
    tag(0x9012, "OffsetTimeDigitized", TypeId::Ascii),
    tag(0x9101, "ComponentsConfiguration", TypeId::Undefined),
    tag(0x9102, "CompressedBitsPerPixel", TypeId::Rational),
    tag(0x9201, "ShutterSpeedValue", TypeId::SRational),
    tag(0x9202, "ApertureValue", TypeId::Rational),
    tag(0x9203, "BrightnessValue", TypeId::SRational),
    tag(0x9204, "ExposureBiasValue", TypeId::SRational),
    tag(0x9205, "MaxApertureValue", TypeId::Rational),
    tag(0x9206, "SubjectDistance", TypeId::Rational),
    tag(0x9207, "MeteringMode", TypeId::Short),
    tag(0x9208, "LightSource", TypeId::Short),
    tag(0x9209, "Flash", TypeId::Short),
    tag(0x920A, "FocalLength", TypeId::Rational),
    tag(0x927C, "MakerNote", TypeId::Undefined),
    tag(0x9286, "UserComment", TypeId::Undefined),
    tag(0x9290, "SubSecTime", TypeId::Ascii),
    tag(0x9291, "SubSecTimeOriginal", TypeId::Ascii),
    tag(0x9292, "SubSecTimeDigitized", TypeId::Ascii),
    tag(0xA000, "FlashpixVersion", TypeId::Undefined),
    tag(0xA001, "ColorSpace", TypeId::Short),
    tag(0xA002, "PixelXDimension", TypeId::Long),
    tag(0xA003, "PixelYDimension", TypeId::Long),
    tag(TAG_INTEROP_IFD, "InteroperabilityTag", TypeId::Long),
    tag(0xA20E, "FocalPlaneXResolution", TypeId::Rational),
    tag(0xA20F, "FocalPlaneYResolution", TypeId::Rational),
    tag(0xA210, "FocalPlaneResolutionUnit", TypeId::Short),
    tag(0xA217, "SensingMethod", TypeId::Short),
    tag(0xA300, "FileSource", TypeId::Undefined),
    tag(0xA301, "SceneType", TypeId::Undefined),
    tag(0xA401, "CustomRendered", TypeId::Short),
    tag(0xA402, "ExposureMode", TypeId::Short),
    tag(0xA403, "WhiteBalance", TypeId::Short),
    tag(0xA404, "DigitalZoomRatio", TypeId::Rational),
    tag(0xA405, "FocalLengthIn35mmFilm", TypeId::Short),
    tag(0xA406, "SceneCaptureType", TypeId::Short),
    tag(0xA408, "Contrast", TypeId::Short),
    tag(0xA409, "Saturation", TypeId::Short),
    tag(0xA40A, "Sharpness", TypeId::Short),
    tag(0xA420, "ImageUniqueID", TypeId::Ascii),
    tag(0xA430, "CameraOwnerName", TypeId::Ascii),
    tag(0xA431, "BodySerialNumber", TypeId::Ascii),
    tag(0xA432, "LensSpecification", TypeId::Rational),
    tag(0xA433, "LensMake", TypeId::Ascii),
    tag(0xA434, "LensModel", TypeId::Ascii),
    tag(0xA435, "LensSerialNumber", TypeId::Ascii),
];

const GPS_TAGS: &[ExifTagInfo] = &[
    tag(0x0000, "GPSVersionID", TypeId::Byte),
    tag(0x0001, "GPSLatitudeRef", TypeId::Ascii),
    tag(0x0002, "GPSLatitude", TypeId::Rational),
    tag(0x0003, "GPSLongitudeRef", TypeId::Ascii),
    tag(0x0004, "GPSLongitude", TypeId::Rational),
    tag(0x0005, "GPSAltitudeRef", TypeId::Byte),
    tag(0x0006, "GPSAltitude", TypeId::Rational),
    tag(0x0007, "GPSTimeStamp", TypeId::Rational),
    tag(0x0008, "GPSSatellites", TypeId::Ascii),
    tag(0x0009, "GPSStatus", TypeId::Ascii),
    tag(0x000A, "GPSMeasureMode", TypeId::Ascii),
    tag(0x000B, "GPSDOP", TypeId::Rational),
    tag(0x000C, "GPSSpeedRef", TypeId::Ascii),
    tag(0x000D, "GPSSpeed", TypeId::Rational),
    tag(0x0010, "GPSImgDirectionRef", TypeId::Ascii),
    tag(0x0011, "GPSImgDirection", TypeId::Rational),
    tag(0x0012, "GPSMapDatum", TypeId::Ascii),
    tag(0x001B, "GPSProcessingMethod", TypeId::Undefined),
    tag(0x001D, "GPSDateStamp", TypeId::Ascii),
];

const IOP_TAGS: &[ExifTagInfo] = &[
    tag(0x0001, "InteroperabilityIndex", TypeId::Ascii),
    tag(0x0002, "InteroperabilityVersion", TypeId::Undefined),
    tag(0x1000, "RelatedImageFileFormat", TypeId::Ascii),
    tag(0x1001, "RelatedImageWidth", TypeId::Long),
    tag(0x1002, "RelatedImageLength", TypeId::Long),
];

pub fn exif_tag_by_id(group: ExifGroup, id: u16) -> Option<&'static ExifTagInfo> {
    group.table().iter().find(|t| t.id == id)
}

pub fn exif_tag_by_name(group: ExifGroup, name: &str) -> Option<&'static ExifTagInfo> {
    group.table().iter().find(|t| t.name == name)
}

/// IPTC-IIM records addressable through keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IptcRecord {
    Envelope,
    Application2,
}

impl IptcRecord {
    pub fn id(self) -> u8 {
        match self {
            Self::Envelope => 1,
            Self::Application2 => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Envelope),
            2 => Some(Self::Application2),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Envelope => "Envelope",
            Self::Application2 => "Application2",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Envelope" => Some(Self::Envelope),
            "Application2" => Some(Self::Application2),
            _ => parse_hex(name)
                .and_then(|id| u8::try_from(id).ok())
                .and_then(Self::from_id),
        }
    }

    fn table(self) -> &'static [IptcDatasetInfo] {
        match self {
            Self::Envelope => ENVELOPE_DATASETS,
            Self::Application2 => APPLICATION2_DATASETS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IptcDatasetInfo {
    pub id: u8,
    pub name: &'static str,
    pub type_id: TypeId,
}

const fn dataset(id: u8, name: &'static str, type_id: TypeId) -> IptcDatasetInfo {
    IptcDatasetInfo { id, name, type_id }
}

const ENVELOPE_DATASETS: &[IptcDatasetInfo] = &[
    dataset(0, "ModelVersion", TypeId::Short),
    dataset(5, "Destination", TypeId::Text),
    dataset(20, "FileFormat", TypeId::Short),
    dataset(22, "FileVersion", TypeId::Short),
    dataset(30, "ServiceId", TypeId::Text),
    dataset(40, "EnvelopeNumber", TypeId::Text),
    dataset(50, "ProductId", TypeId::Text),
    dataset(60, "EnvelopePriority", TypeId::Text),
    dataset(70, "DateSent", TypeId::Date),
    dataset(80, "TimeSent", TypeId::Time),
    dataset(90, "CharacterSet", TypeId::Text),
    dataset(100, "UNO", TypeId::Text),
    dataset(120, "ARMId", TypeId::Short),
    dataset(122, "ARMVersion", TypeId::Short),
];

const APPLICATION2_DATASETS: &[IptcDatasetInfo] = &[
    dataset(0, "RecordVersion", TypeId::Short),
    dataset(3, "ObjectType", TypeId::Text),
    dataset(4, "ObjectAttribute", TypeId::Text),
    dataset(5, "ObjectName", TypeId::Text),
    dataset(7, "EditStatus", TypeId::Text),
    dataset(10, "Urgency", TypeId::Text),
    dataset(12, "Subject", TypeId::Text),
    dataset(15, "Category", TypeId::Text),
    dataset(20, "SuppCategory", TypeId::Text),
    dataset(22, "FixtureId", TypeId::Text),
    dataset(25, "Keywords", TypeId::Text),
    dataset(26, "LocationCode", TypeId::Text),
    dataset(27, "LocationName", TypeId::Text),
    dataset(30, "ReleaseDate", TypeId::Date),
    dataset(35, "ReleaseTime", TypeId::Time),
    dataset(37, "ExpirationDate", TypeId::Date),
    dataset(38, "ExpirationTime", TypeId::Time),
    dataset(40, "SpecialInstructions", TypeId::Text),
    dataset(42, "ActionAdvised", TypeId::Text),
    dataset(45, "ReferenceService", TypeId::Text),
    dataset(47, "ReferenceDate", TypeId::Date),
    dataset(50, "ReferenceNumber", TypeId::Text),
    dataset(55, "DateCreated", TypeId::Date),
    dataset(60, "TimeCreated", TypeId::Time),
    dataset(62, "DigitizationDate", TypeId::Date),
    dataset(63, "DigitizationTime", TypeId::Time),
    dataset(65, "Program", TypeId::Text),
    dataset(70, "ProgramVersion", TypeId::Text),
    dataset(75, "ObjectCycle", TypeId::Text),
    dataset(80, "Byline", TypeId::Text),
    dataset(85, "BylineTitle", TypeId::Text),
    dataset(90, "City", TypeId::Text),
    dataset(92, "SubLocation", TypeId::Text),
    dataset(95, "ProvinceState", TypeId::Text),
    dataset(100, "CountryCode", TypeId::Text),
    dataset(101, "CountryName", TypeId::Text),
    dataset(103, "TransmissionReference", TypeId::Text),
    dataset(105, "Headline", TypeId::Text),
    dataset(110, "Credit", TypeId::Text),
    dataset(115, "Source", TypeId::Text),
    dataset(116, "Copyright", TypeId::Text),
    dataset(118, "Contact", TypeId::Text),
    dataset(120, "Caption", TypeId::Text),
    dataset(121, "LocalCaption", TypeId::Text),
    dataset(122, "Writer", TypeId::Text),
    dataset(125, "RasterizedCaption", TypeId::Undefined),
    dataset(130, "ImageType", TypeId::Text),
    dataset(131, "ImageOrientation", TypeId::Text),
    dataset(135, "Language", TypeId::Text),
    dataset(150, "AudioType", TypeId::Text),
];

pub fn iptc_dataset_by_id(record: IptcRecord, id: u8) -> Option<&'static IptcDatasetInfo> {
    record.table().iter().find(|d| d.id == id)
}

pub fn iptc_dataset_by_name(record: IptcRecord, name: &str) -> Option<&'static IptcDatasetInfo> {
    record.table().iter().find(|d| d.name == name)
}

/// Value types of XMP properties that are not plain text, keyed by
/// registered prefix and property name.
const XMP_PROPERTY_TYPES: &[(&str, &str, TypeId)] = &[
    ("dc", "title", TypeId::LangAlt),
    ("dc", "description", TypeId::LangAlt),
    ("dc", "rights", TypeId::LangAlt),
    ("dc", "subject", TypeId::XmpBag),
    ("dc", "creator", TypeId::XmpSeq),
    ("dc", "contributor", TypeId::XmpBag),
    ("dc", "publisher", TypeId::XmpBag),
    ("dc", "date", TypeId::XmpSeq),
    ("dc", "type", TypeId::XmpBag),
    ("dc", "language", TypeId::XmpBag),
    ("dc", "relation", TypeId::XmpBag),
    ("xmp", "Identifier", TypeId::XmpBag),
    ("xmpRights", "UsageTerms", TypeId::LangAlt),
    ("xmpRights", "Owner", TypeId::XmpBag),
    ("photoshop", "SupplementalCategories", TypeId::XmpBag),
    ("iptc", "Scene", TypeId::XmpBag),
    ("iptc", "SubjectCode", TypeId::XmpBag),
    ("lr", "hierarchicalSubject", TypeId::XmpBag),
    ("tiff", "BitsPerSample", TypeId::XmpSeq),
    ("exif", "ISOSpeedRatings", TypeId::XmpSeq),
];

pub fn xmp_property_type(prefix: &str, property: &str) -> TypeId {
    XMP_PROPERTY_TYPES
        .iter()
        .find(|(p, name, _)| *p == prefix && *name == property)
        .map(|(_, _, t)| *t)
        .unwrap_or(TypeId::Text)
}

/// Parse a `0x`-prefixed hexadecimal tag/dataset number.
pub(crate) fn parse_hex(s: &str) -> Option<u16> {
    let digits = s.strip_prefix("0x")?;
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}
