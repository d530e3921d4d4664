mod common;

use exif_mem::config::{Config, TokenPolicy};
use exif_mem::{Dispatcher, Error, read, read_tag_bytes, read_tag_text, write_bytes, write_string};

#[test]
fn unresolvable_keys_are_absent() {
    for buf in [common::jpeg(), common::png(), common::tiff(false)] {
        assert_eq!(read_tag_text(&buf, "Bogus.Foo"), None);
        assert_eq!(read_tag_text(&buf, "Exif.NoSuchGroup.Make"), None);
        assert_eq!(write_string(&buf, "Bogus.Foo", "x"), None);
        assert_eq!(write_bytes(&buf, "Bogus.Foo", &[1]), None);
    }
}

#[test]
fn unsupported_buffers() {
    let gif = b"GIF89a\x01\0\x01\0\0\0\0;".to_vec();
    assert!(read(&gif).is_empty());
    assert_eq!(read_tag_text(&gif, "Exif.Image.Make"), None);
    assert_eq!(write_string(&gif, "Exif.Image.Make", "x"), None);
}

#[test]
fn hex_tag_names_are_accepted() {
    let buf = write_string(&common::jpeg(), "Exif.Image.0x010f", "Canon").unwrap();
    assert_eq!(read_tag_text(&buf, "Exif.Image.Make").as_deref(), Some("Canon"));
}

#[test]
fn read_tag_bytes_filters_tokens() {
    let buf = write_string(&common::jpeg(), "Exif.Image.ImageDescription", "12 -1 256 abc 34").unwrap();
    assert_eq!(read_tag_bytes(&buf, "Exif.Image.ImageDescription"), Some(vec![12, 34]));

    let mut config = Config::default();
    config.codec.byte_tokens = TokenPolicy::Strict;
    let strict = Dispatcher::new(config);
    assert!(matches!(
        strict.try_read_tag_bytes(&buf, "Exif.Image.ImageDescription"),
        Err(Error::Encoding(_))
    ));
}

#[test]
fn write_string_then_read_matches() {
    let cases = [
        ("Exif.Image.Orientation", "6"),
        ("Exif.Photo.FNumber", "28/10"),
        ("Iptc.Application2.Byline", "Jane Doe"),
        ("Xmp.xmp.Rating", "4"),
        ("Xmp.photoshop.City", "Hamburg"),
    ];
    for (key, value) in cases {
        let buf = write_string(&common::png(), key, value).unwrap();
        assert_eq!(read_tag_text(&buf, key).as_deref(), Some(value), "{key}");
    }
}

#[test]
fn calls_are_independent() {
    let original = common::jpeg();
    let a = write_string(&original, "Exif.Image.Make", "A").unwrap();
    let b = write_string(&original, "Exif.Image.Make", "B").unwrap();
    assert_eq!(read_tag_text(&a, "Exif.Image.Make").as_deref(), Some("A"));
    assert_eq!(read_tag_text(&b, "Exif.Image.Make").as_deref(), Some("B"));
    assert_eq!(original, common::jpeg());
}
