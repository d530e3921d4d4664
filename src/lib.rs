//! # exif-mem
//!
//! Read and write Exif, IPTC and XMP metadata of JPEG, PNG and TIFF images
//! held entirely in memory. Nothing touches the filesystem: every call takes
//! a byte buffer and, when writing, returns a new one.
//!
//! ## Quick Start
//!
//! The five operations in [`ops`] cover most uses. They never fail loudly;
//! an unreadable buffer reads as an empty record and a failed write yields
//! `None`.
//!
//! ```rust,no_run
//! let photo = std::fs::read("photo.jpg").unwrap();
//!
//! let record = exif_mem::read(&photo);
//! for (key, value) in &record.exif {
//!     println!("{key} = {value}");
//! }
//!
//! let model = exif_mem::read_tag_text(&photo, "Exif.Image.Model");
//! println!("Camera: {model:?}");
//!
//! if let Some(updated) = exif_mem::write_string(&photo, "Xmp.dc.title", "Harbour at dusk") {
//!     std::fs::write("photo.jpg", updated).unwrap();
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! [`Dispatcher`] runs the same operations under a [`Config`] and reports
//! typed [`Error`]s through its `try_*` methods. [`Image`] gives direct
//! access to the three stores:
//!
//! ```rust,no_run
//! use exif_mem::{Image, Key};
//!
//! # fn main() -> exif_mem::Result<()> {
//! let photo = std::fs::read("photo.png").unwrap();
//! let mut image = Image::open(&photo)?;
//! image.read_metadata()?;
//!
//! image.assign_str(&Key::parse("Iptc.Application2.Keywords")?, "harbour")?;
//! image.assign_str(&Key::parse("Exif.Image.Artist")?, "J. Doe")?;
//! image.write_metadata()?;
//! let bytes = image.flush()?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Exif | IPTC | XMP |
//! |--------|------|------|-----|
//! | JPEG | `APP1` `Exif` | `APP13` Photoshop 8BIM | `APP1` XMP |
//! | PNG | `eXIf` | `tEXt` raw profile | `iTXt` |
//! | TIFF | IFD chain | tag `0x83BB` | tag `0x02BC` |
//!
//! ## Modules
//!
//! - [`ops`]: the boundary operations and [`MetadataRecord`]
//! - [`image`]: container detection, [`Image`], per-format handlers
//! - [`exif`], [`iptc`], [`xmp`]: namespace codecs
//! - [`key`], [`tags`]: key grammar and tag dictionaries
//! - [`value`], [`store`]: typed values and entry storage
//! - [`config`]: codec and writer settings

pub mod config;
pub mod error;
pub mod exif;
pub mod image;
pub mod io;
pub mod iptc;
pub mod key;
pub mod ops;
pub mod store;
pub mod tags;
pub mod value;
pub mod xmp;

pub use config::Config;
pub use error::{Error, Result};
pub use image::{Image, ImageFormat};
pub use key::Key;
pub use ops::{
    Dispatcher, MetadataRecord, read, read_tag_bytes, read_tag_text, write_bytes, write_string,
};
pub use value::TypedValue;
