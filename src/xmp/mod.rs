//! XMP metadata: RDF/XML packets flattened into path-addressed entries.
//!
//! Keys use the registered schema prefix (`Xmp.dc.title`). Inside a path,
//! struct fields are qualified with the XML prefix of their schema, which
//! for most schemas is the same string:
//! `Xmp.iptcExt.LocationShown[1]/Iptc4xmpExt:City`.

mod parser;
mod writer;

pub use parser::decode;
pub use writer::encode;

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::key::XmpKey;
use crate::store::{Entry, Store};
use crate::value::TypedValue;

pub(crate) const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub(crate) const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub(crate) const XMP_META_NS: &str = "adobe:ns:meta/";

/// A known schema: key prefix, namespace URI, XML prefix used in paths.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub prefix: &'static str,
    pub uri: &'static str,
    pub qualifier: &'static str,
}

const fn schema(prefix: &'static str, uri: &'static str) -> Schema {
    Schema {
        prefix,
        uri,
        qualifier: prefix,
    }
}

const STANDARD_SCHEMAS: &[Schema] = &[
    schema("dc", "http://purl.org/dc/elements/1.1/"),
    schema("xmp", "http://ns.adobe.com/xap/1.0/"),
    schema("xmpRights", "http://ns.adobe.com/xap/1.0/rights/"),
    schema("xmpMM", "http://ns.adobe.com/xap/1.0/mm/"),
    schema("xmpBJ", "http://ns.adobe.com/xap/1.0/bj/"),
    schema("xmpTPg", "http://ns.adobe.com/xap/1.0/t/pg/"),
    schema("xmpDM", "http://ns.adobe.com/xmp/1.0/DynamicMedia/"),
    schema("xmpG", "http://ns.adobe.com/xap/1.0/g/"),
    schema("xmpGImg", "http://ns.adobe.com/xap/1.0/g/img/"),
    schema("stEvt", "http://ns.adobe.com/xap/1.0/sType/ResourceEvent#"),
    schema("stRef", "http://ns.adobe.com/xap/1.0/sType/ResourceRef#"),
    schema("stDim", "http://ns.adobe.com/xap/1.0/sType/Dimensions#"),
    schema("pdf", "http://ns.adobe.com/pdf/1.3/"),
    schema("photoshop", "http://ns.adobe.com/photoshop/1.0/"),
    schema("crs", "http://ns.adobe.com/camera-raw-settings/1.0/"),
    schema("tiff", "http://ns.adobe.com/tiff/1.0/"),
    schema("exif", "http://ns.adobe.com/exif/1.0/"),
    schema("exifEX", "http://cipa.jp/exif/1.0/"),
    schema("aux", "http://ns.adobe.com/exif/1.0/aux/"),
    Schema {
        prefix: "iptc",
        uri: "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/",
        qualifier: "Iptc4xmpCore",
    },
    Schema {
        prefix: "iptcExt",
        uri: "http://iptc.org/std/Iptc4xmpExt/2008-02-29/",
        qualifier: "Iptc4xmpExt",
    },
    schema("plus", "http://ns.useplus.org/ldf/xmp/1.0/"),
    schema("mwg-rs", "http://www.metadataworkinggroup.com/schemas/regions/"),
    schema("mwg-kw", "http://www.metadataworkinggroup.com/schemas/keywords/"),
    schema("dwc", "http://rs.tdwg.org/dwc/index.htm"),
    schema("lr", "http://ns.adobe.com/lightroom/1.0/"),
    schema("digiKam", "http://www.digikam.org/ns/1.0/"),
    schema("MicrosoftPhoto", "http://ns.microsoft.com/photo/1.0/"),
];

/// Process-wide, read-only table of the standard XMP schemas.
#[derive(Debug)]
pub struct Registry {
    by_uri: HashMap<&'static str, Schema>,
    by_name: HashMap<&'static str, Schema>,
}

impl Registry {
    fn standard() -> Self {
        let mut by_uri = HashMap::new();
        let mut by_name = HashMap::new();
        for schema in STANDARD_SCHEMAS {
            by_uri.insert(schema.uri, *schema);
            by_name.insert(schema.prefix, *schema);
            by_name.insert(schema.qualifier, *schema);
        }
        log::debug!("XMP registry initialized with {} schemas", STANDARD_SCHEMAS.len());
        Self { by_uri, by_name }
    }

    pub fn by_uri(&self, uri: &str) -> Option<&Schema> {
        self.by_uri.get(uri)
    }

    /// Look up a schema by key prefix or by path qualifier.
    pub fn by_name(&self, name: &str) -> Option<&Schema> {
        self.by_name.get(name)
    }
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Initialize the schema registry. Safe to call any number of times from
/// any thread; only the first call does work.
pub fn initialize() -> &'static Registry {
    REGISTRY.get_or_init(Registry::standard)
}

/// Decoded XMP properties plus the namespaces the packet declared that the
/// registry does not know.
#[derive(Debug, Clone, Default)]
pub struct XmpData {
    pub(crate) store: Store<XmpKey>,
    /// Document-local schemas, prefix to URI.
    pub(crate) namespaces: BTreeMap<String, String>,
}

impl XmpData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &Store<XmpKey> {
        &self.store
    }

    pub fn find(&self, key: &XmpKey) -> Option<&Entry<XmpKey>> {
        self.store.find(key)
    }

    pub fn upsert(&mut self, key: XmpKey, value: TypedValue) {
        self.store.upsert(key, value);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<XmpKey>> {
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

    /// Namespaces declared by the packet that are not standard schemas.
    pub fn custom_namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// URI for a key prefix or path qualifier, standard or document-local.
    pub(crate) fn resolve_prefix(&self, name: &str) -> Option<String> {
        initialize()
            .by_name(name)
            .map(|s| s.uri.to_string())
            .or_else(|| self.namespaces.get(name).cloned())
    }
}
