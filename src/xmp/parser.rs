use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{RDF_NS, XML_NS, XmpData, initialize};
use crate::error::{Error, Result};
use crate::key::XmpKey;
use crate::value::{ArrayKind, TypedValue};

const FORMAT: &str = "XMP";

/// A namespace-resolved XML element.
#[derive(Debug, Default)]
struct Element {
    ns: String,
    local: String,
    attrs: Vec<Attr>,
    children: Vec<Element>,
    text: String,
}

#[derive(Debug)]
struct Attr {
    ns: String,
    local: String,
    value: String,
}

impl Element {
    fn is_rdf(&self, local: &str) -> bool {
        self.ns == RDF_NS && self.local == local
    }

    fn rdf_attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns == RDF_NS && a.local == local)
            .map(|a| a.value.as_str())
    }

    fn lang(&self) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns == XML_NS && a.local == "lang")
            .map(|a| a.value.as_str())
    }

    /// Attributes that are metadata properties rather than RDF or XML syntax.
    fn property_attrs(&self) -> impl Iterator<Item = &Attr> {
        self.attrs
            .iter()
            .filter(|a| !a.ns.is_empty() && a.ns != RDF_NS && a.ns != XML_NS)
    }

    fn property_children(&self) -> impl Iterator<Item = &Element> {
        self.children
            .iter()
            .filter(|c| !c.ns.is_empty() && c.ns != RDF_NS)
    }

    /// Plain text item: no element children and no property attributes.
    fn is_simple(&self) -> bool {
        self.children.is_empty()
            && self.property_attrs().next().is_none()
            && self.rdf_attr("parseType").is_none()
            && self.rdf_attr("resource").is_none()
    }

    fn find_rdf(&self, local: &str) -> Option<&Element> {
        if self.is_rdf(local) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_rdf(local))
    }
}

/// Parse an XMP packet into entries.
///
/// Leading BOM and trailing NUL padding are tolerated. Any XML error fails
/// the whole packet.
pub fn decode(data: &[u8]) -> Result<XmpData> {
    initialize();
    let text = std::str::from_utf8(data).map_err(|e| Error::corrupt(FORMAT, e))?;
    let text = text
        .trim_start_matches('\u{feff}')
        .trim_end_matches(['\0', ' ', '\n', '\r', '\t']);

    let (root, declarations) = parse_tree(text)?;
    let mut walker = Walker {
        xmp: XmpData::new(),
        declarations,
    };
    match root.find_rdf("RDF") {
        Some(rdf) => {
            for desc in rdf.children.iter().filter(|c| c.is_rdf("Description")) {
                walker.description(desc);
            }
        }
        None => log::debug!("XMP packet has no rdf:RDF element"),
    }

    log::debug!("Decoded {} XMP properties", walker.xmp.store.len());
    Ok(walker.xmp)
}

/// Build the element tree. Returns a synthetic document node and every
/// `xmlns` declaration seen, in document order.
fn parse_tree(text: &str) -> Result<(Element, Vec<(String, String)>)> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut declarations = Vec::new();
    let mut scopes: Vec<Vec<(String, String)>> = Vec::new();
    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event().map_err(|e| Error::corrupt(FORMAT, e))? {
            Event::Start(e) => {
                let (element, scope) = open_element(&e, &mut declarations)?;
                scopes.push(scope);
                stack.push(element);
            }
            Event::Empty(e) => {
                let (element, scope) = open_element(&e, &mut declarations)?;
                scopes.push(scope);
                let element = resolve_names(element, &scopes)?;
                scopes.pop();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(Error::corrupt(FORMAT, "unbalanced end tag"));
                }
                let element = stack.pop().unwrap_or_default();
                let element = resolve_names(element, &scopes)?;
                scopes.pop();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::Text(t) => {
                let unescaped = t.unescape().map_err(|e| Error::corrupt(FORMAT, e))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(Error::corrupt(FORMAT, "unclosed element"));
    }
    Ok((stack.pop().unwrap_or_default(), declarations))
}

/// Read an element's raw name and attributes and collect its `xmlns`
/// declarations. Prefixes are resolved once the scope is pushed.
fn open_element(
    e: &BytesStart<'_>,
    declarations: &mut Vec<(String, String)>,
) -> Result<(Element, Vec<(String, String)>)> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| Error::corrupt(FORMAT, err))?
        .to_string();

    let mut scope = Vec::new();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::corrupt(FORMAT, err))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| Error::corrupt(FORMAT, err))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::corrupt(FORMAT, err))?
            .into_owned();

        if key == "xmlns" {
            scope.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.push((prefix.to_string(), value.clone()));
            scope.push((prefix.to_string(), value));
        } else {
            // the raw qualified name rides in `local` until resolve_names
            attrs.push(Attr {
                ns: String::new(),
                local: key,
                value,
            });
        }
    }

    let element = Element {
        ns: String::new(),
        local: name,
        attrs,
        ..Default::default()
    };
    Ok((element, scope))
}

fn lookup<'a>(scopes: &'a [Vec<(String, String)>], prefix: &str) -> Option<&'a str> {
    if prefix == "xml" {
        return Some(XML_NS);
    }
    scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter().rev())
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str())
}

/// Replace raw qualified names with (namespace URI, local name).
fn resolve_names(mut element: Element, scopes: &[Vec<(String, String)>]) -> Result<Element> {
    let (ns, local) = match element.local.split_once(':') {
        Some((prefix, local)) => {
            let ns = lookup(scopes, prefix).ok_or_else(|| {
                Error::corrupt(FORMAT, format!("undeclared namespace prefix '{prefix}'"))
            })?;
            (ns.to_string(), local.to_string())
        }
        None => (
            lookup(scopes, "").unwrap_or_default().to_string(),
            element.local.clone(),
        ),
    };
    element.ns = ns;
    element.local = local;

    for attr in &mut element.attrs {
        // unprefixed attributes have no namespace
        if let Some((prefix, local)) = attr.local.split_once(':') {
            let ns = lookup(scopes, prefix).ok_or_else(|| {
                Error::corrupt(FORMAT, format!("undeclared namespace prefix '{prefix}'"))
            })?;
            attr.ns = ns.to_string();
            attr.local = local.to_string();
        }
    }
    Ok(element)
}

/// Flattens RDF into store entries.
struct Walker {
    xmp: XmpData,
    declarations: Vec<(String, String)>,
}

impl Walker {
    /// Key prefix for a namespace URI. Unknown URIs keep the prefix the
    /// document declared for them and are remembered in the store.
    fn prefix_for(&mut self, uri: &str) -> String {
        if let Some(schema) = initialize().by_uri(uri) {
            return schema.prefix.to_string();
        }
        if let Some((prefix, _)) = self.xmp.namespaces.iter().find(|(_, u)| *u == uri) {
            return prefix.clone();
        }

        let declared = self
            .declarations
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.clone())
            .filter(|p| !p.is_empty());
        let taken = |p: &str, xmp: &XmpData| {
            initialize().by_name(p).is_some() || xmp.namespaces.contains_key(p)
        };
        let prefix = match declared {
            Some(p) if !taken(&p, &self.xmp) => p,
            _ => {
                let mut n = 1;
                while taken(&format!("ns{n}"), &self.xmp) {
                    n += 1;
                }
                format!("ns{n}")
            }
        };
        log::debug!("Registering document namespace {prefix} = {uri}");
        self.xmp.namespaces.insert(prefix.clone(), uri.to_string());
        prefix
    }

    /// Prefix used for struct field names inside paths.
    fn qualifier_for(&mut self, uri: &str) -> String {
        match initialize().by_uri(uri) {
            Some(schema) => schema.qualifier.to_string(),
            None => self.prefix_for(uri),
        }
    }

    fn push(&mut self, prefix: &str, path: String, value: TypedValue) {
        self.xmp.store.push(XmpKey::new(prefix, path), value);
    }

    fn description(&mut self, desc: &Element) {
        for attr in desc.property_attrs() {
            let prefix = self.prefix_for(&attr.ns);
            self.push(&prefix, attr.local.clone(), TypedValue::Text(attr.value.clone()));
        }
        for child in desc.property_children() {
            let prefix = self.prefix_for(&child.ns);
            self.property(&prefix, child.local.clone(), child);
        }
    }

    fn property(&mut self, prefix: &str, path: String, elem: &Element) {
        if let Some(resource) = elem.rdf_attr("resource") {
            self.push(prefix, path, TypedValue::Text(resource.to_string()));
            return;
        }
        if elem.rdf_attr("parseType") == Some("Resource") {
            self.fields(prefix, &path, elem);
            return;
        }

        let container = elem.children.iter().find_map(|c| match c.local.as_str() {
            "Bag" if c.ns == RDF_NS => Some((ArrayKind::Bag, c)),
            "Seq" if c.ns == RDF_NS => Some((ArrayKind::Seq, c)),
            "Alt" if c.ns == RDF_NS => Some((ArrayKind::Alt, c)),
            _ => None,
        });
        if let Some((kind, container)) = container {
            self.array(prefix, path, kind, container);
            return;
        }

        if let Some(inner) = elem.children.iter().find(|c| c.is_rdf("Description")) {
            self.fields(prefix, &path, inner);
            return;
        }
        if elem.property_children().next().is_some() || elem.property_attrs().next().is_some() {
            self.fields(prefix, &path, elem);
            return;
        }

        self.push(prefix, path, TypedValue::Text(elem.text.clone()));
    }

    fn fields(&mut self, prefix: &str, path: &str, elem: &Element) {
        for attr in elem.property_attrs() {
            let q = self.qualifier_for(&attr.ns);
            let field = format!("{path}/{q}:{}", attr.local);
            self.push(prefix, field, TypedValue::Text(attr.value.clone()));
        }
        for child in elem.property_children() {
            let q = self.qualifier_for(&child.ns);
            let field = format!("{path}/{q}:{}", child.local);
            self.property(prefix, field, child);
        }
    }

    fn array(&mut self, prefix: &str, path: String, kind: ArrayKind, container: &Element) {
        let items: Vec<&Element> = container.children.iter().filter(|c| c.is_rdf("li")).collect();

        if kind == ArrayKind::Alt && !items.is_empty() && items.iter().all(|li| li.lang().is_some())
        {
            let alts = items
                .iter()
                .map(|li| (li.lang().unwrap_or("x-default").to_string(), li.text.clone()))
                .collect();
            self.push(prefix, path, TypedValue::LangAlt(alts));
            return;
        }

        if items.iter().all(|li| li.is_simple()) {
            let texts = items.iter().map(|li| li.text.clone()).collect();
            self.push(prefix, path, TypedValue::Array(kind, texts));
            return;
        }

        // array of structures: the container, then one path per item
        self.push(prefix, path.clone(), TypedValue::Array(kind, Vec::new()));
        for (i, li) in items.iter().enumerate() {
            let item_path = format!("{path}[{}]", i + 1);
            if li.is_simple() {
                self.push(prefix, item_path, TypedValue::Text(li.text.clone()));
            } else {
                self.property(prefix, item_path, li);
            }
        }
    }
}
