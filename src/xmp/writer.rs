use std::collections::BTreeMap;

use super::{RDF_NS, XMP_META_NS, XmpData, initialize};
use crate::error::{Error, Result};
use crate::value::{ArrayKind, TypedValue};

/// One step below a top-level property in an entry path.
#[derive(Debug, Clone, PartialEq)]
enum Step {
    /// 1-based array index, `[n]`.
    Index(usize),
    /// Qualified struct field, `/ns:Name`.
    Field(String),
}

/// Property tree rebuilt from flattened paths.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Empty,
    Leaf(String),
    LangAlt(Vec<(String, String)>),
    Array(ArrayKind, Vec<Node>),
    Struct(Vec<(String, Node)>),
}

impl From<&TypedValue> for Node {
    fn from(value: &TypedValue) -> Self {
        match value {
            TypedValue::Array(kind, items) => {
                Node::Array(*kind, items.iter().cloned().map(Node::Leaf).collect())
            }
            TypedValue::LangAlt(items) => Node::LangAlt(items.clone()),
            other => Node::Leaf(other.to_string()),
        }
    }
}

/// Split `Base[1]/ns:Field` into the base name and the steps below it.
fn parse_path(path: &str) -> Result<(&str, Vec<Step>)> {
    let bad = || Error::write(format!("unsupported XMP path '{path}'"));
    let base_end = path.find(['/', '[']).unwrap_or(path.len());
    let (base, mut rest) = path.split_at(base_end);

    let mut steps = Vec::new();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(bad)?;
            let index: usize = after[..close].parse().map_err(|_| bad())?;
            if index == 0 {
                return Err(bad());
            }
            steps.push(Step::Index(index));
            rest = &after[close + 1..];
        } else if let Some(after) = rest.strip_prefix('/') {
            let end = after.find(['/', '[']).unwrap_or(after.len());
            let field = &after[..end];
            match field.split_once(':') {
                Some((ns, name)) if !ns.is_empty() && !name.is_empty() => {}
                _ => return Err(bad()),
            }
            steps.push(Step::Field(field.to_string()));
            rest = &after[end..];
        } else {
            return Err(bad());
        }
    }
    Ok((base, steps))
}

/// Place `leaf` at `steps` below `node`, creating arrays and structs on
/// the way.
fn insert(node: Node, steps: &[Step], leaf: Node) -> Node {
    let Some((step, rest)) = steps.split_first() else {
        return match (node, leaf) {
            // an empty container entry only sets the array kind
            (Node::Array(_, items), Node::Array(kind, new)) if new.is_empty() => {
                Node::Array(kind, items)
            }
            (_, leaf) => leaf,
        };
    };

    match step {
        Step::Index(i) => {
            let (kind, mut items) = match node {
                Node::Array(kind, items) => (kind, items),
                _ => (ArrayKind::Bag, Vec::new()),
            };
            if items.len() < *i {
                items.resize(*i, Node::Empty);
            }
            let slot = std::mem::replace(&mut items[i - 1], Node::Empty);
            items[i - 1] = insert(slot, rest, leaf);
            Node::Array(kind, items)
        }
        Step::Field(name) => {
            let mut fields = match node {
                Node::Struct(fields) => fields,
                _ => Vec::new(),
            };
            match fields.iter().position(|(n, _)| n == name) {
                Some(pos) => {
                    let slot = std::mem::replace(&mut fields[pos].1, Node::Empty);
                    fields[pos].1 = insert(slot, rest, leaf);
                }
                None => fields.push((name.clone(), insert(Node::Empty, rest, leaf))),
            }
            Node::Struct(fields)
        }
    }
}

/// A top-level property: key prefix, local name, value tree.
struct Property {
    prefix: String,
    name: String,
    node: Node,
}

fn build_tree(xmp: &XmpData) -> Result<Vec<Property>> {
    let mut properties: Vec<Property> = Vec::new();
    for entry in xmp.iter() {
        let (base, steps) = parse_path(&entry.key.property)?;
        let pos = match properties
            .iter()
            .position(|p| p.prefix == entry.key.prefix && p.name == base)
        {
            Some(pos) => pos,
            None => {
                properties.push(Property {
                    prefix: entry.key.prefix.clone(),
                    name: base.to_string(),
                    node: Node::Empty,
                });
                properties.len() - 1
            }
        };
        let node = std::mem::replace(&mut properties[pos].node, Node::Empty);
        properties[pos].node = insert(node, &steps, Node::from(&entry.value));
    }
    Ok(properties)
}

/// Collect the XML prefix and URI for every namespace the tree uses.
fn namespaces(xmp: &XmpData, properties: &[Property]) -> Result<BTreeMap<String, String>> {
    fn walk(node: &Node, out: &mut Vec<String>) {
        match node {
            Node::Struct(fields) => {
                for (name, child) in fields {
                    if let Some((ns, _)) = name.split_once(':') {
                        out.push(ns.to_string());
                    }
                    walk(child, out);
                }
            }
            Node::Array(_, items) => items.iter().for_each(|i| walk(i, out)),
            _ => {}
        }
    }

    let mut names = Vec::new();
    for property in properties {
        names.push(qualifier(xmp, &property.prefix)?);
        walk(&property.node, &mut names);
    }

    let mut declared = BTreeMap::new();
    for name in names {
        let uri = xmp
            .resolve_prefix(&name)
            .ok_or_else(|| Error::write(format!("unknown XMP namespace prefix '{name}'")))?;
        declared.insert(name, uri);
    }
    Ok(declared)
}

/// XML prefix used on the element for a key prefix.
fn qualifier(xmp: &XmpData, prefix: &str) -> Result<String> {
    if let Some(schema) = initialize().by_name(prefix) {
        return Ok(schema.qualifier.to_string());
    }
    if xmp.namespaces.contains_key(prefix) {
        return Ok(prefix.to_string());
    }
    Err(Error::write(format!("unknown XMP namespace prefix '{prefix}'")))
}

fn write_node(xmp: &mut String, name: &str, node: &Node, indent: usize) {
    let pad = " ".repeat(indent);
    match node {
        Node::Empty => xmp.push_str(&format!("{pad}<{name}/>\n")),
        Node::Leaf(text) => {
            xmp.push_str(&format!("{pad}<{name}>{}</{name}>\n", xml_escape(text)));
        }
        Node::LangAlt(items) => {
            xmp.push_str(&format!("{pad}<{name}>\n{pad} <rdf:Alt>\n"));
            // x-default goes first
            let ordered = items
                .iter()
                .filter(|(l, _)| l == "x-default")
                .chain(items.iter().filter(|(l, _)| l != "x-default"));
            for (lang, text) in ordered {
                xmp.push_str(&format!(
                    "{pad}  <rdf:li xml:lang=\"{}\">{}</rdf:li>\n",
                    xml_escape(lang),
                    xml_escape(text)
                ));
            }
            xmp.push_str(&format!("{pad} </rdf:Alt>\n{pad}</{name}>\n"));
        }
        Node::Array(kind, items) => {
            let container = kind.rdf_name();
            xmp.push_str(&format!("{pad}<{name}>\n{pad} <{container}>\n"));
            for item in items {
                write_node(xmp, "rdf:li", item, indent + 2);
            }
            xmp.push_str(&format!("{pad} </{container}>\n{pad}</{name}>\n"));
        }
        Node::Struct(fields) => {
            xmp.push_str(&format!("{pad}<{name} rdf:parseType=\"Resource\">\n"));
            for (field, child) in fields {
                write_node(xmp, field, child, indent + 1);
            }
            xmp.push_str(&format!("{pad}</{name}>\n"));
        }
    }
}

/// Serialize the store as a complete XMP packet with `padding` bytes of
/// whitespace before the trailer. Returns `None` for an empty store.
pub fn encode(xmp_data: &XmpData, padding: usize) -> Result<Option<Vec<u8>>> {
    initialize();
    if xmp_data.is_empty() {
        return Ok(None);
    }
    let properties = build_tree(xmp_data)?;
    let declared = namespaces(xmp_data, &properties)?;

    let mut xmp = String::new();
    xmp.push_str("<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n");
    xmp.push_str(&format!("<x:xmpmeta xmlns:x=\"{XMP_META_NS}\">\n"));
    xmp.push_str(&format!(" <rdf:RDF xmlns:rdf=\"{RDF_NS}\">\n"));
    xmp.push_str("  <rdf:Description rdf:about=\"\"");
    for (prefix, uri) in &declared {
        xmp.push_str(&format!("\n    xmlns:{prefix}=\"{}\"", xml_escape(uri)));
    }
    xmp.push_str(">\n");

    for property in &properties {
        let name = format!("{}:{}", qualifier(xmp_data, &property.prefix)?, property.name);
        write_node(&mut xmp, &name, &property.node, 3);
    }

    xmp.push_str("  </rdf:Description>\n");
    xmp.push_str(" </rdf:RDF>\n");
    xmp.push_str("</x:xmpmeta>\n");
    for _ in 0..padding / 100 {
        xmp.push_str(&" ".repeat(99));
        xmp.push('\n');
    }
    xmp.push_str(&" ".repeat(padding % 100));
    xmp.push_str("<?xpacket end=\"w\"?>");

    log::debug!(
        "Encoded {} XMP properties into {} bytes",
        properties.len(),
        xmp.len()
    );
    Ok(Some(xmp.into_bytes()))
}

/// Escape special XML characters.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
