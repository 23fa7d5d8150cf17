//! Property-list serialization: the NetBSD proplib / Apple-style XML
//! dialect used for `pkgdb.plist`, `props.plist`, `files.plist`, and
//! repository index files.
//!
//! Four node kinds only: dictionary, array, string, integer. Round-trip
//! equality is a hard requirement (see invariant 4 in the data model).

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::Cursor;

/// A property-list node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plist {
    Dict(BTreeMap<String, Plist>),
    Array(Vec<Plist>),
    String(String),
    Integer(i64),
}

impl Plist {
    /// Borrow as a dictionary, if this node is one.
    #[must_use]
    pub fn as_dict(&self) -> Option<&BTreeMap<String, Plist>> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Borrow as an array, if this node is one.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Plist]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow as a string, if this node is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as an integer, if this node is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Look up a key in a dictionary node, returning a `MalformedPlist`
    /// error if `self` is not a dictionary or the key is absent.
    pub fn get(&self, key: &str) -> crate::Result<&Plist> {
        self.as_dict()
            .and_then(|d| d.get(key))
            .ok_or_else(|| crate::Error::malformed_plist(format!("missing key '{key}'"), None))
    }

    /// Serialize this `Plist` document to the XML dialect.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), None)))
            .expect("writing to an in-memory buffer cannot fail");
        write_node(&mut writer, self);
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).expect("writer only emits UTF-8 content")
    }

    /// Parse a `Plist` document from the XML dialect.
    pub fn from_xml(xml: &str) -> crate::Result<Plist> {
        from_xml(xml)
    }
}

fn write_node(writer: &mut Writer<Cursor<Vec<u8>>>, node: &Plist) {
    match node {
        Plist::Dict(map) => {
            writer.write_event(Event::Start(BytesStart::new("dict"))).unwrap();
            for (k, v) in map {
                writer.write_event(Event::Start(BytesStart::new("key"))).unwrap();
                writer
                    .write_event(Event::Text(BytesText::new(k)))
                    .unwrap();
                writer.write_event(Event::End(BytesEnd::new("key"))).unwrap();
                write_node(writer, v);
            }
            writer.write_event(Event::End(BytesEnd::new("dict"))).unwrap();
        }
        Plist::Array(items) => {
            writer.write_event(Event::Start(BytesStart::new("array"))).unwrap();
            for item in items {
                write_node(writer, item);
            }
            writer.write_event(Event::End(BytesEnd::new("array"))).unwrap();
        }
        Plist::String(s) => {
            writer.write_event(Event::Start(BytesStart::new("string"))).unwrap();
            writer.write_event(Event::Text(BytesText::new(s))).unwrap();
            writer.write_event(Event::End(BytesEnd::new("string"))).unwrap();
        }
        Plist::Integer(i) => {
            writer.write_event(Event::Start(BytesStart::new("integer"))).unwrap();
            writer
                .write_event(Event::Text(BytesText::new(&i.to_string())))
                .unwrap();
            writer.write_event(Event::End(BytesEnd::new("integer"))).unwrap();
        }
    }
}

/// Parse a `Plist` document from the XML dialect.
pub fn from_xml(xml: &str) -> crate::Result<Plist> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                return parse_node(&mut reader, &name);
            }
            Ok(Event::Eof) => {
                return Err(crate::Error::malformed_plist("empty document", None));
            }
            Ok(_) => {}
            Err(e) => return Err(crate::Error::malformed_plist(e.to_string(), None)),
        }
        buf.clear();
    }
}

fn parse_node(reader: &mut Reader<&[u8]>, tag: &str) -> crate::Result<Plist> {
    match tag {
        "dict" => {
            let mut map = BTreeMap::new();
            let mut buf = Vec::new();
            loop {
                match reader.read_event_into(&mut buf) {
                    Ok(Event::Start(e)) if e.name().as_ref() == b"key" => {
                        let key = read_text(reader)?;
                        let value_tag = next_start_tag(reader)?;
                        let value = parse_node(reader, &value_tag)?;
                        map.insert(key, value);
                    }
                    Ok(Event::End(e)) if e.name().as_ref() == b"dict" => break,
                    Ok(Event::Eof) => {
                        return Err(crate::Error::malformed_plist("unterminated dict", None));
                    }
                    Ok(_) => {}
                    Err(e) => return Err(crate::Error::malformed_plist(e.to_string(), None)),
                }
                buf.clear();
            }
            Ok(Plist::Dict(map))
        }
        "array" => {
            let mut items = Vec::new();
            loop {
                match next_start_tag_or_end(reader, "array")? {
                    Some(child_tag) => items.push(parse_node(reader, &child_tag)?),
                    None => break,
                }
            }
            Ok(Plist::Array(items))
        }
        "string" => Ok(Plist::String(read_text(reader)?)),
        "integer" => {
            let text = read_text(reader)?;
            text.parse::<i64>()
                .map(Plist::Integer)
                .map_err(|_| crate::Error::malformed_plist(format!("invalid integer '{text}'"), None))
        }
        other => Err(crate::Error::malformed_plist(format!("unknown node '{other}'"), None)),
    }
}

fn read_text(reader: &mut Reader<&[u8]>) -> crate::Result<String> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| crate::Error::malformed_plist(e.to_string(), None))?
                    .into_owned();
                // Consume the matching end tag.
                reader
                    .read_event_into(&mut Vec::new())
                    .map_err(|e| crate::Error::malformed_plist(e.to_string(), None))?;
                return Ok(text);
            }
            Ok(Event::End(_)) => return Ok(String::new()),
            Ok(Event::Eof) => return Err(crate::Error::malformed_plist("unexpected eof in text node", None)),
            Ok(_) => {}
            Err(e) => return Err(crate::Error::malformed_plist(e.to_string(), None)),
        }
        buf.clear();
    }
}

fn next_start_tag(reader: &mut Reader<&[u8]>) -> crate::Result<String> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
            Ok(Event::Eof) => return Err(crate::Error::malformed_plist("expected start tag, found eof", None)),
            Ok(_) => {}
            Err(e) => return Err(crate::Error::malformed_plist(e.to_string(), None)),
        }
        buf.clear();
    }
}

fn next_start_tag_or_end(reader: &mut Reader<&[u8]>, end_tag: &str) -> crate::Result<Option<String>> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => return Ok(Some(String::from_utf8_lossy(e.name().as_ref()).into_owned())),
            Ok(Event::End(e)) if e.name().as_ref() == end_tag.as_bytes() => return Ok(None),
            Ok(Event::Eof) => return Err(crate::Error::malformed_plist("unterminated array", None)),
            Ok(_) => {}
            Err(e) => return Err(crate::Error::malformed_plist(e.to_string(), None)),
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Plist {
        let mut dict = BTreeMap::new();
        dict.insert("pkgname".to_string(), Plist::String("foo".to_string()));
        dict.insert("installed_size".to_string(), Plist::Integer(4096));
        dict.insert(
            "conf_files".to_string(),
            Plist::Array(vec![Plist::String("/etc/foo.conf".to_string())]),
        );
        Plist::Dict(dict)
    }

    #[test]
    fn round_trips() {
        let doc = sample();
        let xml = doc.to_xml();
        let parsed = Plist::from_xml(&xml).unwrap();
        assert_eq!(doc, parsed);
    }

    #[test]
    fn accessors_work() {
        let doc = sample();
        assert_eq!(doc.get("pkgname").unwrap().as_str(), Some("foo"));
        assert_eq!(doc.get("installed_size").unwrap().as_integer(), Some(4096));
        assert!(doc.get("nonexistent").is_err());
    }

    #[test]
    fn empty_dict_round_trips() {
        let doc = Plist::Dict(BTreeMap::new());
        let xml = doc.to_xml();
        assert_eq!(Plist::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn empty_array_round_trips() {
        let mut dict = BTreeMap::new();
        dict.insert("items".to_string(), Plist::Array(vec![]));
        let doc = Plist::Dict(dict);
        let xml = doc.to_xml();
        assert_eq!(Plist::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(Plist::from_xml("<dict><key>pkgname</key><string>foo</dict>").is_err());
    }
}
