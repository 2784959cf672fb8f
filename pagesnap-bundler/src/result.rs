use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Insertion-ordered string map.
///
/// Reinserting an existing name overwrites its value but keeps the name at
/// its original position, so serialization order always follows first
/// discovery. Used for the custom-property table and for element attribute
/// maps, both of which must round-trip in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedMap {
    entries: Vec<(String, String)>,
}

impl OrderedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl Serialize for OrderedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OrderedMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor;

        impl<'de> Visitor<'de> for OrderedMapVisitor {
            type Value = OrderedMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map with string keys and string values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<OrderedMap, A::Error> {
                let mut table = OrderedMap::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    table.insert(name, value);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor)
    }
}

/// An externally linked stylesheet with its fully rewritten content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesheetRecord {
    pub url: String,
    pub content: String,
}

/// An external script, fetched verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stylesheet,
    Script,
    Image,
    Font,
}

/// A reference to an asset discovered in the document, resolved to an
/// absolute URL but not downloaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetReference {
    pub url: String,
    pub kind: AssetKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub html_attributes: OrderedMap,
    pub body_attributes: OrderedMap,
    pub fetched_at: String,
}

/// The complete snapshot of one page: markup, external and inline assets,
/// the custom-property table, and document metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub html: String,
    pub stylesheets: Vec<StylesheetRecord>,
    pub scripts: Vec<ScriptRecord>,
    pub inline_styles: Vec<String>,
    pub inline_scripts: Vec<String>,
    pub assets: Vec<AssetReference>,
    pub variables: OrderedMap,
    pub metadata: PageMetadata,
}
