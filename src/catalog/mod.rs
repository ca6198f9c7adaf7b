//! Loaded-once catalog: the category taxonomy plus the field templates that
//! seed every subcategory.

pub mod flat;
pub mod loader;

use std::{collections::HashMap, fmt, marker::PhantomData};

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::domain::{FieldKind, FieldTemplate, FieldValue, Frequency, Name, Taxonomy};
use crate::errors::CatalogError;

pub use loader::{CatalogLoader, CatalogSource, LoadState};

const BUILTIN_MENU: &str = include_str!("../../data/menu.json");
const BUILTIN_FIELDS: &str = include_str!("../../data/fields.json");

/// Decimal places assumed for numeric templates that do not declare any.
pub const DEFAULT_DECIMALS: u8 = 2;

/// Immutable taxonomy and templates shared by every component of a run.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    taxonomy: Taxonomy,
    templates: HashMap<Name, Vec<FieldTemplate>>,
}

impl Catalog {
    pub fn new(taxonomy: Taxonomy, templates: HashMap<Name, Vec<FieldTemplate>>) -> Self {
        Self {
            taxonomy,
            templates,
        }
    }

    /// The demo catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_MENU, BUILTIN_FIELDS)
    }

    /// Parses the taxonomy document and the templates document.
    pub fn from_json(menu: &str, fields: &str) -> Result<Self, CatalogError> {
        let menu: Ordered<Vec<String>> = serde_json::from_str(menu)?;
        let taxonomy = Taxonomy::new(menu.0)?;

        let fields: Ordered<Vec<RawTemplate>> = serde_json::from_str(fields)?;
        let known = taxonomy.storage_keys();
        let mut templates = HashMap::new();
        for (raw_key, raw_templates) in fields.0 {
            let key = Name::new(&raw_key);
            if !known.contains(&key) {
                warn!(key = %key, "templates reference a key missing from the taxonomy");
                continue;
            }
            let converted = raw_templates
                .into_iter()
                .map(RawTemplate::into_template)
                .collect::<Result<Vec<_>, _>>()?;
            templates.insert(key, converted);
        }

        Ok(Self::new(taxonomy, templates))
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Templates for a storage key; an unknown key has none.
    pub fn templates(&self, key: &Name) -> &[FieldTemplate] {
        self.templates.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_count(&self) -> usize {
        self.templates.values().map(Vec::len).sum()
    }

    /// Serializes the taxonomy back into its document form, order preserved.
    pub fn menu_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&MenuDocument(&self.taxonomy))?)
    }

    /// Serializes the templates back into their document form.
    pub fn fields_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&FieldsDocument(self))?)
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} categories, {} steps, {} fields",
            self.taxonomy.categories().len(),
            self.taxonomy.storage_keys().len(),
            self.field_count()
        )
    }
}

/// JSON object read as an ordered list of entries.
struct Ordered<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Ordered<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = Ordered<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(Ordered(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFrequency {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    #[serde(default)]
    id: Option<u32>,
    label: String,
    #[serde(default)]
    value: JsonValue,
    #[serde(default)]
    frequency: Option<RawFrequency>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    decimals: Option<u8>,
    #[serde(default)]
    max_len: Option<usize>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    frequencies: Option<Vec<String>>,
}

impl RawTemplate {
    fn into_template(self) -> Result<FieldTemplate, CatalogError> {
        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") | Some("numeric") => FieldKind::Numeric {
                decimals: Some(self.decimals.unwrap_or(DEFAULT_DECIMALS)),
            },
            Some("text") => FieldKind::Text {
                max_len: self.max_len,
                options: self.options,
            },
            Some("date") => FieldKind::Date,
            Some("header") => FieldKind::Header,
            Some(other) => {
                return Err(CatalogError::Malformed(format!(
                    "unknown field kind `{other}` for `{}`",
                    self.label
                )))
            }
        };

        let parse = |raw: &str| {
            Frequency::parse_optional(raw)
                .map_err(|err| CatalogError::Malformed(format!("{err} for `{}`", self.label)))
        };
        let (default_frequency, mut frequencies) = match &self.frequency {
            None => (None, Vec::new()),
            Some(RawFrequency::One(raw)) => (parse(raw)?, Vec::new()),
            Some(RawFrequency::Many(list)) => {
                let mut options = Vec::new();
                for raw in list {
                    if let Some(frequency) = parse(raw)? {
                        options.push(frequency);
                    }
                }
                (None, options)
            }
        };
        if let Some(list) = &self.frequencies {
            frequencies.clear();
            for raw in list {
                if let Some(frequency) = parse(raw)? {
                    frequencies.push(frequency);
                }
            }
        }
        if frequencies.is_empty() {
            frequencies = Frequency::ALL.to_vec();
        }

        let mut template = FieldTemplate::new(self.label.trim(), kind);
        template.id = self.id;
        template.default_value = FieldValue::from_json(&template.kind, &self.value);
        template.default_frequency = default_frequency.filter(|_| template.kind.accepts_frequency());
        template.frequencies = frequencies;
        Ok(template)
    }
}

struct MenuDocument<'a>(&'a Taxonomy);

impl Serialize for MenuDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let categories = self.0.categories();
        let mut map = serializer.serialize_map(Some(categories.len()))?;
        for category in categories {
            map.serialize_entry(&category.name, &category.subcategories)?;
        }
        map.end()
    }
}

struct FieldsDocument<'a>(&'a Catalog);

impl Serialize for FieldsDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let keys = self.0.taxonomy.storage_keys();
        let mut map = serializer.serialize_map(None)?;
        for key in keys {
            let templates: Vec<TemplateDocument<'_>> = self
                .0
                .templates(&key)
                .iter()
                .map(TemplateDocument)
                .collect();
            if !templates.is_empty() {
                map.serialize_entry(&key, &templates)?;
            }
        }
        map.end()
    }
}

struct TemplateDocument<'a>(&'a FieldTemplate);

impl Serialize for TemplateDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let template = self.0;
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = template.id {
            map.serialize_entry("id", &id)?;
        }
        map.serialize_entry("label", &template.label)?;
        map.serialize_entry("value", &template.default_value.to_wire(&template.kind))?;
        map.serialize_entry(
            "frequency",
            template
                .default_frequency
                .map(Frequency::label)
                .unwrap_or_default(),
        )?;
        map.serialize_entry("kind", template.kind.label())?;
        match &template.kind {
            FieldKind::Numeric { decimals } => {
                if let Some(places) = decimals {
                    map.serialize_entry("decimals", places)?;
                }
            }
            FieldKind::Text { max_len, options } => {
                if let Some(limit) = max_len {
                    map.serialize_entry("max_len", limit)?;
                }
                if !options.is_empty() {
                    map.serialize_entry("options", options)?;
                }
            }
            FieldKind::Date | FieldKind::Header => {}
        }
        if template.frequencies.len() != Frequency::ALL.len() {
            let labels: Vec<&str> = template.frequencies.iter().map(|f| f.label()).collect();
            map.serialize_entry("frequencies", &labels)?;
        }
        map.end()
    }
}
