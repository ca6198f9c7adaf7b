//! Conversion of flat field exports (one record per field carrying its own
//! category and subcategory) into the two-level catalog.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::domain::{FieldKind, FieldTemplate, FieldValue, Frequency, Name, Taxonomy};
use crate::errors::CatalogError;

#[derive(Debug, Deserialize)]
struct FlatField {
    #[serde(rename = "RowId", default)]
    row_id: Option<u32>,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Category", default)]
    category: String,
    #[serde(rename = "SubCategory", default)]
    sub_category: String,
    #[serde(rename = "Value", default)]
    value: JsonValue,
    #[serde(rename = "Value2", default)]
    selected_frequency: Option<String>,
    #[serde(rename = "Lov", default)]
    lov: Option<String>,
    #[serde(rename = "Size", default)]
    size: Option<usize>,
    #[serde(rename = "nDecimal", default)]
    decimals: Option<u8>,
    #[serde(rename = "IEFType", default)]
    ief_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlatDocument {
    List(Vec<FlatField>),
    Fields { fields: Vec<FlatField> },
    Data { data: Vec<FlatField> },
}

impl FlatDocument {
    fn into_fields(self) -> Vec<FlatField> {
        match self {
            FlatDocument::List(fields)
            | FlatDocument::Fields { fields }
            | FlatDocument::Data { data: fields } => fields,
        }
    }
}

/// Groups fields by category then subcategory, both in first-appearance order.
#[derive(Default)]
struct Grouping {
    categories: Vec<(Name, Vec<(Option<Name>, Vec<FieldTemplate>)>)>,
}

impl Grouping {
    fn push(&mut self, category: Name, sub: Option<Name>, template: FieldTemplate) {
        let index = match self.categories.iter().position(|(name, _)| *name == category) {
            Some(index) => index,
            None => {
                self.categories.push((category, Vec::new()));
                self.categories.len() - 1
            }
        };
        let subs = &mut self.categories[index].1;
        match subs.iter_mut().find(|(name, _)| *name == sub) {
            Some((_, templates)) => templates.push(template),
            None => subs.push((sub, vec![template])),
        }
    }

    fn into_catalog(self) -> Result<Catalog, CatalogError> {
        let mut entries = Vec::with_capacity(self.categories.len());
        let mut templates = HashMap::new();
        for (category, subs) in self.categories {
            let leaf = subs.iter().all(|(sub, _)| sub.is_none());
            let mut names = Vec::new();
            for (sub, fields) in subs {
                let key = if leaf {
                    category.clone()
                } else {
                    // Loose fields of a category with named subcategories get a
                    // step named after the category itself.
                    let key = sub.unwrap_or_else(|| category.clone());
                    names.push(key.to_string());
                    key
                };
                templates.insert(key, fields);
            }
            entries.push((category.to_string(), names));
        }
        let taxonomy = Taxonomy::new(entries)?;
        Ok(Catalog::new(taxonomy, templates))
    }
}

/// Parses a flat field list (bare array, `{"fields": [...]}` or
/// `{"data": [...]}`) into a catalog whose templates carry the exported values
/// as defaults.
pub fn parse_flat(raw: &str) -> Result<Catalog, CatalogError> {
    let document: FlatDocument = serde_json::from_str(raw)
        .map_err(|err| CatalogError::Malformed(format!("not a flat field list: {err}")))?;

    let mut grouping = Grouping::default();
    let mut dropped = 0usize;
    for field in document.into_fields() {
        let category = Name::new(&field.category);
        if category.is_empty() {
            dropped += 1;
            continue;
        }
        let sub = Some(Name::new(&field.sub_category)).filter(|name| !name.is_empty());
        match convert(field)? {
            Some(template) => grouping.push(category, sub, template),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "skipped flat fields without a category or input kind");
    }
    grouping.into_catalog()
}

fn convert(field: FlatField) -> Result<Option<FieldTemplate>, CatalogError> {
    let kind = match field.ief_type.trim().to_ascii_uppercase().as_str() {
        "N" => FieldKind::Numeric {
            decimals: Some(field.decimals.unwrap_or(0)),
        },
        "C" => FieldKind::Text {
            max_len: field.size.filter(|size| *size > 0),
            options: field
                .lov
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|option| !option.is_empty())
                .map(str::to_string)
                .collect(),
        },
        "D" => FieldKind::Date,
        "H" => FieldKind::Header,
        "SH" => return Ok(None),
        other => {
            return Err(CatalogError::Malformed(format!(
                "unknown IEFType `{other}` on `{}`",
                field.name
            )))
        }
    };

    let mut template = FieldTemplate::new(field.name.trim(), kind);
    template.id = field.row_id;
    template.default_value = FieldValue::from_json(&template.kind, &field.value);
    if template.kind.accepts_frequency() {
        let raw = field.selected_frequency.as_deref().unwrap_or_default();
        template.default_frequency = match Frequency::parse_optional(raw) {
            Ok(frequency) => frequency,
            Err(err) => {
                warn!(field = %template.label, error = %err, "ignoring frequency");
                None
            }
        };
    }
    Ok(Some(template))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "fields": [
            {"RowId": 1, "Name": "Personal", "Category": "General", "SubCategory": "Profile", "IEFType": "H"},
            {"RowId": 2, "Name": "Employer", "Category": "General", "SubCategory": "Profile", "IEFType": "C", "Size": 20, "Value": "Acme"},
            {"RowId": 3, "Name": "Marital", "Category": "General", "SubCategory": "Profile", "IEFType": "C", "Lov": "Single, Married,", "Value": ""},
            {"RowId": 4, "Name": "Hidden", "Category": "General", "SubCategory": "Profile", "IEFType": "SH"},
            {"RowId": 5, "Name": "Start", "Category": "General", "SubCategory": "Dates", "IEFType": "D", "Value": "2024-01-15"},
            {"RowId": 6, "Name": "Gross", "Category": "Salary ", "SubCategory": "", "IEFType": "N", "nDecimal": 2, "Value": 1200, "Value2": "Monthly"}
        ]
    }"#;

    #[test]
    fn groups_fields_in_first_appearance_order() {
        let catalog = parse_flat(EXPORT).unwrap();
        let keys: Vec<_> = catalog
            .taxonomy()
            .storage_keys()
            .iter()
            .map(|key| key.to_string())
            .collect();
        assert_eq!(keys, vec!["Profile", "Dates", "Salary"]);

        let profile = catalog.templates(&Name::new("Profile"));
        assert_eq!(profile.len(), 3);
        assert_eq!(profile[0].kind, FieldKind::Header);
        assert_eq!(
            profile[2].kind,
            FieldKind::Text {
                max_len: None,
                options: vec!["Single".into(), "Married".into()],
            }
        );
    }

    #[test]
    fn numeric_fields_keep_value_and_frequency() {
        let catalog = parse_flat(EXPORT).unwrap();
        let salary = &catalog.templates(&Name::new("Salary"))[0];
        assert_eq!(salary.id, Some(6));
        assert_eq!(salary.default_value, FieldValue::Numeric(1200.0));
        assert_eq!(salary.default_frequency, Some(Frequency::Monthly));
        assert_eq!(salary.kind.decimals(), Some(2));
    }

    #[test]
    fn bare_and_data_wrapped_lists_are_accepted() {
        let bare = r#"[{"Name": "A", "Category": "X", "IEFType": "N"}]"#;
        let wrapped = r#"{"data": [{"Name": "A", "Category": "X", "IEFType": "N"}]}"#;
        assert_eq!(parse_flat(bare).unwrap().field_count(), 1);
        assert_eq!(parse_flat(wrapped).unwrap().field_count(), 1);
        assert!(parse_flat(r#"{"rows": []}"#).is_err());
    }
}
