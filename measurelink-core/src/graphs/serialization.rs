use crate::types::*;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bare-bones view of a record: value, unit and name → descriptor lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedRecord {
    /// Parsed value when the extractor supplied one, else the raw text. An
    /// interval with both bounds gives `[least, most]`.
    pub value: serde_json::Value,
    pub unit: String,
    pub quantified: BTreeMap<String, Vec<String>>,
    pub related: BTreeMap<String, Vec<String>>,
}

impl From<&MeasurementRecord> for SimplifiedRecord {
    fn from(record: &MeasurementRecord) -> Self {
        let quantity = &record.quantity;
        let mut bounds: Vec<serde_json::Value> = [&quantity.least, &quantity.most]
            .into_iter()
            .flatten()
            .map(|b| value_of(b.parsed_value, &b.raw_value))
            .collect();
        let value = match bounds.len() {
            0 => value_of(quantity.parsed_value, &quantity.raw_value),
            1 => bounds.remove(0),
            _ => serde_json::Value::Array(bounds),
        };

        let mut unit = quantity
            .unit
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_default();

        let mut quantified = BTreeMap::new();
        if let Some(q) = &record.quantified {
            if unit.is_empty() {
                unit = q.name.clone();
            }
            quantified.insert(q.name.clone(), descriptor_names(&q.descriptors));
        }

        let mut related: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entity in &record.related {
            related
                .entry(entity.raw_name.clone())
                .or_default()
                .extend(descriptor_names(&entity.descriptors));
        }

        Self {
            value,
            unit,
            quantified,
            related,
        }
    }
}

fn value_of(parsed: Option<f64>, raw: &str) -> serde_json::Value {
    parsed
        .and_then(|v| serde_json::Number::from_f64(v).map(serde_json::Value::Number))
        .unwrap_or_else(|| serde_json::Value::String(raw.to_string()))
}

fn descriptor_names(descriptors: &[Descriptor]) -> Vec<String> {
    let mut sorted: Vec<&Descriptor> = descriptors.iter().collect();
    sorted.sort_by_key(|d| d.token_index);
    sorted.into_iter().map(|d| d.raw_name.clone()).collect()
}

impl MeasurementRecord {
    pub fn simplify(&self) -> SimplifiedRecord {
        SimplifiedRecord::from(self)
    }
}

impl SentenceExtraction {
    pub fn simplified(&self) -> Vec<SimplifiedRecord> {
        self.records.iter().map(SimplifiedRecord::from).collect()
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
