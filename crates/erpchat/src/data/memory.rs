use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{DataSource, Filter, FilterOp, ListQuery};

/// Fixture records held in memory, filtered with the same operators the host supports
#[derive(Debug, Default, Clone)]
pub struct InMemoryData {
    records: HashMap<String, Vec<Value>>,
}

impl InMemoryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, doctype: &str, records: Vec<Value>) -> Self {
        self.records
            .entry(doctype.to_string())
            .or_default()
            .extend(records);
        self
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn matches(record: &Value, filter: &Filter) -> bool {
    let field = record.get(&filter.field).unwrap_or(&Value::Null);
    let ordering = compare(field, &filter.value);
    match filter.op {
        FilterOp::Eq => ordering == Some(Ordering::Equal),
        FilterOp::Ne => ordering != Some(Ordering::Equal),
        FilterOp::Gt => ordering == Some(Ordering::Greater),
        FilterOp::Lt => ordering == Some(Ordering::Less),
        FilterOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Between => match filter.value.as_array().map(Vec::as_slice) {
            Some([from, to]) => {
                matches!(compare(field, from), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(field, to), Some(Ordering::Less | Ordering::Equal))
            }
            _ => false,
        },
    }
}

fn project(record: &Value, fields: &[String]) -> Value {
    if fields.is_empty() {
        return record.clone();
    }
    let mut projected = Map::new();
    for field in fields {
        if let Some(value) = record.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    Value::Object(projected)
}

#[async_trait]
impl DataSource for InMemoryData {
    async fn get_list(&self, doctype: &str, query: &ListQuery) -> Result<Vec<Value>> {
        let Some(records) = self.records.get(doctype) else {
            return Ok(Vec::new());
        };

        Ok(records
            .iter()
            .filter(|record| query.filters.iter().all(|f| matches(record, f)))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|record| project(record, &query.fields))
            .collect())
    }

    async fn get_doc(&self, doctype: &str, name: &str) -> Result<Option<Value>> {
        Ok(self.records.get(doctype).and_then(|records| {
            records
                .iter()
                .find(|record| record.get("name").and_then(|n| n.as_str()) == Some(name))
                .cloned()
        }))
    }
}
