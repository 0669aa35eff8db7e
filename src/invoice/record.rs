use crate::providers::utils::strip_code_fence;
use serde::ser::{Serialize, Serializer};
use serde_json::Value;

/// Fields the extraction prompt asks for, in display order.
pub const INVOICE_FIELDS: [&str; 10] = [
    "Invoice no.",
    "Description",
    "Quantity",
    "Date",
    "Unit price",
    "Amount",
    "Total",
    "Email",
    "Phone number",
    "Address",
];

/// Flat field → value view of a model's invoice answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvoiceRecord {
    pub fields: Vec<(String, String)>,
}

impl Serialize for InvoiceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter().map(|(k, v)| (k, v)))
    }
}

impl InvoiceRecord {
    /// Best-effort parse of JSON-ish model output. Accepts code fences,
    /// surrounding prose and single-quoted keys/values. Returns `None` when
    /// no object can be recovered.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let body = strip_code_fence(raw);
        let start = body.find('{')?;
        let end = body.rfind('}')?;
        if end <= start {
            return None;
        }
        let object = &body[start..=end];

        let value: Value = serde_json::from_str(object)
            .or_else(|_| serde_json::from_str(&object.replace('\'', "\"")))
            .ok()?;
        let map = value.as_object()?;

        let mut fields: Vec<(String, String)> = Vec::with_capacity(map.len());
        for wanted in INVOICE_FIELDS {
            if let Some((key, value)) = map
                .iter()
                .find(|(k, _)| k.trim().eq_ignore_ascii_case(wanted))
            {
                fields.push((key.trim().to_string(), scalar_to_string(value)));
            }
        }
        for (key, value) in map {
            let key = key.trim();
            if !fields.iter().any(|(k, _)| k == key) {
                fields.push((key.to_string(), scalar_to_string(value)));
            }
        }

        Some(Self { fields })
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
