//! Serialization of transfer filters into the monitor API's wire format.
//!
//! The monitor API accepts listing and bulk-edit filters as a single
//! `filter` query parameter holding a flattened rendering of a JSON object.
//! This module owns that rendering so that the endpoint methods can treat
//! filters as plain data.

use serde_json::Map;
use serde_json::Value;

use crate::error::Error;

/// A filter restricting which of a customer's transfers an operation
/// applies to.
///
/// The filter is a JSON object whose fields are defined by the monitor
/// API. This crate does not interpret those fields, it only encodes the
/// object into the wire format:
///
/// * Keys of nested objects are joined with `.` into a path, and every
///   non-null leaf is rendered as `path:value`.
/// * The rendered pairs are joined with `;` in the map's iteration order.
/// * Arrays of scalars are rendered as comma-separated values.
/// * Leaves that are `null` are omitted.
///
/// Objects and arrays nested inside arrays have no wire representation
/// and are rejected with [`Error::InvalidFilter`].
///
/// ```
/// use monitor_client::filter::TransferFilter;
/// use serde_json::json;
///
/// let filter = TransferFilter::try_from(json!({
///     "amount": {"from": 1, "to": 5},
///     "archived": true,
/// }))?;
/// assert_eq!(filter.encode()?, "amount.from:1;amount.to:5;archived:true");
/// # Ok::<(), monitor_client::error::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferFilter(Map<String, Value>);

impl TransferFilter {
    /// Render the filter into the value of the `filter` query parameter.
    pub fn encode(&self) -> Result<String, Error> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            flatten_into(key.clone(), value, &mut pairs)?;
        }
        Ok(pairs.join(";"))
    }
}

impl From<Map<String, Value>> for TransferFilter {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for TransferFilter {
    type Error = Error;

    /// Convert a JSON value into a filter. Values other than objects are
    /// rejected, since the monitor API defines filters as objects.
    fn try_from(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            _ => Err(Error::InvalidFilter(
                "the filter must be a JSON object".to_string(),
            )),
        }
    }
}

/// Walk one filter value depth first, pushing a `path:value` pair for
/// every non-null leaf.
fn flatten_into(path: String, value: &Value, pairs: &mut Vec<String>) -> Result<(), Error> {
    match value {
        Value::Null => Ok(()),
        Value::Object(fields) => {
            for (key, value) in fields {
                flatten_into(format!("{path}.{key}"), value, pairs)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            let rendered = items
                .iter()
                .map(|item| render_scalar(&path, item))
                .collect::<Result<Vec<_>, _>>()?;
            pairs.push(format!("{path}:{}", rendered.join(",")));
            Ok(())
        }
        scalar => {
            pairs.push(format!("{path}:{}", render_scalar(&path, scalar)?));
            Ok(())
        }
    }
}

/// Render a single leaf value, rejecting containers that have no wire
/// representation at the leaf position.
fn render_scalar(path: &str, value: &Value) -> Result<String, Error> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(Error::InvalidFilter(format!(
            "the value at \"{path}\" must be a string, number or boolean"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test]
    fn nested_objects_flatten_to_dotted_paths() {
        let filter = TransferFilter::try_from(json!({
            "amount": {"from": 1, "to": 5},
            "archived": true,
        }))
        .unwrap();

        assert_eq!(
            filter.encode().unwrap(),
            "amount.from:1;amount.to:5;archived:true"
        );
    }

    #[test]
    fn scalar_arrays_render_comma_separated() {
        let filter = TransferFilter::try_from(json!({
            "direction": ["deposit", "withdrawal"],
            "riskscore": {"from": 0.5},
        }))
        .unwrap();

        assert_eq!(
            filter.encode().unwrap(),
            "direction:deposit,withdrawal;riskscore.from:0.5"
        );
    }

    #[test]
    fn null_leaves_are_omitted() {
        let filter = TransferFilter::try_from(json!({
            "archived": false,
            "reason": null,
        }))
        .unwrap();

        assert_eq!(filter.encode().unwrap(), "archived:false");
    }

    #[test]
    fn deep_nesting_joins_every_level() {
        let filter = TransferFilter::try_from(json!({
            "signals": {"atm": {"from": 0.2, "to": 0.8}},
        }))
        .unwrap();

        assert_eq!(
            filter.encode().unwrap(),
            "signals.atm.from:0.2;signals.atm.to:0.8"
        );
    }

    #[test]
    fn empty_filters_encode_to_an_empty_string() {
        assert_eq!(TransferFilter::default().encode().unwrap(), "");
    }

    #[test]
    fn arrays_inside_arrays_are_rejected() {
        let filter = TransferFilter::try_from(json!({
            "amount": [[1, 2], [3]],
        }))
        .unwrap();

        let error = filter.encode().unwrap_err();
        assert!(matches!(error, Error::InvalidFilter(msg) if msg.contains("amount")));
    }

    #[test]
    fn objects_inside_arrays_are_rejected() {
        let filter = TransferFilter::try_from(json!({
            "customer": [{"name": "C#1456"}],
        }))
        .unwrap();

        assert!(matches!(filter.encode(), Err(Error::InvalidFilter(_))));
    }

    #[test_case(json!(["archived"]); "array")]
    #[test_case(json!("archived:true"); "string")]
    #[test_case(json!(10); "number")]
    fn non_object_filters_are_rejected(value: Value) {
        assert!(matches!(
            TransferFilter::try_from(value),
            Err(Error::InvalidFilter(_))
        ));
    }
}
