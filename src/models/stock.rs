use serde_json::Value;

/// Per-fetch view of the stock payload, reduced to the one field the
/// detector cares about. Everything else in the body is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockSnapshot {
    pub reported_at: Option<i64>,
}

impl StockSnapshot {
    /// Extract the timestamp from a parsed JSON body.
    ///
    /// Looks up `field` first, then its snake_case form, so payloads using
    /// either `reportedAt` or `reported_at` (or whichever field is
    /// configured) are handled. Accepts JSON numbers and numeric strings.
    pub fn from_value(value: &Value, field: &str) -> Self {
        let reported_at = value
            .get(field)
            .or_else(|| value.get(snake_case(field)))
            .and_then(parse_timestamp);

        Self { reported_at }
    }
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 2);
    for ch in field.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_camel_case_field() {
        let snapshot = StockSnapshot::from_value(&json!({ "reportedAt": 100 }), "reportedAt");
        assert_eq!(snapshot.reported_at, Some(100));
    }

    #[test]
    fn extracts_snake_case_alias() {
        let snapshot = StockSnapshot::from_value(&json!({ "reported_at": 200 }), "reportedAt");
        assert_eq!(snapshot.reported_at, Some(200));
    }

    #[test]
    fn primary_field_wins_over_alias() {
        let body = json!({ "reportedAt": 1, "reported_at": 2 });
        let snapshot = StockSnapshot::from_value(&body, "reportedAt");
        assert_eq!(snapshot.reported_at, Some(1));
    }

    #[test]
    fn accepts_numeric_strings() {
        let snapshot = StockSnapshot::from_value(&json!({ "reportedAt": "300" }), "reportedAt");
        assert_eq!(snapshot.reported_at, Some(300));
    }

    #[test]
    fn ignores_unrelated_fields() {
        let body = json!({ "updatedAt": 400, "items": [] });
        let snapshot = StockSnapshot::from_value(&body, "reportedAt");
        assert_eq!(snapshot.reported_at, None);
    }

    #[test]
    fn configured_field_overrides_default() {
        let body = json!({ "updatedAt": 400, "reportedAt": 100 });
        let snapshot = StockSnapshot::from_value(&body, "updatedAt");
        assert_eq!(snapshot.reported_at, Some(400));
    }

    #[test]
    fn non_numeric_values_are_dropped() {
        let snapshot =
            StockSnapshot::from_value(&json!({ "reportedAt": "not-a-number" }), "reportedAt");
        assert_eq!(snapshot.reported_at, None);

        let snapshot = StockSnapshot::from_value(&json!({ "reportedAt": null }), "reportedAt");
        assert_eq!(snapshot.reported_at, None);
    }
}
