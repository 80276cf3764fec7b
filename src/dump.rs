//! Debug Dump - Human-Legible Form of Structured Values
//!
//! Shows type and structure, one entry per line:
//!
//! ```text
//! array(2) {
//!   ["id"]=>
//!   int(7)
//!   ["tags"]=>
//!   array(1) {
//!     [0]=>
//!     string(3) "new"
//!   }
//! }
//! ```

use serde_json::Value;

/// Dump `value`, always ending in a newline.
pub fn dump(value: &Value) -> String {
    let mut out = String::new();
    dump_into(&mut out, value, 0);
    out
}

fn dump_into(out: &mut String, value: &Value, depth: usize) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Null => out.push_str("NULL\n"),
        Value::Bool(b) => out.push_str(&format!("bool({})\n", b)),
        Value::Number(n) if n.is_f64() => {
            // `2.0` dumps as `float(2)`
            let f = n.as_f64().unwrap_or_default();
            out.push_str(&format!("float({})\n", f));
        }
        Value::Number(n) => out.push_str(&format!("int({})\n", n)),
        Value::String(s) => out.push_str(&format!("string({}) \"{}\"\n", s.len(), s)),
        Value::Array(items) => {
            out.push_str(&format!("array({}) {{\n", items.len()));
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("{}  [{}]=>\n{}  ", pad, i, pad));
                dump_into(out, item, depth + 1);
            }
            out.push_str(&format!("{}}}\n", pad));
        }
        Value::Object(map) => {
            out.push_str(&format!("array({}) {{\n", map.len()));
            for (key, item) in map {
                out.push_str(&format!("{}  [\"{}\"]=>\n{}  ", pad, key, pad));
                dump_into(out, item, depth + 1);
            }
            out.push_str(&format!("{}}}\n", pad));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(dump(&Value::Null), "NULL\n");
        assert_eq!(dump(&json!(false)), "bool(false)\n");
        assert_eq!(dump(&json!(-3)), "int(-3)\n");
        assert_eq!(dump(&json!(1.5)), "float(1.5)\n");
        assert_eq!(dump(&json!(2.0)), "float(2)\n");
        assert_eq!(dump(&json!(-0.25)), "float(-0.25)\n");
        assert_eq!(dump(&json!("héllo")), "string(6) \"héllo\"\n");
    }

    #[test]
    fn test_nested_structure() {
        let value = json!({"id": 7, "tags": ["new"]});
        let expected = concat!(
            "array(2) {\n",
            "  [\"id\"]=>\n",
            "  int(7)\n",
            "  [\"tags\"]=>\n",
            "  array(1) {\n",
            "    [0]=>\n",
            "    string(3) \"new\"\n",
            "  }\n",
            "}\n",
        );
        assert_eq!(dump(&value), expected);
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(dump(&json!([])), "array(0) {\n}\n");
    }
}
