use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a record or collection; text format renders one `key: value` line per field
pub fn output_data<T: Serialize>(output_format: &OutputFormat, data: &T) -> anyhow::Result<()> {
    let value = serde_json::to_value(data)?;
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Text => {
            for line in text_lines(&value) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn text_lines(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, v)| match v {
                Value::String(s) => format!("{}: {}", key, s),
                Value::Null => format!("{}: -", key),
                other => format!("{}: {}", key, other),
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .flat_map(|(i, item)| {
                let mut lines = vec![format!("[{}]", i + 1)];
                lines.extend(text_lines(item).into_iter().map(|l| format!("  {}", l)));
                lines
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_lines_flatten_records() {
        let lines = text_lines(&json!([{ "name": "Ann", "phone": null }]));
        assert_eq!(lines, vec!["[1]", "  name: Ann", "  phone: -"]);
    }
}
