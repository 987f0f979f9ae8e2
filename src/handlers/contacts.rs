use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{extract, to_indented_json};
use crate::handler::{Handler, HandlerContext};
use crate::outcome::{Completed, TaskError};
use crate::registry::TaskText;

const DEFAULT_INPUT: &str = "contacts.json";

/// Sorts a JSON array of contact records by a two-field key.
#[derive(Debug, Default)]
pub struct ContactSorter;

#[async_trait]
impl Handler for ContactSorter {
    async fn handle(&self, task: &TaskText, ctx: &HandlerContext) -> Result<Completed, TaskError> {
        let input = extract::file_with_extension(task.normalized(), "json")
            .unwrap_or_else(|| DEFAULT_INPUT.to_string());
        let keys = sort_keys(task.folded());

        let (_, text) = ctx.read_to_string(&input).await?;
        let records: Value = serde_json::from_str(&text)
            .map_err(|e| TaskError::Upstream(format!("{input} is not valid JSON: {e}")))?;
        let sorted = sort_records(records, keys)
            .map_err(|msg| TaskError::Upstream(format!("{input}: {msg}")))?;

        let count = sorted.as_array().map_or(0, Vec::len);
        let output = extract::derived_name(&input, "-sorted.json");
        let artifact = ctx.write_artifact(&output, &to_indented_json(&sorted)?).await?;
        info!(records = count, primary = keys[0], artifact = %artifact, "contacts sorted");
        Ok(Completed::new(format!("{artifact} created successfully.")).with_artifact(artifact))
    }
}

fn sort_keys(folded: &str) -> [&'static str; 2] {
    if folded.contains("by first name") || folded.contains("by first_name") {
        ["first_name", "last_name"]
    } else {
        ["last_name", "first_name"]
    }
}

/// Stable sort of an array of objects. Every record must carry both keys as strings.
fn sort_records(records: Value, keys: [&str; 2]) -> Result<Value, String> {
    let Value::Array(items) = records else {
        return Err("expected a JSON array of contacts".to_string());
    };
    let mut keyed = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let field = |name: &str| -> Result<String, String> {
            item.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("record {idx} has no string field {name}"))
        };
        let key = (field(keys[0])?, field(keys[1])?);
        keyed.push((key, item));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(Value::Array(keyed.into_iter().map(|(_, item)| item).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorts_by_last_then_first() {
        let input = json!([
            {"first_name": "A", "last_name": "Z"},
            {"first_name": "C", "last_name": "A"},
            {"first_name": "B", "last_name": "A"},
        ]);
        let sorted = sort_records(input, ["last_name", "first_name"]).unwrap();
        let names: Vec<_> = sorted
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["first_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["B", "C", "A"]);
    }

    #[test]
    fn test_rejects_non_array_and_missing_keys() {
        assert!(sort_records(json!({"a": 1}), ["last_name", "first_name"]).is_err());
        let err = sort_records(json!([{"first_name": "A"}]), ["last_name", "first_name"]).unwrap_err();
        assert!(err.contains("last_name"));
    }

    #[test]
    fn test_sort_key_selection() {
        assert_eq!(sort_keys("sort contacts by first name"), ["first_name", "last_name"]);
        assert_eq!(sort_keys("sort contacts by last name"), ["last_name", "first_name"]);
    }
}
