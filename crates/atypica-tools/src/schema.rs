use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::BTreeSet;
use std::error::Error as StdError;

use crate::error::ToolExecutionError;

/// Flattened JSON schema of a tool's parameters, in the shape chat
/// completion APIs expect for function definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSchema {
    pub properties: serde_json::Map<String, Value>,
    pub required: Vec<String>,
    #[serde(rename = "type")]
    pub schema_type: String,
}

impl InputSchema {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "type": self.schema_type,
            "properties": self.properties,
            "required": self.required,
        })
    }
}

impl From<schemars::Schema> for InputSchema {
    fn from(schema: schemars::Schema) -> Self {
        let value = serde_json::to_value(&schema).unwrap_or(Value::Null);

        let mut properties = serde_json::Map::new();
        let mut required = BTreeSet::new();
        collect(&value, &mut properties, &mut required);

        let schema_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("object")
            .to_string();

        Self {
            properties,
            required: required.into_iter().collect(),
            schema_type,
        }
    }
}

fn collect(
    schema: &Value,
    properties: &mut serde_json::Map<String, Value>,
    required: &mut BTreeSet<String>,
) {
    let Some(obj) = schema.as_object() else {
        return;
    };

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (key, value) in props {
            properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    if let Some(names) = obj.get("required").and_then(Value::as_array) {
        required.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
    }

    // Flattened structs show up as allOf branches.
    if let Some(all_of) = obj.get("allOf").and_then(Value::as_array) {
        for sub in all_of {
            collect(sub, properties, required);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

pub trait ToolSpec {
    type Params: DeserializeOwned + JsonSchema + Send;
    type Result: Into<crate::result::ToolResult> + Send;
    type Error: StdError + Send + Sync + 'static;

    const NAME: &'static str;
    const DISPLAY_NAME: &'static str;

    fn execution_error(error: Self::Error) -> ToolExecutionError;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub parameters: Value,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::InputSchema;
    use schemars::schema_for;

    #[test]
    fn conclusion_schema_requires_every_field() {
        let schema = schema_for!(crate::tools::save_conclusion::SaveConclusionParams);
        let input_schema: InputSchema = schema.into();

        assert_eq!(input_schema.schema_type, "object");
        for field in ["conclusion", "persona_summary", "highlights"] {
            assert!(input_schema.properties.contains_key(field), "{field}");
            assert!(input_schema.required.contains(&field.to_string()), "{field}");
        }
    }

    #[test]
    fn search_schema_describes_keyword() {
        let schema = schema_for!(crate::tools::content_search::ContentSearchParams);
        let input_schema: InputSchema = schema.into();

        let keyword = input_schema
            .properties
            .get("keyword")
            .and_then(|v| v.get("description"))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        assert!(!keyword.is_empty());

        let json = input_schema.to_json();
        assert_eq!(json["required"][0], "keyword");
    }

    #[test]
    fn persona_schema_lists_tags_as_strings() {
        let schema = schema_for!(crate::tools::save_persona::SavePersonaParams);
        let input_schema: InputSchema = schema.into();

        let tags = &input_schema.properties["tags"];
        assert_eq!(tags["type"], "array");
        assert_eq!(tags["items"]["type"], "string");
        assert_eq!(input_schema.required, vec!["name", "prompt", "tags"]);
    }
}
