//! The `add_tasks` function offered to the model in structured dialects.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use taskpilot_types::llm::{ToolDefinition, ToolInvocation};
use taskpilot_types::task::ProposedTask;

use super::parser::proposed_from_value;

pub const ADD_TASKS_TOOL: &str = "add_tasks";

/// Older prompts and some models use this name for the same function.
const ADD_TASKS_ALIAS: &str = "add_todos";

const ADD_TASKS_DESCRIPTION: &str = "批量添加一个或多个待办任务。当用户说“帮我创建”“添加任务”“生成计划”或需要把目标拆解成小任务时使用。";

/// Arguments of `add_tasks`, used only to generate the JSON schema.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddTasksArguments {
    /// Tasks to create. Each should be concrete and actionable.
    pub tasks: Vec<ProposedTask>,
}

/// Definition of the `add_tasks` tool with a schemars-generated schema.
///
/// Subschemas are inlined and `$schema`/`title` are dropped, since several
/// OpenAI-compatible endpoints reject `$ref` and meta keys in parameters.
pub fn add_tasks_tool() -> ToolDefinition {
    let generator = schemars::generate::SchemaSettings::draft07()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let mut parameters = generator
        .into_root_schema_for::<AddTasksArguments>()
        .to_value();
    if let Value::Object(map) = &mut parameters {
        map.remove("$schema");
        map.remove("title");
    }

    ToolDefinition {
        name: ADD_TASKS_TOOL.to_string(),
        description: ADD_TASKS_DESCRIPTION.to_string(),
        parameters,
    }
}

/// Whether an invocation targets the task-creation function.
pub fn is_add_tasks(call: &ToolInvocation) -> bool {
    call.name == ADD_TASKS_TOOL || call.name == ADD_TASKS_ALIAS
}

/// Extract proposed tasks from raw `add_tasks` arguments.
///
/// Accepts `tasks` or `todos` as the list key and string or object entries.
pub fn parse_add_tasks_arguments(raw: &str) -> Result<Vec<ProposedTask>, String> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| format!("arguments are not valid JSON: {e}"))?;
    let items = value
        .get("tasks")
        .or_else(|| value.get("todos"))
        .and_then(Value::as_array)
        .ok_or_else(|| "arguments have no 'tasks' array".to_string())?;
    Ok(items.iter().filter_map(proposed_from_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_types::llm::Dialect;
    use taskpilot_types::task::Priority;

    #[test]
    fn test_tool_schema_shape() {
        let tool = add_tasks_tool();
        assert_eq!(tool.name, "add_tasks");
        assert!(tool.parameters.get("$schema").is_none());
        assert_eq!(tool.parameters["type"], "object");
        assert_eq!(tool.parameters["properties"]["tasks"]["type"], "array");
        let required = tool.parameters["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "tasks"));
    }

    #[test]
    fn test_parse_object_entries() {
        let tasks = parse_add_tasks_arguments(
            r#"{"tasks":[{"text":"write tests","priority":"medium"},{"text":"ship"}]}"#,
        )
        .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].priority, Some(Priority::Medium));
    }

    #[test]
    fn test_parse_todos_alias_with_strings() {
        let tasks = parse_add_tasks_arguments(r#"{"todos":["a","b","c"]}"#).unwrap();
        assert_eq!(tasks.len(), 3);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_add_tasks_arguments("not json").is_err());
        assert!(parse_add_tasks_arguments(r#"{"items":[]}"#).is_err());
    }

    #[test]
    fn test_alias_name_is_recognized() {
        let call = ToolInvocation {
            name: "add_todos".to_string(),
            arguments: "{}".to_string(),
            dialect: Dialect::Functions,
        };
        assert!(is_add_tasks(&call));
    }
}
