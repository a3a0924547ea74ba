//! Prompt construction for the remote model.
//!
//! The task context is a compact JSON array with text/completed/status
//! only; ids and timestamps never leave the process.

use serde::Serialize;

use taskpilot_types::llm::Dialect;
use taskpilot_types::settings::AssistantSettings;
use taskpilot_types::task::{Task, TaskStatistics, TaskStatus};

/// Default cap on serialized context entries.
pub const DEFAULT_MAX_CONTEXT_TASKS: usize = 50;

/// Fixed output contract. The model picks exactly one of three shapes.
const RESPONSE_CONTRACT: &str = r#"## 输出格式
你必须只输出一个 JSON 对象，不要输出任何额外文字，也不要使用 ``` 代码块。
根据用户意图，从以下三种形式中选择一种：
1. 普通对话：{"response": "你的回复"}
2. 拆解或新建任务：{"response": "你的回复", "new_tasks": ["任务1", "任务2"]}
3. 总结回顾：{"response": "基于任务列表的小结", "type": "summary"}
new_tasks 中的每一项都应具体、可执行。"#;

const TOOL_HINT: &str = "需要新建任务时，优先调用 add_tasks 函数；调用函数时 response 写给用户看的简短说明即可。";

#[derive(Serialize)]
struct ContextEntry<'a> {
    text: &'a str,
    completed: bool,
    status: TaskStatus,
}

/// Serialize a task snapshot for the prompt.
///
/// Unfinished tasks come first so that truncation drops completed work
/// before open work. The header line always carries whole-list counts.
pub fn build_task_context(tasks: &[Task], max_entries: usize) -> String {
    if tasks.is_empty() {
        return "当前没有任何任务。".to_string();
    }

    let stats = TaskStatistics::from_tasks(tasks);
    let mut ordered: Vec<&Task> = tasks.iter().filter(|t| !t.completed).collect();
    ordered.extend(tasks.iter().filter(|t| t.completed));

    let entries: Vec<ContextEntry<'_>> = ordered
        .into_iter()
        .take(max_entries)
        .map(|t| ContextEntry {
            text: &t.text,
            completed: t.completed,
            status: t.status,
        })
        .collect();

    let json = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());
    let mut context = format!(
        "当前任务（共 {} 项：已完成 {}，待办 {}，进行中 {}，已取消 {}）：\n{json}",
        stats.total, stats.completed, stats.pending, stats.in_progress, stats.cancelled
    );
    if entries.len() < tasks.len() {
        context.push_str(&format!("\n（仅列出前 {} 项）", entries.len()));
    }
    context
}

/// Build the system prompt for one dialect attempt.
pub fn build_system_prompt(
    settings: &AssistantSettings,
    tasks: &[Task],
    max_entries: usize,
    dialect: Dialect,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(settings.system_prompt.trim());
    prompt.push_str("\n\n---\n");
    prompt.push_str(&build_task_context(tasks, max_entries));
    prompt.push_str("\n\n");
    prompt.push_str(RESPONSE_CONTRACT);
    if dialect.is_structured() {
        prompt.push('\n');
        prompt.push_str(TOOL_HINT);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_types::task::{NewTask, TaskUpdate};

    fn tasks() -> Vec<Task> {
        let mut done = Task::from_new(NewTask::new("done thing"));
        done.apply_update(TaskUpdate {
            completed: Some(true),
            ..Default::default()
        });
        vec![done, Task::from_new(NewTask::new("open thing"))]
    }

    #[test]
    fn test_context_excludes_ids_and_timestamps() {
        let tasks = tasks();
        let context = build_task_context(&tasks, 50);
        assert!(context.contains("open thing"));
        assert!(context.contains("\"status\":\"completed\""));
        for task in &tasks {
            assert!(!context.contains(&task.id.to_string()));
            assert!(!context.contains(&task.created_at.to_rfc3339()));
        }
        assert!(!context.contains("created_at"));
        assert!(!context.contains("\"id\""));
    }

    #[test]
    fn test_context_puts_open_tasks_first_and_truncates() {
        let context = build_task_context(&tasks(), 1);
        assert!(context.contains("open thing"));
        assert!(!context.contains("done thing"));
        assert!(context.contains("共 2 项"));
        assert!(context.contains("仅列出前 1 项"));
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(build_task_context(&[], 50), "当前没有任何任务。");
    }

    #[test]
    fn test_system_prompt_contract_and_tool_hint() {
        let settings = AssistantSettings::default();
        let text = build_system_prompt(&settings, &[], 50, Dialect::Text);
        assert!(text.starts_with(settings.system_prompt.trim()));
        assert!(text.contains("new_tasks"));
        assert!(!text.contains("add_tasks"));

        let structured = build_system_prompt(&settings, &[], 50, Dialect::Tools);
        assert!(structured.contains("add_tasks"));
    }
}
