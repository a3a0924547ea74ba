//! Local keyword-driven simulator used when no API key is configured.
//!
//! Dispatch is an ordered rule table evaluated first-match-wins against
//! the lowercased input. New triggers are new rows, not new branches.

use std::time::Duration;

use taskpilot_types::chat::AssistantReply;
use taskpilot_types::task::{ProposedTask, Task};

/// Default artificial latency, matching the feel of a remote round trip.
pub const DEFAULT_SIMULATOR_DELAY: Duration = Duration::from_millis(1000);

pub const GENERATION_ACK: &str = "（模拟模式）没问题，我已经为你把这个大目标拆解成了几个可执行的小任务（配置 API Key 可体验真实智能生成）：";

pub const CAPABILITY_TEXT: &str = "我是你的效率助手。你可以在“设置”中配置 API Key 来激活我的完全体。目前我可以模拟生成计划或总结。";

const GENERIC_SUBTASKS: [&str; 3] = ["调研相关竞品分析", "草拟项目需求文档 (PRD)", "设计初步 UI 原型"];

/// One row of the dispatch table.
struct Rule {
    name: &'static str,
    triggers: &'static [&'static str],
    respond: fn(&[Task]) -> AssistantReply,
}

impl Rule {
    fn matches(&self, lowered: &str) -> bool {
        self.triggers.iter().any(|trigger| lowered.contains(trigger))
    }
}

const RULES: &[Rule] = &[
    Rule {
        name: "generation",
        triggers: &["生成", "计划", "帮我", "plan", "generate", "help me", "break down"],
        respond: plan_reply,
    },
    Rule {
        name: "summary",
        triggers: &["总结", "回顾", "summary", "summarize", "review"],
        respond: summary_reply,
    },
];

fn plan_reply(_tasks: &[Task]) -> AssistantReply {
    let proposed = GENERIC_SUBTASKS
        .iter()
        .filter_map(ProposedTask::new)
        .collect();
    AssistantReply::generation(GENERATION_ACK, proposed)
}

fn summary_reply(tasks: &[Task]) -> AssistantReply {
    let completed = tasks.iter().filter(|t| t.completed).count();
    let pending = tasks
        .iter()
        .filter(|t| !t.completed && t.status.is_active())
        .count();
    AssistantReply::summary(format!(
        "（模拟模式）本周工作小结：已完成 {completed} 项，待办 {pending} 项。建议优先处理高优先级事项。"
    ))
}

/// Heuristic stand-in for the remote model. Never fails.
#[derive(Debug, Clone)]
pub struct LocalSimulator {
    delay: Duration,
}

impl LocalSimulator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Wait for the configured delay, then answer from the rule table.
    #[tracing::instrument(name = "simulate", skip_all, fields(input_len = input.len()))]
    pub async fn respond(&self, input: &str, tasks: &[Task]) -> AssistantReply {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Self::reply_for(input, tasks)
    }

    /// The pure part of [`LocalSimulator::respond`].
    pub fn reply_for(input: &str, tasks: &[Task]) -> AssistantReply {
        let lowered = input.to_lowercase();
        match RULES.iter().find(|rule| rule.matches(&lowered)) {
            Some(rule) => {
                tracing::debug!(rule = rule.name, "Simulator rule matched");
                (rule.respond)(tasks)
            }
            None => AssistantReply::chat(CAPABILITY_TEXT),
        }
    }
}

impl Default for LocalSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATOR_DELAY)
    }
}
