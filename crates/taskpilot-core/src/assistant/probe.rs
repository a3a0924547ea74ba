//! Diagnostic probe: one fixed prompt that needs a task-creation call.
//!
//! Runs the real remote path (same negotiation mode, same materializer) so
//! the report reflects what live chat would do with this configuration.

use tracing::info;

use taskpilot_types::chat::ReplyKind;
use taskpilot_types::llm::Dialect;
use taskpilot_types::probe::ProbeReport;
use taskpilot_types::settings::{AssistantSettings, FunctionCallingMode};

use super::materializer::{ActionMaterializer, MaterializeOutcome};
use super::remote::RemoteAdapter;
use super::session::call_error_text;
use super::tool::is_add_tasks;
use crate::llm::box_client::BoxModelClient;
use crate::repository::task::TaskRepository;

pub const PROBE_PROMPT: &str = "这是一次功能测试。请调用 add_tasks 函数，创建以下 3 个测试任务：\
「测试任务一：检查函数调用」「测试任务二：检查任务写入」「测试任务三：检查结果回显」。";

/// Send the probe prompt and report what happened.
///
/// Tasks the model asks for are really created.
#[tracing::instrument(name = "probe", skip_all, fields(provider = client.name(), model = %settings.model))]
pub async fn run_probe<T: TaskRepository>(
    client: BoxModelClient,
    settings: &AssistantSettings,
    tasks: &T,
) -> ProbeReport {
    let mode = settings.function_calling_mode;
    let adapter = RemoteAdapter::new(client, 0);

    let outcome = match adapter.ask(PROBE_PROMPT, &[], settings).await {
        Ok(outcome) => outcome,
        Err(e) => {
            return ProbeReport {
                success: false,
                message: call_error_text(&e),
                mode,
                dialect: None,
                function_called: false,
                function_name: None,
                tasks_created: 0,
                raw_response_sample: None,
                recommendations: vec![
                    "检查 API Key、接口地址和模型名称是否正确。".to_string(),
                    "确认网络可以访问该接口地址。".to_string(),
                ],
            };
        }
    };

    let function_name = outcome.call.as_ref().map(|call| call.name.clone());
    let function_called = outcome.call.as_ref().is_some_and(is_add_tasks);

    let (tasks_created, store_note) = match outcome.reply.proposed_tasks() {
        Some(proposed) => {
            let result = ActionMaterializer::new(tasks).materialize(proposed).await;
            let note = match &result {
                MaterializeOutcome::Created(_) => None,
                other => Some(other.transcript_message(proposed.len()).content),
            };
            (result.created().len(), note)
        }
        None => (0, None),
    };

    let mut recommendations = Vec::new();
    let (success, message) = if outcome.reply.kind() == ReplyKind::Error {
        recommendations.push("检查 API Key、接口地址和模型名称是否正确。".to_string());
        (false, outcome.reply.text().to_string())
    } else if function_called {
        if mode == FunctionCallingMode::Auto && outcome.dialect == Some(Dialect::Functions) {
            recommendations.push(
                "该接口只支持旧版 functions 调用，可将函数调用模式设为 functions 以省去一次探测请求。"
                    .to_string(),
            );
        }
        (
            tasks_created > 0,
            format!(
                "检测到函数调用（{}），已创建 {tasks_created} 个任务。",
                outcome.dialect.map(|d| d.to_string()).unwrap_or_default()
            ),
        )
    } else {
        if mode == FunctionCallingMode::Disabled {
            recommendations
                .push("当前已关闭结构化函数调用，可改为 auto 模式以启用函数调用。".to_string());
        } else {
            recommendations.push("尝试更换支持函数调用的模型。".to_string());
            if !settings.enable_text_fallback {
                recommendations
                    .push("开启文本解析回退，模型不支持函数调用时仍可创建任务。".to_string());
            }
        }
        let message = if tasks_created > 0 {
            format!("未检测到函数调用，通过文本解析创建了 {tasks_created} 个任务。")
        } else {
            "未检测到函数调用，也没有创建任务。".to_string()
        };
        (tasks_created > 0, message)
    };

    if let Some(note) = store_note {
        recommendations.push(note);
    }

    info!(
        success,
        function_called,
        tasks_created,
        dialect = ?outcome.dialect,
        "Probe finished"
    );

    ProbeReport {
        success,
        message,
        mode,
        dialect: outcome.dialect,
        function_called,
        function_name,
        tasks_created,
        raw_response_sample: outcome.raw_sample,
        recommendations,
    }
}
