use chrono::NaiveDate;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use roll_core::{ExportFormat, Mark, Source, export};
use roll_engine::{EngineError, SessionManager};

#[derive(Clone)]
pub struct RollServer {
    engine: SessionManager,
    tool_router: ToolRouter<Self>,
}

impl RollServer {
    pub fn new(engine: SessionManager) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )]))
}

/// Collaborator failures are the server's problem; everything else is a
/// rejected request.
fn engine_error(e: EngineError) -> McpError {
    if e.is_transport() {
        McpError::internal_error(e.to_string(), None)
    } else {
        McpError::invalid_params(e.to_string(), None)
    }
}

fn parse_param<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T, McpError> {
    value
        .parse()
        .map_err(|e: String| McpError::invalid_params(e, None))
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct LoadRequest {
    /// Class identifier
    class_id: String,
    /// Section identifier within the class
    section_id: String,
    /// Session date as YYYY-MM-DD. Defaults to today.
    date: Option<String>,
    /// Replace the current session even if it has unsaved marks
    discard_unsaved: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct MarkRequest {
    /// Student identifier from the roster
    student_id: String,
    /// "present" or "absent"
    status: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct StudentRequest {
    /// Student identifier from the roster
    student_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ClassifyRequest {
    /// "face" or "voice"
    source: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DiscardRequest {
    /// Required when the session has unsaved marks
    confirm: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExportRequest {
    /// "json" (default) or "csv"
    format: Option<String>,
}

#[tool_router]
impl RollServer {
    #[tool(
        description = "Load the roster for a class/section/date and start a fresh attendance session. Every student starts unmarked. Refuses to replace a session with unsaved marks unless discard_unsaved is true."
    )]
    async fn attendance_load(
        &self,
        Parameters(req): Parameters<LoadRequest>,
    ) -> Result<CallToolResult, McpError> {
        let date = match req.date.as_deref() {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                McpError::invalid_params(format!("date must be YYYY-MM-DD: {e}"), None)
            })?,
            None => chrono::Local::now().date_naive(),
        };

        let snapshot = self
            .engine
            .load(
                &req.class_id,
                &req.section_id,
                date,
                req.discard_unsaved.unwrap_or(false),
            )
            .await
            .map_err(engine_error)?;
        json_result(&snapshot)
    }

    #[tool(description = "Show every student in the active session with status and any pending suggestion.")]
    async fn attendance_roster(&self) -> Result<CallToolResult, McpError> {
        let snapshot = self.engine.snapshot().await.map_err(engine_error)?;
        json_result(&snapshot)
    }

    #[tool(
        description = "Manually mark a student present or absent. Clears any pending suggestion for that student."
    )]
    async fn attendance_mark(
        &self,
        Parameters(req): Parameters<MarkRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mark: Mark = parse_param(&req.status)?;
        self.engine
            .set_manual_status(&req.student_id, mark)
            .await
            .map_err(engine_error)?;
        let summary = self.engine.summary().await.map_err(engine_error)?;
        json_result(&serde_json::json!({
            "student_id": req.student_id,
            "status": mark,
            "summary": summary,
        }))
    }

    #[tool(description = "Accept a student's pending classifier suggestion as their mark.")]
    async fn attendance_accept(
        &self,
        Parameters(req): Parameters<StudentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let accepted = self
            .engine
            .accept_suggestion(&req.student_id)
            .await
            .map_err(engine_error)?;
        json_result(&serde_json::json!({
            "student_id": req.student_id,
            "status": accepted.suggested,
            "source": accepted.source,
            "confidence": accepted.confidence,
        }))
    }

    #[tool(
        description = "Start a face or voice classifier job for the active session. Returns immediately; results arrive as suggestions and never change a mark on their own. Check progress with attendance_jobs."
    )]
    async fn attendance_classify(
        &self,
        Parameters(req): Parameters<ClassifyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let source: Source = parse_param(&req.source)?;
        let handle = self
            .engine
            .start_classifier(source)
            .await
            .map_err(engine_error)?;
        json_result(&serde_json::json!({
            "source": handle.source(),
            "session_id": handle.session_id(),
            "state": "running",
        }))
    }

    #[tool(description = "Show the state and last report of each configured classifier for the active session.")]
    async fn attendance_jobs(&self) -> Result<CallToolResult, McpError> {
        let mut jobs = Vec::new();
        for source in self.engine.coordinator().sources() {
            jobs.push(self.engine.job_status(source).await.map_err(engine_error)?);
        }
        json_result(&serde_json::json!({ "jobs": jobs }))
    }

    #[tool(description = "Present/absent/unmarked counts, attendance rate, and whether the session can be submitted.")]
    async fn attendance_summary(&self) -> Result<CallToolResult, McpError> {
        let summary = self.engine.summary().await.map_err(engine_error)?;
        json_result(&summary)
    }

    #[tool(
        description = "Submit the active session. Fails while any student is unmarked. On success the session is closed."
    )]
    async fn attendance_submit(&self) -> Result<CallToolResult, McpError> {
        let receipt = self.engine.submit().await.map_err(engine_error)?;
        json_result(&receipt)
    }

    #[tool(description = "Close the active session without submitting. Requires confirm when there are unsaved marks.")]
    async fn attendance_discard(
        &self,
        Parameters(req): Parameters<DiscardRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session_id = self
            .engine
            .discard(req.confirm.unwrap_or(false))
            .await
            .map_err(engine_error)?;
        json_result(&serde_json::json!({ "discarded": session_id }))
    }

    #[tool(description = "Export the active session's roster as JSON or CSV.")]
    async fn attendance_export(
        &self,
        Parameters(req): Parameters<ExportRequest>,
    ) -> Result<CallToolResult, McpError> {
        let format: ExportFormat = parse_param(req.format.as_deref().unwrap_or("json"))?;
        let snapshot = self.engine.snapshot().await.map_err(engine_error)?;
        let text =
            export(&snapshot, format).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for RollServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Attendance marking for one class section at a time.\n\n\
                 WORKFLOW:\n\
                 1. attendance_load a class/section/date.\n\
                 2. Mark students with attendance_mark, or run attendance_classify and \
                    review the suggestions it attaches. Suggestions are never applied \
                    automatically: use attendance_accept or attendance_mark.\n\
                 3. attendance_summary shows what is left; attendance_submit once nobody is unmarked.\n\n\
                 Loading another section while marks are unsaved requires discard_unsaved."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
