//! # AI Casting Agent
//!
//! Asks an OpenAI-compatible AI gateway to suggest models for an event.
//! The gateway is forced to answer through the `suggest_models` tool, so the
//! reply is structured JSON rather than prose.

mod client;

pub use client::{GatewayClient, GatewayError};

use chrono::{DateTime, NaiveDate, Utc};
use fashionos_core::{SessionId, WizardEvent, WizardEventKind, WizardMonitor};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Name of the forced tool call.
pub const SUGGEST_MODELS_TOOL: &str = "suggest_models";

/// Upper bound on models requested in one call.
pub const MAX_MODEL_COUNT: u32 = 20;

/// Session id used on the monitor when the caller sends none.
const UNATTACHED_SESSION: &str = "casting";

// =============================================================================
// REQUEST / RECOMMENDATION
// =============================================================================

/// What the organizer tells the casting agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastingRequest {
    /// Wizard session the request belongs to, for telemetry.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub event_title: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[serde(default)]
    pub style_notes: String,
    #[serde(default = "default_model_count")]
    pub model_count: u32,
}

fn default_model_count() -> u32 {
    5
}

impl CastingRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.event_title.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "event_title is required".to_string(),
            ));
        }
        if self.model_count == 0 || self.model_count > MAX_MODEL_COUNT {
            return Err(GatewayError::InvalidRequest(format!(
                "model_count must be between 1 and {}",
                MAX_MODEL_COUNT
            )));
        }
        Ok(())
    }

    fn telemetry_session(&self) -> SessionId {
        self.session_id
            .clone()
            .unwrap_or_else(|| SessionId::new(UNATTACHED_SESSION))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One suggested model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastingRecommendation {
    pub name: String,
    pub agency: String,
    pub email: String,
    /// Fit for the event, 0 to 100.
    pub score: u8,
    pub reasoning: String,
    pub priority: Priority,
}

/// Tool-call arguments as the model writes them; `score` is clamped later.
#[derive(Deserialize)]
struct RawRecommendation {
    name: String,
    #[serde(default)]
    agency: String,
    #[serde(default)]
    email: String,
    score: u32,
    #[serde(default)]
    reasoning: String,
    priority: Priority,
}

#[derive(Deserialize)]
struct SuggestModelsArgs {
    recommendations: Vec<RawRecommendation>,
}

// =============================================================================
// PROMPT AND WIRE FORMAT
// =============================================================================

fn system_prompt() -> &'static str {
    "You are a casting director for fashion events. Recommend real-world style \
     model profiles that fit the event brief. Always answer by calling the \
     suggest_models tool."
}

#[must_use]
pub fn build_prompt(request: &CastingRequest) -> String {
    let mut prompt = format!(
        "Suggest {} models for the event \"{}\".",
        request.model_count,
        request.event_title.trim()
    );
    if !request.event_type.trim().is_empty() {
        prompt.push_str(&format!("\nEvent type: {}", request.event_type.trim()));
    }
    if let Some(date) = request.event_date {
        prompt.push_str(&format!("\nDate: {}", date.format("%Y-%m-%d")));
    }
    if !request.style_notes.trim().is_empty() {
        prompt.push_str(&format!("\nStyle notes: {}", request.style_notes.trim()));
    }
    prompt.push_str(
        "\nFor each model give name, agency, contact email, a fit score from 0 to 100, \
         short reasoning and a booking priority (high, medium or low).",
    );
    prompt
}

fn suggest_models_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "recommendations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "agency": { "type": "string" },
                        "email": { "type": "string" },
                        "score": { "type": "integer", "minimum": 0, "maximum": 100 },
                        "reasoning": { "type": "string" },
                        "priority": { "type": "string", "enum": ["high", "medium", "low"] }
                    },
                    "required": ["name", "agency", "email", "score", "reasoning", "priority"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["recommendations"],
        "additionalProperties": false
    })
}

/// Chat completion body with `suggest_models` as the forced tool.
#[must_use]
pub fn completion_body(request: &CastingRequest, model: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt() },
            { "role": "user", "content": build_prompt(request) }
        ],
        "tools": [{
            "type": "function",
            "function": {
                "name": SUGGEST_MODELS_TOOL,
                "description": "Return casting recommendations for the event.",
                "parameters": suggest_models_schema()
            }
        }],
        "tool_choice": { "type": "function", "function": { "name": SUGGEST_MODELS_TOOL } }
    })
}

/// Extract recommendations from a chat completion response.
pub fn parse_completion(body: &Value) -> Result<Vec<CastingRecommendation>, GatewayError> {
    let calls = body
        .pointer("/choices/0/message/tool_calls")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::Parse("response has no tool calls".to_string()))?;

    let call = calls
        .iter()
        .find(|c| c.pointer("/function/name").and_then(Value::as_str) == Some(SUGGEST_MODELS_TOOL))
        .ok_or_else(|| GatewayError::Parse(format!("no {} tool call", SUGGEST_MODELS_TOOL)))?;

    let arguments = call
        .pointer("/function/arguments")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Parse("tool call has no arguments".to_string()))?;

    let args: SuggestModelsArgs =
        serde_json::from_str(arguments).map_err(|e| GatewayError::Parse(e.to_string()))?;

    Ok(args
        .recommendations
        .into_iter()
        .map(|r| CastingRecommendation {
            name: r.name,
            agency: r.agency,
            email: r.email,
            score: r.score.min(100) as u8,
            reasoning: r.reasoning,
            priority: r.priority,
        })
        .collect())
}

// =============================================================================
// TELEMETRY
// =============================================================================

/// Record a casting call on the monitor: always `ai_interaction`, plus
/// `error` when it failed.
pub fn track_casting(
    monitor: &mut WizardMonitor,
    request: &CastingRequest,
    result: &Result<Vec<CastingRecommendation>, GatewayError>,
    now: DateTime<Utc>,
) {
    let session_id = request.telemetry_session();
    let mut interaction = WizardEvent::new(WizardEventKind::AiInteraction, session_id.clone(), now)
        .with("feature", "model_casting")
        .with("success", result.is_ok());
    if let Ok(recommendations) = result {
        interaction = interaction.with("recommendations", recommendations.len());
    }
    monitor.track_event(interaction);

    if let Err(e) = result {
        monitor.track_event(
            WizardEvent::new(WizardEventKind::Error, session_id, now)
                .with("feature", "model_casting")
                .with("message", e.to_string()),
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================
