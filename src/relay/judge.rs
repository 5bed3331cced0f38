use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::route::route_request;
use super::{Error, RelayState, TokenUsage};
use crate::chat;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JudgeRequest {
    context: String,
    candidate_a: String,
    candidate_b: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default, rename = "baseURL")]
    base_url: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    judge_system_prompt: Option<String>,
}

/// Scores for one candidate, each from 1 to 10.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JudgeMetrics {
    clarity: u8,
    completeness: u8,
    accuracy: u8,
    conciseness: u8,
    plain_language: u8,
    reasoning: String,
}

/// The structured answer requested from the judge model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Verdict {
    model_a: JudgeMetrics,
    model_b: JudgeMetrics,
    /// `A`, `B` or `tie`
    winner: String,
    winner_reasoning: String,
}

#[derive(Debug, Serialize)]
pub(super) struct JudgeResponse {
    #[serde(flatten)]
    verdict: Verdict,
    usage: TokenUsage,
}

fn metrics_schema() -> Value {
    let score = |description: &str| {
        json!({
            "type": "integer",
            "minimum": 1,
            "maximum": 10,
            "description": description,
        })
    };

    json!({
        "type": "object",
        "properties": {
            "clarity": score("How easy the description is to understand"),
            "completeness": score("Covers the content, purpose and use cases of the data"),
            "accuracy": score("Correctly describes the data"),
            "conciseness": score("Brief while still informative"),
            "plainLanguage": score("Uses active voice and simple words"),
            "reasoning": {
                "type": "string",
                "description": "A brief explanation of the scores",
            },
        },
        "required": ["clarity", "completeness", "accuracy", "conciseness", "plainLanguage", "reasoning"],
        "additionalProperties": false,
    })
}

/// The `response_format` which constrains the judge to a [`Verdict`].
fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "judge_response",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "modelA": metrics_schema(),
                    "modelB": metrics_schema(),
                    "winner": {"type": "string", "enum": ["A", "B", "tie"]},
                    "winnerReasoning": {"type": "string"},
                },
                "required": ["modelA", "modelB", "winner", "winnerReasoning"],
                "additionalProperties": false,
            },
        },
    })
}

fn judge_prompt(request: &JudgeRequest) -> String {
    format!(
        "CONTEXT:\n{}\n\nCANDIDATE A:\n{}\n\nCANDIDATE B:\n{}\n\n\
         Evaluate both candidates and respond with the JSON structure as specified.",
        request.context, request.candidate_a, request.candidate_b
    )
}

fn parse_verdict(content: &str) -> Result<Verdict, Error> {
    serde_json::from_str(content).map_err(|e| {
        if e.is_data() {
            Error::InvalidJudgeResponse(e)
        } else {
            Error::MalformedJudgeResponse(e)
        }
    })
}

/// Asks the judge model to compare two candidate outputs.
pub(super) async fn judge(
    State(state): State<RelayState>,
    Json(request): Json<JudgeRequest>,
) -> Result<Json<JudgeResponse>, Error> {
    let (route, client) = route_request(
        &state,
        request.model.as_deref(),
        request.base_url.as_deref(),
        request.api_key.as_deref(),
    )
    .await?;

    let messages = chat::single_turn(request.judge_system_prompt.as_deref(), judge_prompt(&request));

    let completion = client
        .completion(&route.model, &messages, Some(&response_format()))
        .await
        .map_err(Error::Judge)?;

    let content = match completion.content {
        Some(content) if !content.is_empty() => content,
        _ => return Err(Error::EmptyJudgeResponse),
    };

    Ok(Json(JudgeResponse {
        verdict: parse_verdict(&content)?,
        usage: completion.usage.into(),
    }))
}
