use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CheckError, Result};
use crate::llm::CompletionPort;
use crate::models::{
    record::{HEADER_CHECKER_NAME, HEADER_HANGUP, HEADER_SUMMARY, VERDICT_ISSUE},
    QualityRecord, Roster,
};
use crate::quality::checker_name::resolve_checker_name;
use crate::quality::hangup::detect_hangup;
use crate::quality::prompts::build_rubric_system_prompt;

/// Runs the rubric evaluation for one call transcript.
///
/// A single JSON-constrained completion call judges every criterion at once;
/// the agent name, the violation summary and the hang-up flag are derived
/// locally and never trusted from model output.
pub struct RubricEngine;

impl RubricEngine {
    /// Evaluate one transcript against the full rubric.
    ///
    /// Fails with `Processing` when the model response cannot be parsed as a
    /// JSON object, and passes `Api` errors from the completion port through
    /// unchanged. Either way the caller owns the failure; nothing here is
    /// silently defaulted to a guessed verdict.
    pub async fn check<C: CompletionPort + ?Sized>(
        transcript_text: &str,
        roster: &Roster,
        completion: &C,
    ) -> Result<QualityRecord> {
        if transcript_text.trim().is_empty() {
            return Err(CheckError::Validation("input text is empty".to_string()));
        }

        // Name resolution must finish before the rubric call: its result is
        // woven into the rubric instruction.
        let checker_name = resolve_checker_name(transcript_text, roster, completion).await;
        if !checker_name.is_empty() {
            debug!("resolved checker name: {}", checker_name);
        }

        let system = build_rubric_system_prompt(&checker_name);
        let raw = completion.complete(&system, transcript_text, true).await?;
        if raw.trim().is_empty() {
            return Err(CheckError::processing("empty model response", raw));
        }

        let parsed = Self::parse_json_response(&raw)?;
        let record = Self::project(parsed, &checker_name, transcript_text);
        info!("rubric check complete: {}", record.get(HEADER_SUMMARY));
        Ok(record)
    }

    /// Parse the model response as a JSON object, stripping any markdown
    /// fence the provider slipped in despite json mode
    fn parse_json_response(raw: &str) -> Result<serde_json::Map<String, Value>> {
        let cleaned = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        match serde_json::from_str::<Value>(cleaned) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(CheckError::processing(
                format!("expected JSON object, got {}", json_type_name(&other)),
                raw,
            )),
            Err(e) => Err(CheckError::processing(
                format!("JSON parse error: {}", e),
                raw,
            )),
        }
    }

    /// Project parsed verdicts onto the fixed schema and fill the derived
    /// fields. Unknown keys are dropped by the record itself; schema keys
    /// absent from the response stay empty.
    fn project(
        parsed: serde_json::Map<String, Value>,
        checker_name: &str,
        transcript_text: &str,
    ) -> QualityRecord {
        let mut record = QualityRecord::empty();

        for (key, value) in parsed {
            match value {
                Value::String(s) => record.set(&key, s),
                Value::Null => {}
                other => record.set(&key, other.to_string()),
            }
        }

        // The independently resolved name wins over whatever the model wrote
        if !checker_name.is_empty() {
            record.set(HEADER_CHECKER_NAME, checker_name);
        }

        if detect_hangup(transcript_text) {
            record.set(HEADER_HANGUP, VERDICT_ISSUE);
        }

        let summary = record.derive_summary();
        record.set(HEADER_SUMMARY, summary);
        record
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
