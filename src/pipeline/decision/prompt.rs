use serde_json::{json, Value};

use super::types::ResponseMode;

/// Name of the forced function the model calls in structured mode.
pub const DECISION_TOOL_NAME: &str = "submit_decision";

pub const STRUCTURED_SYSTEM_PROMPT: &str = r#"You are a Prior Authorization Reviewer performing utilization review.
Evaluate the clinical data against the policy strictly.

RULES:
1. Decide ONLY from what the clinical data states. Do not assume missing facts.
2. APPROVED only when every policy criterion is explicitly met.
3. DENIED when a criterion is explicitly not met.
4. NEEDS_INFO when the data is insufficient to decide.
5. confidence is your certainty in the decision, from 0.0 to 1.0.

Submit your answer by calling the submit_decision function."#;

pub const FREE_TEXT_SYSTEM_PROMPT: &str = r#"You are a Prior Authorization Reviewer.
Evaluate the clinical data against the policy strictly.
Output Format:
DECISION: [APPROVED/DENIED]
CONFIDENCE: [0.0-1.0]
REASON: [Short clinical justification]"#;

pub fn system_prompt(mode: ResponseMode) -> &'static str {
    match mode {
        ResponseMode::Structured => STRUCTURED_SYSTEM_PROMPT,
        ResponseMode::FreeText => FREE_TEXT_SYSTEM_PROMPT,
    }
}

/// The single user message: policy first, then the redacted clinical text.
pub fn build_user_message(policy: &str, redacted_text: &str) -> String {
    format!("POLICY: {policy}\n\nDATA: {redacted_text}")
}

/// JSON Schema of the decision triple, used as the tool's parameters.
pub fn decision_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "decision": {
                "type": "string",
                "enum": ["APPROVED", "DENIED", "NEEDS_INFO"],
                "description": "APPROVED, DENIED, or NEEDS_INFO"
            },
            "reason": {
                "type": "string",
                "description": "Brief reason based on policy"
            },
            "confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
                "description": "0.0 to 1.0 confidence score"
            }
        },
        "required": ["decision", "reason", "confidence"]
    })
}

/// Tool declaration for an OpenAI-compatible `tools` array.
pub fn decision_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": DECISION_TOOL_NAME,
            "description": "Submit the prior-authorization decision for this case.",
            "parameters": decision_schema()
        }
    })
}

/// `tool_choice` value forcing the decision tool.
pub fn forced_tool_choice() -> Value {
    json!({
        "type": "function",
        "function": { "name": DECISION_TOOL_NAME }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_layout() {
        let msg = build_user_message("Pain > 6 weeks AND PT > 4 weeks", "{\"note\":\"x\"}");
        assert_eq!(msg, "POLICY: Pain > 6 weeks AND PT > 4 weeks\n\nDATA: {\"note\":\"x\"}");
    }

    #[test]
    fn free_text_prompt_names_all_markers() {
        let prompt = system_prompt(ResponseMode::FreeText);
        assert!(prompt.contains("DECISION:"));
        assert!(prompt.contains("CONFIDENCE:"));
        assert!(prompt.contains("REASON:"));
    }

    #[test]
    fn structured_prompt_mentions_tool() {
        assert!(system_prompt(ResponseMode::Structured).contains(DECISION_TOOL_NAME));
    }

    #[test]
    fn schema_requires_all_three_fields() {
        let schema = decision_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, ["decision", "reason", "confidence"]);
        assert_eq!(schema["properties"]["decision"]["enum"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn tool_choice_forces_decision_tool() {
        assert_eq!(forced_tool_choice()["function"]["name"], DECISION_TOOL_NAME);
        assert_eq!(decision_tool()["function"]["name"], DECISION_TOOL_NAME);
    }
}
