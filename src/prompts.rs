//! Prompts for the extraction model and the drug-information agent.
//!
//! Every prompt lives here so wording changes touch one file and unit tests
//! can inspect the prompts without a live model. Callers can override the
//! extraction prompt via [`crate::config::AnalyzerConfig::extraction_prompt`].

/// Default instruction sent alongside the prescription image.
///
/// The JSON shape here is the contract the response normaliser maps onto
/// [`crate::record::PrescriptionRecord`].
pub const EXTRACTION_PROMPT: &str = r#"Analyze this prescription image and extract its contents as JSON with exactly this shape:

{"patient_name": "...", "date": "...", "medications": [{"name": "...", "dosage": "...", "frequency": "..."}], "doctor_name": "..."}

Rules:
- Use null for any field that is not present on the prescription.
- List every medication in the order it appears.
- The prescription may be handwritten. When you cannot read a value with confidence, give your best reading followed by " (?)".
- Be accurate with drug names, strengths, and units; do not expand abbreviations you are unsure of.
- Output ONLY the JSON object."#;

/// System prompt for the per-medication summary.
pub const AGENT_SYSTEM_PROMPT: &str = r#"You are a pharmacist's assistant. You receive a request about one medication and the raw result of a drug-label lookup.

Summarize, in a few short Markdown bullet points:
- the most relevant side effects, taken from the lookup result
- the estimated price as given by the lookup result

Only use facts from the lookup result. If it says N/A, say that no label information was found. Do not give dosing advice."#;

/// Instruction handed to the lookup capability for one medication.
pub fn lookup_instruction(medication: &str) -> String {
    format!("Fetch info for {}", medication)
}

/// User turn for the agent: the request plus the tool observation.
pub fn agent_user_message(instruction: &str, tool_output: &str) -> String {
    format!(
        "{}\n\nDrug label lookup result:\n\"\"\"{}\"\"\"",
        instruction, tool_output
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_names_every_field() {
        for key in ["patient_name", "date", "medications", "dosage", "frequency", "doctor_name"] {
            assert!(EXTRACTION_PROMPT.contains(key), "missing {key}");
        }
        assert!(EXTRACTION_PROMPT.contains("handwritten"));
    }

    #[test]
    fn lookup_instruction_names_medication() {
        assert_eq!(lookup_instruction("Aspirin"), "Fetch info for Aspirin");
    }

    #[test]
    fn agent_message_embeds_tool_output() {
        let msg = agent_user_message("Fetch info for X", "Side effects: N/A");
        assert!(msg.starts_with("Fetch info for X"));
        assert!(msg.contains("Side effects: N/A"));
    }
}
