//! The drug-information agent: one tool call, one summary.
//!
//! For each medication the agent runs the [`DrugInfoTool`] and hands the
//! observation to the completion capability with a pharmacist-assistant
//! system prompt. There is no planning loop; the tool is always called
//! exactly once.

use crate::capability::{CompletionCapability, CompletionRequest, LookupCapability};
use crate::drug_info::DrugInfoTool;
use crate::error::AnalyzerError;
use crate::prompts::{agent_user_message, AGENT_SYSTEM_PROMPT};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// [`LookupCapability`] that combines a drug-information tool with a model.
pub struct DrugInfoAgent {
    tool: Arc<dyn DrugInfoTool>,
    completion: Arc<dyn CompletionCapability>,
}

impl DrugInfoAgent {
    pub fn new(tool: Arc<dyn DrugInfoTool>, completion: Arc<dyn CompletionCapability>) -> Self {
        Self { tool, completion }
    }
}

#[async_trait]
impl LookupCapability for DrugInfoAgent {
    async fn lookup(&self, medication: &str, instruction: &str) -> Result<String, AnalyzerError> {
        let observation = self.tool.fetch_drug_info(medication).await?;
        debug!("Tool observation for {}: {} chars", medication, observation.len());

        let request = CompletionRequest::new(agent_user_message(instruction, &observation))
            .with_system(AGENT_SYSTEM_PROMPT);
        let summary = self
            .completion
            .complete(request)
            .await
            .map_err(|e| AnalyzerError::LookupUnavailable {
                medication: medication.to_string(),
                reason: e.to_string(),
            })?;

        let summary = summary.trim();
        if summary.is_empty() {
            // Nothing from the model: the raw observation is still useful.
            return Ok(observation);
        }
        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedTool(Result<String, ()>);

    #[async_trait]
    impl DrugInfoTool for FixedTool {
        async fn fetch_drug_info(&self, medication: &str) -> Result<String, AnalyzerError> {
            self.0.clone().map_err(|_| AnalyzerError::LookupUnavailable {
                medication: medication.to_string(),
                reason: "openFDA HTTP 500".into(),
            })
        }
    }

    struct Summarizer {
        answer: Result<String, ()>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionCapability for Summarizer {
        async fn complete(&self, request: CompletionRequest) -> Result<String, AnalyzerError> {
            self.seen.lock().unwrap().push(request);
            self.answer
                .clone()
                .map_err(|_| AnalyzerError::CompletionUnavailable {
                    reason: "quota exceeded".into(),
                })
        }
    }

    fn agent(tool: Result<&str, ()>, answer: Result<&str, ()>) -> (DrugInfoAgent, Arc<Summarizer>) {
        let summarizer = Arc::new(Summarizer {
            answer: answer.map(String::from),
            seen: Mutex::new(Vec::new()),
        });
        let agent = DrugInfoAgent::new(
            Arc::new(FixedTool(tool.map(String::from))),
            Arc::clone(&summarizer) as Arc<dyn CompletionCapability>,
        );
        (agent, summarizer)
    }

    #[tokio::test]
    async fn summarises_tool_observation() {
        let (agent, summarizer) = agent(
            Ok("Side effects: Nausea... \nEstimated Price: Check GoodRx"),
            Ok("  - Nausea\n- Price: Check GoodRx \n"),
        );
        let out = agent.lookup("Advil", "Fetch info for Advil").await.unwrap();
        assert_eq!(out, "- Nausea\n- Price: Check GoodRx");

        let seen = summarizer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system.as_deref(), Some(AGENT_SYSTEM_PROMPT));
        assert!(seen[0].prompt.contains("Fetch info for Advil"));
        assert!(seen[0].prompt.contains("Side effects: Nausea"));
        assert!(seen[0].image.is_none());
    }

    #[tokio::test]
    async fn empty_summary_falls_back_to_observation() {
        let (agent, _) = agent(Ok("Side effects: N/A... "), Ok("   "));
        let out = agent.lookup("X", "Fetch info for X").await.unwrap();
        assert_eq!(out, "Side effects: N/A... ");
    }

    #[tokio::test]
    async fn completion_failure_is_lookup_unavailable() {
        let (agent, _) = agent(Ok("obs"), Err(()));
        let err = agent.lookup("Advil", "Fetch info for Advil").await.unwrap_err();
        match err {
            AnalyzerError::LookupUnavailable { medication, reason } => {
                assert_eq!(medication, "Advil");
                assert!(reason.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_failure_skips_completion() {
        let (agent, summarizer) = agent(Err(()), Ok("unused"));
        assert!(agent.lookup("Advil", "Fetch info for Advil").await.is_err());
        assert!(summarizer.seen.lock().unwrap().is_empty());
    }
}
