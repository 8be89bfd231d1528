use tracing::warn;

use crate::llm::CompletionPort;
use crate::models::Roster;
use crate::quality::prompts::build_checker_name_prompt;

/// Ask the model which roster member is the agent in this call.
///
/// Best-effort: any port error is swallowed and logged, and the caller
/// proceeds without a name rather than aborting the check. Returns an empty
/// string when nothing was resolved.
pub async fn resolve_checker_name<C: CompletionPort + ?Sized>(
    transcript_text: &str,
    roster: &Roster,
    completion: &C,
) -> String {
    if roster.is_empty() {
        return String::new();
    }

    let system = build_checker_name_prompt(roster);
    match completion.complete(&system, transcript_text, false).await {
        Ok(answer) => answer.trim().to_string(),
        Err(e) => {
            warn!("checker name resolution failed, continuing without: {}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CheckError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedPort {
        response: Result<String>,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl CompletionPort for ScriptedPort {
        async fn complete(&self, _system: &str, _user: &str, _json: bool) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            match &self.response {
                Ok(s) => Ok(s.clone()),
                Err(CheckError::Api { message, transient }) => {
                    Err(CheckError::api(message.clone(), *transient))
                }
                Err(_) => Err(CheckError::Validation("scripted".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_resolves_trimmed_name() {
        let port = ScriptedPort {
            response: Ok(" 鈴木\n".to_string()),
            calls: Mutex::new(0),
        };
        let roster = Roster::from_csv("鈴木,田中");
        let name = resolve_checker_name("[テレアポ担当者] 鈴木です", &roster, &port).await;
        assert_eq!(name, "鈴木");
    }

    #[tokio::test]
    async fn test_port_error_yields_empty_name() {
        let port = ScriptedPort {
            response: Err(CheckError::api("down", false)),
            calls: Mutex::new(0),
        };
        let roster = Roster::from_csv("鈴木");
        let name = resolve_checker_name("text", &roster, &port).await;
        assert_eq!(name, "");
    }

    #[tokio::test]
    async fn test_empty_roster_skips_the_call() {
        let port = ScriptedPort {
            response: Ok("鈴木".to_string()),
            calls: Mutex::new(0),
        };
        let roster = Roster::default();
        let name = resolve_checker_name("text", &roster, &port).await;
        assert_eq!(name, "");
        assert_eq!(*port.calls.lock().unwrap(), 0);
    }
}
