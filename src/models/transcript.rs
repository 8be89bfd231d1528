use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single diarized utterance from the transcription provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// Provider-assigned speaker label (e.g. "A", "B")
    pub speaker_tag: String,
    /// What was said
    pub text: String,
}

impl Utterance {
    pub fn new(speaker_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_tag: speaker_tag.into(),
            text: text.into(),
        }
    }
}

/// Size class of the source audio file, derived from its byte count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    const MEDIUM_THRESHOLD: u64 = 10 * 1024 * 1024;
    const LARGE_THRESHOLD: u64 = 25 * 1024 * 1024;

    pub fn from_bytes(size_bytes: u64) -> Self {
        if size_bytes >= Self::LARGE_THRESHOLD {
            Self::Large
        } else if size_bytes >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Small
        }
    }
}

/// Metadata about the audio file a transcript came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size_bytes: u64,
    pub size_class: SizeClass,
}

impl FileMetadata {
    pub fn from_size(size_bytes: u64) -> Self {
        Self {
            size_bytes,
            size_class: SizeClass::from_bytes(size_bytes),
        }
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Role of a speaker in a sales call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeakerRole {
    Agent,
    Customer,
}

impl SpeakerRole {
    /// Display label used in formatted transcripts and prompts
    pub fn label(&self) -> &'static str {
        match self {
            Self::Agent => "テレアポ担当者",
            Self::Customer => "顧客",
        }
    }
}

/// A complete diarized transcript of one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizedTranscript {
    /// Utterances in chronological order
    pub utterances: Vec<Utterance>,
    /// Full text as returned by the provider
    pub full_text: String,
    pub metadata: FileMetadata,
}

impl DiarizedTranscript {
    pub fn new(utterances: Vec<Utterance>, metadata: FileMetadata) -> Self {
        let full_text = utterances
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            utterances,
            full_text,
            metadata,
        }
    }

    /// Distinct speaker tags, sorted for deterministic iteration
    pub fn speaker_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self
            .utterances
            .iter()
            .map(|u| u.speaker_tag.as_str())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Map every speaker tag to a role given the resolved agent tag.
    ///
    /// Computed once per transcript and passed to all downstream consumers;
    /// formatting never re-derives it.
    pub fn role_map(&self, agent_tag: &str) -> HashMap<String, SpeakerRole> {
        self.speaker_tags()
            .into_iter()
            .map(|tag| {
                let role = if tag == agent_tag {
                    SpeakerRole::Agent
                } else {
                    SpeakerRole::Customer
                };
                (tag.to_string(), role)
            })
            .collect()
    }
}

/// Format a transcript with role labels, one utterance per line.
///
/// This is the exact shape ShortConversationGate counts turns against, so the
/// `[label]` framing must stay in sync with its pattern.
pub fn format_for_quality_check(
    transcript: &DiarizedTranscript,
    roles: &HashMap<String, SpeakerRole>,
) -> String {
    let mut out = String::new();
    for utterance in &transcript.utterances {
        let label = roles
            .get(&utterance.speaker_tag)
            .map(|r| r.label())
            .unwrap_or("顧客");
        out.push_str(&format!("[{}] {}\n", label, utterance.text));
    }
    out
}

/// Format a transcript for storage in the spreadsheet, with a file-size header
pub fn format_for_sheet(
    transcript: &DiarizedTranscript,
    roles: &HashMap<String, SpeakerRole>,
) -> String {
    let body = format_for_quality_check(transcript, roles);
    format!(
        "=== 全体の会話 （ファイルサイズ: {:.1}MB） ===\n{}",
        transcript.metadata.size_mb(),
        body
    )
}

/// Extract only the agent's utterances, one per line
pub fn agent_statements(
    transcript: &DiarizedTranscript,
    roles: &HashMap<String, SpeakerRole>,
) -> String {
    transcript
        .utterances
        .iter()
        .filter(|u| roles.get(&u.speaker_tag) == Some(&SpeakerRole::Agent))
        .map(|u| u.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
