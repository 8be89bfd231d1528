use std::collections::BTreeMap;

use tracing::debug;

use crate::models::DiarizedTranscript;

/// Phrases a sales agent uses near the top of a call; a tag whose utterances
/// contain these is almost certainly the agent side
const AGENT_MARKERS: [&str; 6] = [
    "お世話になっております",
    "株式会社",
    "と申します",
    "の者です",
    "お電話させていただ",
    "ご案内",
];

/// Weight of one marker hit relative to one utterance
const MARKER_WEIGHT: usize = 10;

/// Resolve which speaker tag belongs to the sales agent.
///
/// Scores each distinct tag by utterance count plus lexical
/// self-introduction markers; the highest score wins and ties go to the
/// lexicographically smallest tag, so resolution is deterministic. An empty
/// transcript has no agent and resolves to `None`.
pub fn resolve_agent_tag(transcript: &DiarizedTranscript) -> Option<String> {
    if transcript.utterances.is_empty() {
        return None;
    }

    // BTreeMap keeps tags ordered, which gives the lexicographic tie-break
    let mut scores: BTreeMap<&str, usize> = BTreeMap::new();

    for utterance in &transcript.utterances {
        let marker_hits = AGENT_MARKERS
            .iter()
            .filter(|m| utterance.text.contains(*m))
            .count();
        *scores.entry(utterance.speaker_tag.as_str()).or_default() +=
            1 + marker_hits * MARKER_WEIGHT;
    }

    let (tag, score) = scores
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))?;

    debug!("resolved agent tag {} (score {})", tag, score);
    Some((*tag).to_string())
}
