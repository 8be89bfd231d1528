pub mod batch;
pub mod error;
pub mod llm;
pub mod models;
pub mod quality;
pub mod speaker;
pub mod store;
pub mod transcription;

pub use batch::{run_quality_check_batch, BatchConfig};
pub use error::CheckError;
pub use llm::{CompletionPort, OpenAiClient, OpenAiConfig, RetryPolicy, RetryingCompletion};
pub use models::{
    BatchProgress, BatchReport, DiarizedTranscript, QualityRecord, Roster, SpeakerRole, Utterance,
};
pub use quality::{is_conversation_too_short, RubricEngine};
pub use speaker::resolve_agent_tag;
pub use store::{RowStore, SheetsClient, SheetsConfig};
pub use transcription::{TranscriptionClient, TranscriptionConfig};
