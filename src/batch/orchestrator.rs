use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{CheckError, Result};
use crate::llm::CompletionPort;
use crate::models::{BatchJob, BatchProgress, BatchReport, CellUpdate, QualityRecord, Roster};
use crate::quality::{is_conversation_too_short, RubricEngine};
use crate::store::{build_header_map, RowStore};

/// Configuration for one quality-check batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of pending rows to read
    pub max_rows: usize,
    /// Buffered records per store flush
    pub batch_size: usize,
    /// Pause after each flush, keeping the store under its rate limit
    pub courtesy_delay: Duration,
    /// Minimum labeled turns below which a row is skipped
    pub min_turns: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_rows: 50,
            batch_size: 5,
            courtesy_delay: Duration::from_secs(1),
            min_turns: crate::quality::DEFAULT_MIN_TURNS,
        }
    }
}

/// Run the quality-check batch: read pending rows, evaluate each one, and
/// flush results back to the store in fixed-size batches.
///
/// Rows are processed strictly sequentially; the completion provider is a
/// shared rate-limited resource. Any single row's failure is converted into
/// an error-sentinel record and never aborts the batch, while store failures
/// do abort the run with enough context to resume manually.
pub async fn run_quality_check_batch<S, C, F>(
    store: &S,
    completion: &C,
    roster: &Roster,
    config: &BatchConfig,
    mut on_progress: F,
) -> Result<BatchReport>
where
    S: RowStore + ?Sized,
    C: CompletionPort + ?Sized,
    F: FnMut(&BatchProgress),
{
    let run_id = Uuid::new_v4();

    let headers = store.header_row().await?;
    let header_map = build_header_map(&headers);

    let rows = store.read_pending(config.max_rows).await?;
    if rows.is_empty() {
        info!("run {}: no pending rows", run_id);
        return Ok(BatchReport::default());
    }
    info!("run {}: {} pending rows", run_id, rows.len());

    let mut report = BatchReport {
        rows_read: rows.len(),
        ..Default::default()
    };
    let mut progress = BatchProgress {
        rows_read: rows.len(),
        ..Default::default()
    };
    let mut buffer: Vec<BatchJob> = Vec::new();
    let total = rows.len();

    for (i, row) in rows.into_iter().enumerate() {
        let record = if is_conversation_too_short(&row.transcript, config.min_turns) {
            info!("{}: conversation too short, skipping rubric", row.source);
            report.skipped_short += 1;
            report.succeeded += 1;
            progress.succeeded += 1;
            QualityRecord::no_conversation()
        } else {
            match RubricEngine::check(&row.transcript, roster, completion).await {
                Ok(record) => {
                    report.succeeded += 1;
                    progress.succeeded += 1;
                    record
                }
                Err(e) => {
                    // Row-level failure: log, substitute the sentinel record,
                    // keep going with the next row
                    warn!("row {} ({}) failed: {}", row.row_index, row.source, e);
                    report.failed += 1;
                    progress.failed += 1;
                    QualityRecord::error_fallback(&e.to_string())
                }
            }
        };

        buffer.push(BatchJob {
            row_index: row.row_index,
            record,
        });
        progress.rows_processed = i + 1;
        on_progress(&progress);

        if buffer.len() >= config.batch_size || i == total - 1 {
            flush(store, &header_map, &mut buffer, config.courtesy_delay)
                .await
                .map_err(|e| {
                    error!(
                        "run {}: store flush failed at row {} ({}/{} rows processed): {}",
                        run_id,
                        row.row_index,
                        i + 1,
                        total,
                        e
                    );
                    CheckError::Store(format!(
                        "flush failed at row {} after {} of {} rows: {}",
                        row.row_index,
                        i + 1,
                        total,
                        e
                    ))
                })?;
            report.batches_flushed += 1;
        }
    }

    info!(
        "run {}: complete ({} succeeded, {} failed, {} skipped, {} flushes)",
        run_id, report.succeeded, report.failed, report.skipped_short, report.batches_flushed
    );
    Ok(report)
}

/// Write the buffered records and clear the buffer, then pause briefly
async fn flush<S: RowStore + ?Sized>(
    store: &S,
    header_map: &std::collections::HashMap<String, usize>,
    buffer: &mut Vec<BatchJob>,
    courtesy_delay: Duration,
) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }

    let updates: Vec<CellUpdate> = buffer
        .iter()
        .flat_map(|job| {
            job.record.iter().map(|(header, value)| CellUpdate {
                row_index: job.row_index,
                header: header.to_string(),
                value: value.to_string(),
            })
        })
        .collect();

    store.write_batch(header_map, &updates).await?;
    buffer.clear();
    tokio::time::sleep(courtesy_delay).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::record::{
        criteria_headers, HEADERS, HEADER_SUMMARY, VERDICT_ERROR, VERDICT_NO_ISSUE,
    };
    use crate::models::PendingRow;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockStore {
        rows: Vec<PendingRow>,
        flushes: Mutex<Vec<Vec<CellUpdate>>>,
        fail_writes: bool,
    }

    impl MockStore {
        fn new(rows: Vec<PendingRow>) -> Self {
            Self {
                rows,
                flushes: Mutex::new(Vec::new()),
                fail_writes: false,
            }
        }
    }

    #[async_trait]
    impl RowStore for MockStore {
        async fn header_row(&self) -> Result<Vec<String>> {
            let mut headers = vec!["文字起こし".to_string(), "ファイル名".to_string()];
            headers.extend(HEADERS.iter().map(|h| h.to_string()));
            Ok(headers)
        }

        async fn read_pending(&self, max_rows: usize) -> Result<Vec<PendingRow>> {
            Ok(self.rows.iter().take(max_rows).cloned().collect())
        }

        async fn write_batch(
            &self,
            _header_map: &HashMap<String, usize>,
            updates: &[CellUpdate],
        ) -> Result<()> {
            if self.fail_writes {
                return Err(CheckError::Store("write refused".to_string()));
            }
            self.flushes.lock().unwrap().push(updates.to_vec());
            Ok(())
        }

        async fn append_transcript(&self, _transcript: &str, _source: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Port that returns scripted rubric responses, one per call
    struct SequencePort {
        responses: Mutex<Vec<Result<String>>>,
        calls: Mutex<u32>,
    }

    impl SequencePort {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionPort for SequencePort {
        async fn complete(&self, _system: &str, _user: &str, _json: bool) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn clean_verdicts_json() -> String {
        let map: serde_json::Map<String, serde_json::Value> = criteria_headers()
            .iter()
            .map(|h| {
                (
                    h.to_string(),
                    serde_json::Value::String(VERDICT_NO_ISSUE.to_string()),
                )
            })
            .collect();
        serde_json::to_string(&map).unwrap()
    }

    fn long_transcript() -> String {
        "[テレアポ担当者] もしもし\n[顧客] はい\n[テレアポ担当者] ご案内です\n".to_string()
    }

    fn pending(row_index: usize, transcript: &str) -> PendingRow {
        PendingRow {
            row_index,
            transcript: transcript.to_string(),
            source: format!("call_{}.mp3", row_index),
        }
    }

    fn fast_config(batch_size: usize) -> BatchConfig {
        BatchConfig {
            max_rows: 50,
            batch_size,
            courtesy_delay: Duration::from_millis(0),
            min_turns: 3,
        }
    }

    fn summary_for(flushes: &[Vec<CellUpdate>], row_index: usize) -> String {
        flushes
            .iter()
            .flatten()
            .find(|u| u.row_index == row_index && u.header == HEADER_SUMMARY)
            .map(|u| u.value.clone())
            .expect("summary cell missing")
    }

    #[tokio::test]
    async fn test_short_conversation_never_calls_completion() {
        let store = MockStore::new(vec![pending(2, "[顧客] はい\n")]);
        let port = SequencePort::new(vec![]);
        let report = run_quality_check_batch(
            &store,
            &port,
            &Roster::default(),
            &fast_config(5),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(report.skipped_short, 1);
        assert_eq!(*port.calls.lock().unwrap(), 0);
        let flushes = store.flushes.lock().unwrap();
        assert_eq!(summary_for(&flushes, 2), "会話記録なし");
    }

    #[tokio::test]
    async fn test_row_failure_is_isolated() {
        // Row 3 gets an unparseable response; rows 2 and 4 succeed
        let store = MockStore::new(vec![
            pending(2, &long_transcript()),
            pending(3, &long_transcript()),
            pending(4, &long_transcript()),
        ]);
        let port = SequencePort::new(vec![
            Ok(clean_verdicts_json()),
            Ok("not json at all".to_string()),
            Ok(clean_verdicts_json()),
        ]);

        let report = run_quality_check_batch(
            &store,
            &port,
            &Roster::default(),
            &fast_config(10),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(report.rows_read, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);

        let flushes = store.flushes.lock().unwrap();
        assert!(summary_for(&flushes, 3).starts_with(VERDICT_ERROR));
        assert_eq!(summary_for(&flushes, 4), "特に問題は検出されませんでした");
        // The failed row still has every header populated
        let row3_cells = flushes
            .iter()
            .flatten()
            .filter(|u| u.row_index == 3)
            .count();
        assert_eq!(row3_cells, HEADERS.len());
    }

    #[tokio::test]
    async fn test_flush_cadence_and_partial_final_batch() {
        let store = MockStore::new((2..7).map(|i| pending(i, &long_transcript())).collect());
        let port = SequencePort::new((0..5).map(|_| Ok(clean_verdicts_json())).collect());

        let report = run_quality_check_batch(
            &store,
            &port,
            &Roster::default(),
            &fast_config(2),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(report.batches_flushed, 3);
        let flushes = store.flushes.lock().unwrap();
        assert_eq!(flushes.len(), 3);
        assert_eq!(flushes[0].len(), 2 * HEADERS.len());
        assert_eq!(flushes[2].len(), HEADERS.len());
    }

    #[tokio::test]
    async fn test_progress_counts() {
        let store = MockStore::new(vec![
            pending(2, &long_transcript()),
            pending(3, &long_transcript()),
        ]);
        let port = SequencePort::new(vec![
            Ok(clean_verdicts_json()),
            Ok("broken".to_string()),
        ]);

        let mut events = Vec::new();
        run_quality_check_batch(&store, &port, &Roster::default(), &fast_config(5), |p| {
            events.push(*p)
        })
        .await
        .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].rows_processed, 1);
        assert_eq!(events[0].succeeded, 1);
        assert_eq!(events[1].failed, 1);
        assert_eq!(events[1].rows_read, 2);
    }

    #[tokio::test]
    async fn test_store_failure_aborts_with_context() {
        let mut store = MockStore::new(vec![pending(2, &long_transcript())]);
        store.fail_writes = true;
        let port = SequencePort::new(vec![Ok(clean_verdicts_json())]);

        let err = run_quality_check_batch(
            &store,
            &port,
            &Roster::default(),
            &fast_config(1),
            |_| {},
        )
        .await
        .unwrap_err();

        match err {
            CheckError::Store(message) => {
                assert!(message.contains("row 2"));
                assert!(message.contains("1 of 1"));
            }
            other => panic!("expected Store, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_store_is_a_clean_noop() {
        let store = MockStore::new(vec![]);
        let port = SequencePort::new(vec![]);
        let report = run_quality_check_batch(
            &store,
            &port,
            &Roster::default(),
            &fast_config(5),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(report.rows_read, 0);
        assert!(store.flushes.lock().unwrap().is_empty());
    }
}
