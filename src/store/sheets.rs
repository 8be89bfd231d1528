use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{CheckError, Result};
use crate::models::{record::HEADER_SUMMARY, CellUpdate, PendingRow};
use crate::store::RowStore;

/// Configuration for the Google Sheets store
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// OAuth bearer token (from SHEETS_ACCESS_TOKEN env var)
    pub access_token: String,
    /// Spreadsheet id (from SHEETS_SPREADSHEET_ID env var)
    pub spreadsheet_id: String,
    /// Worksheet (tab) name
    pub worksheet: String,
    /// Base URL, overridable for tests
    pub base_url: String,
}

impl SheetsConfig {
    /// Create config from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;
        let access_token = std::env::var("SHEETS_ACCESS_TOKEN")
            .context("SHEETS_ACCESS_TOKEN environment variable not set")?;
        let spreadsheet_id = std::env::var("SHEETS_SPREADSHEET_ID")
            .context("SHEETS_SPREADSHEET_ID environment variable not set")?;
        let worksheet =
            std::env::var("SHEETS_WORKSHEET").unwrap_or_else(|_| "品質チェック".to_string());

        Ok(Self {
            access_token,
            spreadsheet_id,
            worksheet,
            base_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
        })
    }
}

/// Google Sheets values-API client.
///
/// Row layout: column A holds the formatted transcript, column B the source
/// file name, and the audit headers occupy the remaining columns. A row is
/// pending when it has a transcript but its summary cell is still empty.
pub struct SheetsClient {
    client: Client,
    config: SheetsConfig,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.config.base_url, self.config.spreadsheet_id, suffix
        )
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(&format!("{}!{}", self.config.worksheet, range));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| CheckError::Store(format!("sheet read failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckError::Store(format!(
                "sheet read error: {} - {}",
                status, body
            )));
        }

        let payload: ValueRange = response
            .json()
            .await
            .map_err(|e| CheckError::Store(format!("malformed sheet response: {}", e)))?;
        Ok(payload.values)
    }
}

#[async_trait]
impl RowStore for SheetsClient {
    async fn header_row(&self) -> Result<Vec<String>> {
        let mut rows = self.get_range("1:1").await?;
        if rows.is_empty() {
            return Err(CheckError::Store("worksheet has no header row".to_string()));
        }
        Ok(rows.remove(0))
    }

    async fn read_pending(&self, max_rows: usize) -> Result<Vec<PendingRow>> {
        let headers = self.header_row().await?;
        let header_map = build_header_map(&headers);
        let summary_col = header_map.get(HEADER_SUMMARY).copied();

        let rows = self.get_range("A2:ZZ").await?;
        let mut pending = Vec::new();

        for (offset, row) in rows.iter().enumerate() {
            if pending.len() >= max_rows {
                break;
            }
            let transcript = row.first().map(String::as_str).unwrap_or("");
            if transcript.trim().is_empty() {
                continue;
            }
            // Already audited rows have their summary cell filled
            if let Some(col) = summary_col {
                if row.get(col - 1).is_some_and(|v| !v.trim().is_empty()) {
                    continue;
                }
            }
            let row_index = offset + 2;
            let source = row
                .get(1)
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| format!("行 {}", row_index));
            pending.push(PendingRow {
                row_index,
                transcript: transcript.to_string(),
                source,
            });
        }

        Ok(pending)
    }

    async fn write_batch(
        &self,
        header_map: &HashMap<String, usize>,
        updates: &[CellUpdate],
    ) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let data: Vec<ValueRangeEntry> = updates
            .iter()
            .filter_map(|update| {
                // Headers the sheet does not have are dropped silently
                let col = header_map.get(update.header.as_str())?;
                Some(ValueRangeEntry {
                    range: format!(
                        "{}!{}{}",
                        self.config.worksheet,
                        column_letter(*col),
                        update.row_index
                    ),
                    values: vec![vec![update.value.clone()]],
                })
            })
            .collect();

        if data.is_empty() {
            return Ok(());
        }

        let body = BatchUpdateRequest {
            value_input_option: "RAW".to_string(),
            data,
        };

        let url = format!(
            "{}/{}/values:batchUpdate",
            self.config.base_url, self.config.spreadsheet_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CheckError::Store(format!("sheet write failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckError::Store(format!(
                "sheet write error: {} - {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn append_transcript(&self, transcript: &str, source: &str) -> Result<()> {
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.values_url(&format!("{}!A:B", self.config.worksheet))
        );
        let body = AppendRequest {
            values: vec![vec![transcript.to_string(), source.to_string()]],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CheckError::Store(format!("sheet append failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckError::Store(format!(
                "sheet append error: {} - {}",
                status, body
            )));
        }
        Ok(())
    }
}

/// Map trimmed, non-empty header names to 1-based column positions
pub fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.trim().is_empty())
        .map(|(i, h)| (h.trim().to_string(), i + 1))
        .collect()
}

/// Convert a 1-based column index to its A1 letter form
pub fn column_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ValueRangeEntry {
    range: String,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct BatchUpdateRequest {
    #[serde(rename = "valueInputOption")]
    value_input_option: String,
    data: Vec<ValueRangeEntry>,
}

#[derive(Debug, Serialize)]
struct AppendRequest {
    values: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(53), "BA");
    }

    #[test]
    fn test_build_header_map_skips_blanks() {
        let headers = vec![
            "転写".to_string(),
            " ".to_string(),
            "報告まとめ".to_string(),
        ];
        let map = build_header_map(&headers);
        assert_eq!(map.get("転写"), Some(&1));
        assert_eq!(map.get("報告まとめ"), Some(&3));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_build_header_map_trims_names() {
        let headers = vec![" ロングコール ".to_string()];
        let map = build_header_map(&headers);
        assert_eq!(map.get("ロングコール"), Some(&1));
    }
}
