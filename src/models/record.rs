use serde::Serialize;

/// Verdict written when a criterion was violated
pub const VERDICT_ISSUE: &str = "問題あり";
/// Verdict written when a criterion was clean
pub const VERDICT_NO_ISSUE: &str = "問題なし";
/// Sentinel written into every field when a row's evaluation failed; lets
/// downstream consumers tell "failed" apart from "not yet evaluated" (empty)
pub const VERDICT_ERROR: &str = "処理エラー";

/// Header for the resolved agent name
pub const HEADER_CHECKER_NAME: &str = "テレアポ担当者名";
/// Header for the derived violation summary
pub const HEADER_SUMMARY: &str = "報告まとめ";
/// Header for the heuristic hung-up-on flag
pub const HEADER_HANGUP: &str = "ガチャ切りされた△";

/// Spreadsheet column headers, in sheet order.
///
/// This list is the single source of truth for the record schema: every
/// QualityRecord holds exactly one value per entry, and the rubric prompt
/// enumerates the criteria slice of it.
pub const HEADERS: [&str; 31] = [
    HEADER_CHECKER_NAME,
    HEADER_SUMMARY,
    HEADER_HANGUP,
    "社名や担当者名を名乗らない",
    "アプローチで販売店名、ソフト名の先出し",
    "同業他社の悪口等",
    "運転中や電車内でも無理やり続ける",
    "2回断られても食い下がる",
    "暴言・悪口・脅迫・逆上",
    "情報漏洩",
    "共犯（教唆・幇助）",
    "通話対応（無言電話／ガチャ切り）",
    "呼び方",
    "ロングコール",
    "当社の電話お断り",
    "しつこい・何度も電話がある",
    "お客様専用電話番号と言われる",
    "口調を注意された",
    "怒らせた",
    "暴言を受けた",
    "通報する",
    "営業お断り",
    "事務員に対して代表者のことを「社長」「オーナー」「代表」",
    "一人称が「僕」「自分」「俺」",
    "「弊社」のことを「うち」「僕ら」と言う",
    "謝罪が「すみません」「ごめんなさい」",
    "口調や態度が失礼",
    "会話が成り立っていない",
    "残債の「下取り」「買い取り」トーク",
    "嘘・真偽不明",
    "その他問題",
];

/// The compliance/manner criteria the model is asked to judge (everything
/// except the three locally-derived fields)
pub fn criteria_headers() -> &'static [&'static str] {
    &HEADERS[3..]
}

/// One evaluated call, with a verdict slot for every spreadsheet header.
///
/// The schema is closed: values are stored positionally against `HEADERS`, so
/// a record can never be missing a key or carry an unknown one, whichever
/// code path built it.
#[derive(Debug, Clone, Serialize)]
pub struct QualityRecord {
    values: Vec<String>,
}

impl QualityRecord {
    /// Record with every field unevaluated (empty string)
    pub fn empty() -> Self {
        Self {
            values: vec![String::new(); HEADERS.len()],
        }
    }

    /// Record substituted when a conversation is too short to evaluate
    pub fn no_conversation() -> Self {
        let mut record = Self::empty();
        record.set(HEADER_SUMMARY, "会話記録なし");
        record
    }

    /// Record substituted when a row's evaluation failed outright
    pub fn error_fallback(message: &str) -> Self {
        let mut record = Self::empty();
        for &header in criteria_headers() {
            record.set(header, VERDICT_ERROR);
        }
        record.set(HEADER_HANGUP, VERDICT_ERROR);
        record.set(HEADER_CHECKER_NAME, VERDICT_ERROR);
        record.set(HEADER_SUMMARY, format!("{}: {}", VERDICT_ERROR, message));
        record
    }

    fn index_of(header: &str) -> Option<usize> {
        HEADERS.iter().position(|h| *h == header)
    }

    pub fn get(&self, header: &str) -> &str {
        Self::index_of(header)
            .map(|i| self.values[i].as_str())
            .unwrap_or("")
    }

    /// Set a field by header name; values for headers outside the schema are
    /// dropped, which is how unknown keys in model output get discarded
    pub fn set(&mut self, header: &str, value: impl Into<String>) {
        if let Some(i) = Self::index_of(header) {
            self.values[i] = value.into();
        }
    }

    /// Iterate (header, value) pairs in sheet order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        HEADERS
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (*h, v.as_str()))
    }

    /// Derive the violation summary from the current verdicts.
    ///
    /// Collects criteria marked 問題あり in header order, reports the first
    /// five. The name, summary and hang-up fields never count as criteria.
    pub fn derive_summary(&self) -> String {
        let problems: Vec<&str> = criteria_headers()
            .iter()
            .copied()
            .filter(|&h| self.get(h) == VERDICT_ISSUE)
            .take(5)
            .collect();

        if problems.is_empty() {
            "特に問題は検出されませんでした".to_string()
        } else {
            format!("問題あり項目: {}", problems.join(", "))
        }
    }
}
