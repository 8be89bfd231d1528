use crate::models::{record::criteria_headers, Roster};

/// Preamble of the rubric instruction (non-negotiable output contract)
const RUBRIC_PREAMBLE: &str = r#"あなたはテレアポ（電話営業）の会話記録を監査する品質チェック担当者です。
入力される会話記録は「[テレアポ担当者]」と「[顧客]」のラベル付きです。
以下のチェック項目のそれぞれについて、会話記録を根拠に判定してください。

ルール:
1. 出力は単一のJSONオブジェクトのみ。説明文やマークダウンは一切含めない。
2. 各チェック項目名をキーとし、値は「問題あり」または「問題なし」とする。
3. 「その他問題」のみ、該当があれば具体的な内容を自由記述してよい。該当がなければ「問題なし」とする。
4. 会話記録に根拠のない推測で「問題あり」としない。
5. 全ての項目を必ず出力する。

チェック項目:"#;

/// Build the rubric system instruction.
///
/// The criteria list is generated from the record schema so the prompt and
/// the projection step can never drift apart. A resolved checker name is
/// prefixed as context; the rubric call therefore always runs after name
/// resolution.
pub fn build_rubric_system_prompt(checker_name: &str) -> String {
    let mut prompt = String::new();

    if !checker_name.is_empty() {
        prompt.push_str(&format!(
            "この会話のテレアポ担当者は「{}」です。\n\n",
            checker_name
        ));
    }

    prompt.push_str(RUBRIC_PREAMBLE);
    prompt.push('\n');
    for header in criteria_headers() {
        prompt.push_str(&format!("- {}\n", header));
    }
    prompt
}

/// Build the instruction for identifying which roster member is speaking
pub fn build_checker_name_prompt(roster: &Roster) -> String {
    format!(
        r#"以下の会話記録に登場するテレアポ担当者の名前を、次の候補リストから1人だけ選んでください。

候補: {}

ルール:
1. 候補リストに含まれる名前のみを回答する。
2. 回答は名前のみ。説明や敬称は付けない。
3. どの候補も会話に登場しない場合は何も出力しない。"#,
        roster.joined()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rubric_prompt_enumerates_every_criterion() {
        let prompt = build_rubric_system_prompt("");
        for header in criteria_headers() {
            assert!(prompt.contains(header), "missing criterion: {}", header);
        }
        assert!(!prompt.contains("テレアポ担当者は「"));
    }

    #[test]
    fn test_rubric_prompt_prefixes_checker_name() {
        let prompt = build_rubric_system_prompt("鈴木");
        assert!(prompt.starts_with("この会話のテレアポ担当者は「鈴木」です。"));
    }

    #[test]
    fn test_checker_name_prompt_lists_roster() {
        let roster = Roster::from_csv("鈴木,田中");
        let prompt = build_checker_name_prompt(&roster);
        assert!(prompt.contains("鈴木、田中"));
    }
}
