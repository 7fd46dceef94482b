//! 从生成服务的自由文本回复中提取第一个合法的 JSON 信封
//!
//! 回复可能带有说明文字、```json 代码块或多个 JSON 片段，不能假设整个回复就是干净的 JSON。
//! 依次尝试：各个 ```json 代码块 → 文本中每个 `{` 起始处的第一个完整 JSON 值。

use serde::de::DeserializeOwned;
use serde_json::Value;

fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("```json") {
        let after = &rest[start + 7..];
        match after.find("```") {
            Some(end) => {
                blocks.push(after[..end].trim());
                rest = &after[end + 3..];
            }
            None => {
                blocks.push(after.trim());
                break;
            }
        }
    }
    blocks
}

/// 以 `text` 开头的第一个 JSON 值（忽略其后的任何内容）
fn leading_value(text: &str) -> Option<Result<Value, serde_json::Error>> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()
}

/// 提取并解码第一个能解码为 `T` 的 JSON 对象；失败时返回原因
pub fn extract_first<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let mut last_error: Option<String> = None;

    let fenced = fenced_blocks(text);
    let starts = text.char_indices().filter(|(_, c)| *c == '{').map(|(i, _)| i);
    let candidates = fenced
        .into_iter()
        .chain(starts.map(|i| &text[i..]));

    for candidate in candidates {
        match leading_value(candidate) {
            Some(Ok(value @ Value::Object(_))) => match serde_json::from_value::<T>(value) {
                Ok(decoded) => return Ok(decoded),
                Err(e) => last_error = Some(e.to_string()),
            },
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                if last_error.is_none() {
                    last_error = Some(e.to_string());
                }
            }
            None => {}
        }
    }

    Err(last_error.unwrap_or_else(|| "response contains no JSON object".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Envelope {
        sections: Vec<Value>,
    }

    #[test]
    fn test_clean_json() {
        let e: Envelope = extract_first(r#"{"sections": [1]}"#).unwrap();
        assert_eq!(e.sections.len(), 1);
    }

    #[test]
    fn test_prose_around_json() {
        let text = "Sure! Here is your page:\n{\"sections\": [{\"type\": \"hero\"}]}\nLet me know if you need changes {like this}.";
        let e: Envelope = extract_first(text).unwrap();
        assert_eq!(e.sections.len(), 1);
    }

    #[test]
    fn test_fenced_block_wins() {
        let text = "```json\n{\"sections\": [1, 2]}\n```\nand also {\"sections\": []}";
        let e: Envelope = extract_first(text).unwrap();
        assert_eq!(e.sections.len(), 2);
    }

    #[test]
    fn test_skips_objects_that_do_not_match() {
        let text = r#"{"note": "draft"} then {"sections": [3]}"#;
        let e: Envelope = extract_first(text).unwrap();
        assert_eq!(e.sections, vec![Value::from(3)]);
    }

    #[test]
    fn test_nothing_usable() {
        let err = extract_first::<Envelope>("I cannot help with that.").unwrap_err();
        assert!(err.contains("no JSON"));
        assert!(extract_first::<Envelope>("{\"sections\": [").is_err());
    }
}
