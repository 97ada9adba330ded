//! Forgiving rewrites for almost-JSON model output.
//!
//! Applied once, only after a strict parse has failed. There is no repeated
//! heuristic loop: if the single repair pass does not yield valid JSON the
//! candidate is discarded.

/// Apply the full repair pass: single-quote conversion, then trailing commas.
pub fn repair_json(input: &str) -> String {
    let converted = convert_single_quotes(input);
    strip_trailing_commas(&converted)
}

/// Remove commas that directly precede `}` or `]` (ignoring whitespace).
///
/// Commas inside string literals are left alone.
pub fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut result = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            result.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                result.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    result.push(c);
                }
            }
            _ => result.push(c),
        }
    }

    result
}

/// Convert single-quoted JSON to double-quoted JSON.
///
/// Only applies when single quotes are used consistently as the string
/// delimiter, i.e. the text contains no double quotes at all. Mixed input is
/// returned unchanged.
pub fn convert_single_quotes(input: &str) -> String {
    if input.contains('"') || !input.contains('\'') {
        return input.to_string();
    }
    input.replace('\'', "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_commas() {
        assert_eq!(strip_trailing_commas(r#"{"a": 1,}"#), r#"{"a": 1}"#);
        assert_eq!(strip_trailing_commas("[1, 2,\n  ]"), "[1, 2\n  ]");
    }

    #[test]
    fn keeps_commas_inside_strings() {
        let input = r#"{"text": "a,}", "b": [1,],}"#;
        assert_eq!(strip_trailing_commas(input), r#"{"text": "a,}", "b": [1]}"#);
    }

    #[test]
    fn handles_escaped_quotes() {
        let input = r#"{"text": "say \",]\"",}"#;
        assert_eq!(strip_trailing_commas(input), r#"{"text": "say \",]\""}"#);
    }

    #[test]
    fn converts_consistent_single_quotes() {
        assert_eq!(
            convert_single_quotes("{'steps': []}"),
            r#"{"steps": []}"#
        );
    }

    #[test]
    fn leaves_mixed_quotes_alone() {
        let input = r#"{"reasoning": "it's fine"}"#;
        assert_eq!(convert_single_quotes(input), input);
    }

    #[test]
    fn full_repair_pass() {
        let repaired = repair_json("{'steps': [{'tool': 'read_file',},],}");
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["steps"][0]["tool"], "read_file");
    }
}
