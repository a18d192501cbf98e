//! Command line words to host values for `metronome warn`
//!
//! `12` is an integer, `1.5` a float, `nil` nothing, and `[a,[b,c]]` a nested list.
//! Anything else, including unbalanced brackets, is kept as text.

use metronome_scripting_host::HostValue;

pub fn parse_value(word: &str) -> HostValue {
    let trimmed = word.trim();

    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        if let Some(items) = split_top_level(inner) {
            return HostValue::Array(items.into_iter().map(parse_value).collect());
        }
        return HostValue::Str(word.to_string());
    }

    if trimmed == "nil" {
        return HostValue::Nil;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return HostValue::Int(n);
    }
    match trimmed.parse::<f64>() {
        Ok(x) if x.is_finite() => HostValue::Float(x),
        _ => HostValue::Str(word.to_string()),
    }
}

/// Split on commas outside nested brackets; `None` if the brackets don't balance
fn split_top_level(list: &str) -> Option<Vec<&str>> {
    if list.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                items.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    items.push(&list[start..]);
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(parse_value("42"), HostValue::Int(42));
        assert_eq!(parse_value("-7"), HostValue::Int(-7));
        assert_eq!(parse_value("0.5"), HostValue::Float(0.5));
        assert_eq!(parse_value("nil"), HostValue::Nil);
        assert_eq!(parse_value("hello"), HostValue::from("hello"));
        assert_eq!(parse_value("inf"), HostValue::from("inf"));
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            parse_value("[a,[b, 2],3.5]"),
            HostValue::Array(vec![
                HostValue::from("a"),
                HostValue::Array(vec![HostValue::from("b"), HostValue::Int(2)]),
                HostValue::Float(3.5),
            ])
        );
        assert_eq!(parse_value("[]"), HostValue::Array(Vec::new()));
    }

    #[test]
    fn test_unbalanced_brackets_stay_text() {
        assert_eq!(parse_value("[a,[b]"), HostValue::from("[a,[b]"));
        assert_eq!(parse_value("[a]]"), HostValue::from("[a]]"));
    }
}
