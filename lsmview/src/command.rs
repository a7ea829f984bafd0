//! Prompt commands: `set <key> <value>`, `get <key>`, `del <key>`.
//!
//! Parsing only picks the verb and splits the line. Whether the key and value
//! are acceptable is decided when the request is sent.

use crate::ws::proto::{Request, RequestKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Type a command: set <key> <value>, get <key>, del <key>")]
    Empty,
    #[error("Unknown command '{0}'")]
    UnknownVerb(String),
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

pub fn parse(line: &str) -> Result<Request, ParseError> {
    let (verb, rest) = split_word(line.trim());
    let kind = match verb.to_ascii_lowercase().as_str() {
        "" => return Err(ParseError::Empty),
        "set" | "put" => RequestKind::Set,
        "get" => RequestKind::Get,
        "del" | "delete" | "rm" => RequestKind::Delete,
        _ => return Err(ParseError::UnknownVerb(verb.to_string())),
    };
    let (key, rest) = split_word(rest);
    let value = match kind {
        RequestKind::Set if !rest.is_empty() => Some(rest.to_string()),
        _ => None,
    };
    Ok(Request {
        kind,
        key: key.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_keeps_inner_spaces() {
        assert_eq!(
            parse("set greeting hello  world ").unwrap(),
            Request::set("greeting", "hello  world")
        );
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(parse("GET a").unwrap(), Request::get("a"));
        assert_eq!(parse("  Del   a").unwrap(), Request::delete("a"));
        assert_eq!(parse("delete a").unwrap(), Request::delete("a"));
    }

    #[test]
    fn missing_parts_are_left_for_validation() {
        let req = parse("set a").unwrap();
        assert_eq!(req.kind, RequestKind::Set);
        assert_eq!(req.value, None);

        let req = parse("get").unwrap();
        assert_eq!(req.key, "");
    }

    #[test]
    fn get_ignores_trailing_words() {
        assert_eq!(parse("get a b c").unwrap(), Request::get("a"));
    }

    #[test]
    fn rejects_empty_and_unknown() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("flush"), Err(ParseError::UnknownVerb("flush".to_string())));
    }
}
