//! Template grammar implemented with chumsky
//!
//! ```text
//! document  := NL* (key top_tail NL*)* EOI
//! top_tail  := set | group | scalar EOL | key top_tail | EOL
//! group     := '{' NL* (key entry_tail NL*)* '}'
//! entry_tail:= set | group | scalar | EOL
//! set       := '{' token+ '}'          (single line, no `none`)
//! ```

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::GrammarParseError;
use crate::parser::lexer::{self, Token};
use crate::parser::value::{Map, MapStyle, Value};

/// Parse template source into an ordered nested mapping
pub fn parse(input: &str) -> Result<Map, GrammarParseError> {
    let len = input.len();

    let tokens = lexer::lex(input).map_err(|span| GrammarParseError::invalid_token(input, span))?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| match errs.into_iter().next() {
            Some(err) => GrammarParseError::from_rich(err, input),
            None => GrammarParseError {
                text: input.to_string(),
                span: 0..len,
                message: "Invalid template".to_string(),
                expected: Vec::new(),
            },
        })
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Map, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let newlines = just(Token::Newline).repeated();

    let key = select! {
        Token::Word(s) => s,
        Token::Quoted(s) => s,
        Token::Digits(s) => s,
    }
    .labelled("key");

    let scalar = select! {
        Token::Null => Value::None,
        Token::Digits(s) => Value::from_digits(s),
        Token::Word(s) => Value::from_word(s),
        Token::Quoted(s) => Value::Str(s),
    }
    .labelled("value");

    // Newline tokens are not set members, so a set never spans lines
    let set = key
        .clone()
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
        .map(Value::Set);

    let group = recursive(|group| {
        // Inside braces a toggle may also be closed by the brace itself
        let line_end = just(Token::Newline)
            .ignored()
            .or(just(Token::BraceClose).ignored())
            .rewind();

        let entry_tail = choice((
            set.clone(),
            group.map(Value::Map),
            scalar.clone(),
            line_end.to(Value::Toggle),
        ));

        key.clone()
            .then(entry_tail)
            .then_ignore(newlines.clone())
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(
                just(Token::BraceOpen).then(newlines.clone()),
                just(Token::BraceClose),
            )
            .map(|entries| {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.merge_entry(k, v);
                }
                map
            })
            .boxed()
    });

    let end_of_line = just(Token::Newline).ignored().or(end()).rewind();

    let top_tail = recursive(|tail| {
        // Order matters: sets before groups, a scalar only when the line
        // ends after it, otherwise the word is the next key of a chain.
        choice((
            set.clone(),
            group.clone().map(Value::Map),
            scalar.clone().then_ignore(end_of_line.clone()),
            key.clone().then(tail).map(|(k, v)| {
                let mut chain = Map::with_style(MapStyle::Chained);
                chain.insert(k, v);
                Value::Map(chain)
            }),
            end_of_line.clone().to(Value::Toggle),
        ))
        .boxed()
    });

    key.then(top_tail)
        .then_ignore(newlines.clone())
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(newlines, end())
        .map(|entries| {
            let mut doc = Map::new();
            for (k, v) in entries {
                doc.merge_entry(k, v);
            }
            doc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map<const N: usize>(entries: [(&str, Value); N]) -> Map {
        entries.into_iter().collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse("").expect("Should parse"), Map::new());
        assert_eq!(parse("\n\n  # only a comment\n").expect("Should parse"), Map::new());
    }

    #[test]
    fn test_inline_group() {
        let doc = parse("a { b 1 c none }").expect("Should parse");
        let expected = map([(
            "a",
            Value::Map(map([("b", Value::Int(1)), ("c", Value::None)])),
        )]);
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_toggle_at_end_of_line() {
        assert_eq!(
            parse("flag\n").expect("Should parse"),
            map([("flag", Value::Toggle)])
        );
        assert_eq!(
            parse("flag value\n").expect("Should parse"),
            map([("flag", Value::from("value"))])
        );
    }

    #[test]
    fn test_toggle_inside_group() {
        let doc = parse("allow {\n    default\n    tcp:22\n}\n").expect("Should parse");
        let expected = map([(
            "allow",
            Value::Map(map([("default", Value::Toggle), ("tcp:22", Value::Toggle)])),
        )]);
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_inline_set() {
        let doc = parse("sys dns {\n    name-servers { 10.0.0.2 10.0.0.3 }\n}").expect("Should parse");
        let dns = doc.get("sys").and_then(Value::as_map).and_then(|m| m.get("dns"));
        let servers = dns.and_then(Value::as_map).and_then(|m| m.get("name-servers"));
        assert_eq!(servers, Some(&Value::set(["10.0.0.2", "10.0.0.3"])));
    }

    #[test]
    fn test_chained_keys_equal_nested() {
        let chained = parse("a b { c 1 }").expect("Should parse");
        let nested = parse("a { b { c 1 } }").expect("Should parse");
        assert_eq!(chained, nested);
        let a = chained.get("a").and_then(Value::as_map).unwrap();
        assert_eq!(a.style(), MapStyle::Chained);
    }

    #[test]
    fn test_chains_merge_on_shared_prefix() {
        let doc = parse("ltm virtual $key {}\nltm virtual-address $key_va {}\n").expect("Should parse");
        assert_eq!(doc.len(), 1);
        let ltm = doc.get("ltm").and_then(Value::as_map).unwrap();
        assert_eq!(ltm.keys().collect::<Vec<_>>(), vec!["virtual", "virtual-address"]);
    }

    #[test]
    fn test_chain_ending_in_value() {
        let doc = parse("shell write partition $name\n").expect("Should parse");
        let mut cursor = &doc;
        for key in ["shell", "write"] {
            cursor = cursor.get(key).and_then(Value::as_map).unwrap();
        }
        assert_eq!(cursor.get("partition"), Some(&Value::from("$name")));
    }

    #[test]
    fn test_bare_top_level_key_is_toggle() {
        let doc = parse("stp\nsave\n").expect("Should parse");
        assert_eq!(doc, map([("stp", Value::Toggle), ("save", Value::Toggle)]));
    }

    #[test]
    fn test_scalars() {
        let doc = parse("x {\n    n 42\n    t true\n    q \"two words\"\n    w 10.1.1.1\n}")
            .expect("Should parse");
        let x = doc.get("x").and_then(Value::as_map).unwrap();
        assert_eq!(x.get("n"), Some(&Value::Int(42)));
        assert_eq!(x.get("t"), Some(&Value::Bool(true)));
        assert_eq!(x.get("q"), Some(&Value::from("two words")));
        assert_eq!(x.get("w"), Some(&Value::from("10.1.1.1")));
    }

    #[test]
    fn test_quoted_key() {
        let doc = parse("\"spaced key\" {\n    a value\n}").expect("Should parse");
        assert!(doc.contains_key("spaced key"));
    }

    #[test]
    fn test_key_order_is_first_seen() {
        let doc = parse("z 1\na 2\nm 3\n").expect("Should parse");
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_unbalanced_brace_is_error() {
        let err = parse("a {\n    b 1\n").unwrap_err();
        assert_eq!(err.text, "a {\n    b 1\n");
        assert!(err.message.starts_with("Unexpected"));
    }

    #[test]
    fn test_deterministic() {
        let text = "sys folder $key {\n    inherited-devicegroup true\n}\n";
        assert_eq!(parse(text).unwrap(), parse(text).unwrap());
    }
}
