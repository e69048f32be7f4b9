//! Lexer for the configuration template language using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r]+")]
pub enum Token {
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,

    // Toggles are only recognised at end of line, so newlines are significant
    #[token("\n")]
    Newline,

    #[token("none")]
    Null,

    #[regex(r"[0-9]+", |lex| lex.slice().to_string(), priority = 3)]
    Digits(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    Quoted(String),

    #[regex(r"[A-Za-z0-9_./:%@!$&~*+,;<=>?()|\[\]^-]+", |lex| lex.slice().to_string(), priority = 1)]
    Word(String),

    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
}

/// Strip the surrounding quotes and resolve backslash escapes
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lex input into tokens with spans, stopping at the first invalid byte range
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, Span> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(t) => Ok((t, span)),
            Err(()) => Err(span),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input)
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_words_and_digits() {
        assert_eq!(
            tokens("address 10.0.0.1 port 80"),
            vec![
                Token::Word("address".to_string()),
                Token::Word("10.0.0.1".to_string()),
                Token::Word("port".to_string()),
                Token::Digits("80".to_string()),
            ]
        );
    }

    #[test]
    fn test_none_keyword() {
        assert_eq!(
            tokens("none nonexistent"),
            vec![Token::Null, Token::Word("nonexistent".to_string())]
        );
    }

    #[test]
    fn test_quoted_string_unescaped() {
        assert_eq!(
            tokens(r#"description "say \"hi\"""#),
            vec![
                Token::Word("description".to_string()),
                Token::Quoted("say \"hi\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_newlines_are_tokens() {
        assert_eq!(
            tokens("a {\n}\n"),
            vec![
                Token::Word("a".to_string()),
                Token::BraceOpen,
                Token::Newline,
                Token::BraceClose,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens("a 1 # trailing\n# whole line\nb"),
            vec![
                Token::Word("a".to_string()),
                Token::Digits("1".to_string()),
                Token::Newline,
                Token::Newline,
                Token::Word("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_placeholders_and_paths() {
        assert_eq!(
            tokens("ltm node $key /Common/a%2 ospf:any"),
            vec![
                Token::Word("ltm".to_string()),
                Token::Word("node".to_string()),
                Token::Word("$key".to_string()),
                Token::Word("/Common/a%2".to_string()),
                Token::Word("ospf:any".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_character_reported() {
        let err = lex("a 'b'").unwrap_err();
        assert_eq!(err, 2..3);
    }
}
