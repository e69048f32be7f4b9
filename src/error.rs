//! Error types for template parsing, tree construction and compilation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::lexer::Token;
use crate::stamp::Kind;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Malformed template text. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("template parse error at {span:?}: {message}")]
pub struct GrammarParseError {
    /// The full text that failed to parse
    pub text: String,
    pub span: Span,
    pub message: String,
    pub expected: Vec<String>,
}

impl GrammarParseError {
    pub(crate) fn invalid_token(text: &str, span: Span) -> Self {
        let snippet = text.get(span.clone()).unwrap_or_default();
        Self {
            text: text.to_string(),
            message: format!("Unrecognized input '{}'", snippet),
            span,
            expected: Vec::new(),
        }
    }

    pub(crate) fn from_rich(err: chumsky::error::Rich<'_, Token>, text: &str) -> Self {
        use chumsky::error::{RichPattern, RichReason};

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("Unexpected {}", format_token(tok)),
                None => "Unexpected end of input".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of input".to_string()),
                RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                RichPattern::Any => Some("any token".to_string()),
                RichPattern::SomethingElse => None,
            })
            .collect();

        Self {
            text: text.to_string(),
            span: err.span().into_range(),
            message,
            expected,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, filename: &str) -> String {
        let expected_str = if self.expected.is_empty() {
            String::new()
        } else {
            format!("\nExpected: {}", self.expected.join(", "))
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, self.span.start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.clone()))
                    .with_message(format!("{}{}", self.message, expected_str))
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(self.text.as_str())), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::Newline => "end of line".to_string(),
        Token::Null => "keyword 'none'".to_string(),
        Token::Digits(s) => format!("number {}", s),
        Token::Quoted(s) => format!("string \"{}\"", s),
        Token::Word(s) => format!("word '{}'", s),
        Token::Comment => "comment".to_string(),
    }
}

/// Errors raised while building the folder tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("folder '{name}' already exists under '{parent}'")]
    DuplicateFolder { parent: String, name: String },

    #[error("stamp #{id} is already hooked to '{folder}'")]
    AlreadyHooked { id: usize, folder: String },

    #[error("no folder named '{path}'")]
    UnknownFolder { path: String },

    #[error("unknown stamp #{id}")]
    UnknownStamp { id: usize },
}

/// Errors raised while compiling a stamp
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Grammar(#[from] GrammarParseError),

    /// The stamp was compiled before being hooked to a folder
    #[error("{kind} compiled before being hooked to a folder")]
    MissingContext { kind: Kind },

    /// A referenced stamp failed to compile
    #[error("{kind} reference failed: {source}")]
    Reference {
        kind: Kind,
        #[source]
        source: Box<CompileError>,
    },

    #[error("{kind} has no reference key in this dialect")]
    NoReferenceKey { kind: Kind },

    #[error("{kind} template has no entry at '{path}'")]
    TemplateShape { kind: Kind, path: String },

    #[error("expected a {expected} reference, found {found}")]
    UnexpectedKind { expected: Kind, found: Kind },

    #[error("{kind} is part of a reference cycle")]
    ReferenceCycle { kind: Kind },

    #[error("unknown stamp #{id}")]
    UnknownStamp { id: usize },

    #[error("invalid address '{value}'")]
    InvalidAddress { value: String },

    #[error("failed to write rendered output")]
    Output(#[from] std::fmt::Error),
}
