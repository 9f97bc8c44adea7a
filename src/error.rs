//! Error and diagnostic types for directive scripts

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::{Rich, RichPattern, RichReason};
use thiserror::Error;

use crate::directive::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A failed parse of an embedded expression (`foreach (...)`, `$item['field']`, ...)
#[derive(Error, Debug, Clone, PartialEq)]
#[error("expression error at {span:?}: {message}")]
pub struct ExpressionError {
    pub span: Span,
    pub message: String,
    pub expected: Vec<String>,
}

impl ExpressionError {
    /// Shift the span by `offset` bytes, turning a line-relative error into a
    /// template-relative one
    pub fn offset(mut self, offset: usize) -> Self {
        self.span = self.span.start + offset..self.span.end + offset;
        self
    }

    /// Message including the expected alternatives, if any
    pub fn describe(&self) -> String {
        if self.expected.is_empty() {
            self.message.clone()
        } else {
            format!("{} (expected {})", self.message, self.expected.join(", "))
        }
    }
}

impl<'a> From<Rich<'a, Token>> for ExpressionError {
    fn from(err: Rich<'a, Token>) -> Self {
        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("unexpected {}", format_token(tok)),
                None => "unexpected end of line".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of line".to_string()),
                RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                RichPattern::Any => Some("any token".to_string()),
                RichPattern::SomethingElse => None,
            })
            .collect();

        ExpressionError {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Foreach => "keyword 'foreach'".to_string(),
        Token::As => "keyword 'as'".to_string(),
        Token::FatArrow => "'=>'".to_string(),
        Token::Arrow => "'->'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::Variable(name) => format!("variable '${}'", name),
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Str(s) => format!("string '{}'", s),
        Token::Int(n) => format!("number {}", n),
    }
}

/// Category of a directive-script finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A loop declaration whose `foreach (...)` clause cannot be read
    MalformedForeach,
    /// A loop with no `$x = $this->_component['name']` line to source its data
    MissingContextBinding,
    /// A loop declaration with no following `|after` line
    UnterminatedLoop,
    /// A second loop declaration; only the first one is expanded
    IgnoredLoop,
    /// An `@alias` token that no alias line defines
    UndefinedAlias,
    /// A rule or anchor selector the selector engine rejects
    InvalidSelector,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MalformedForeach => write!(f, "malformed-foreach"),
            DiagnosticKind::MissingContextBinding => write!(f, "missing-context"),
            DiagnosticKind::UnterminatedLoop => write!(f, "unterminated-loop"),
            DiagnosticKind::IgnoredLoop => write!(f, "ignored-loop"),
            DiagnosticKind::UndefinedAlias => write!(f, "undefined-alias"),
            DiagnosticKind::InvalidSelector => write!(f, "invalid-selector"),
        }
    }
}

/// A non-fatal finding about a directive script
///
/// Diagnostics never change render output; they explain why a loop rendered nothing.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    /// Format the diagnostic with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Warning, filename, self.span.start)
            .with_message(format!("[{}] {}", self.kind, self.message))
            .with_label(
                Label::new((filename, self.span.clone()))
                    .with_message(&self.message)
                    .with_color(Color::Yellow),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
