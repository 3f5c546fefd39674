//! The tokenizer: turns a line of SpockDSL source into a flat token stream.
//!
//! Hand-rolled `char`-predicate scanning rather than a regex crate. One
//! pass, no backtracking, and no lexical errors: every word on a line
//! classifies into exactly one `TokenKind`, so `tokenize_line` returns a
//! plain `Vec<Token>` rather than a `Result`. Malformed *shapes* (a
//! statement with the wrong number of tokens, an unbalanced macro) are a
//! parser concern, not a tokenizer one.

use std::fmt;

/// A lexical token, with the 1-based line and column it started on.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// `@name` — a declaration.
    Declaration(String),
    /// `$name` — a reference to a prior declaration.
    MagicVar(String),
    /// `_` on its own — a discarded operand.
    Placeholder,
    /// One of the five macro-structure keywords, matched case-insensitively.
    Keyword(Keyword),
    /// A signed decimal literal, optionally fractional (`3`, `-2.5`, `0.5`).
    Literal(f64),
    /// Anything else: a verb name, a theory/session/macro name, or an
    /// auto-concept name.
    Identifier(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Theory,
    Verb,
    Session,
    Begin,
    End,
}

impl Keyword {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "theory" => Some(Self::Theory),
            "verb" => Some(Self::Verb),
            "session" => Some(Self::Session),
            "begin" => Some(Self::Begin),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Theory => "theory",
            Self::Verb => "verb",
            Self::Session => "session",
            Self::Begin => "begin",
            Self::End => "end",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declaration(n) => write!(f, "@{n}"),
            Self::MagicVar(n) => write!(f, "${n}"),
            Self::Placeholder => write!(f, "_"),
            Self::Keyword(k) => write!(f, "{k}"),
            Self::Literal(n) => write!(f, "{n}"),
            Self::Identifier(n) => write!(f, "{n}"),
        }
    }
}

/// Scans a single line of source into tokens. Comments begin with `#` and
/// run to end of line; blank/comment-only lines yield an empty `Vec`.
#[must_use]
pub fn tokenize_line(line: &str, line_no: usize) -> Vec<Token> {
    let stripped = match line.split_once('#') {
        Some((before, _)) => before,
        None => line,
    };

    let mut tokens = Vec::new();
    let mut column = 1usize;
    let mut chars = stripped.char_indices().peekable();

    while let Some(&(byte_offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            column += 1;
            continue;
        }

        let start_col = column;
        let start_byte = byte_offset;
        let mut end_byte = start_byte;
        while let Some(&(b, c)) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            end_byte = b + c.len_utf8();
            chars.next();
            column += 1;
        }
        let word = &stripped[start_byte..end_byte];
        tokens.push(Token { kind: classify(word), line: line_no, column: start_col });
    }

    tokens
}

fn classify(word: &str) -> TokenKind {
    if let Some(name) = word.strip_prefix('@') {
        return TokenKind::Declaration(name.to_string());
    }
    if let Some(name) = word.strip_prefix('$') {
        return TokenKind::MagicVar(name.to_string());
    }
    if word == "_" {
        return TokenKind::Placeholder;
    }
    if let Some(keyword) = Keyword::parse(word) {
        return TokenKind::Keyword(keyword);
    }
    if let Some(value) = parse_decimal(word) {
        return TokenKind::Literal(value);
    }
    TokenKind::Identifier(word.to_string())
}

/// A signed decimal with an optional fractional part: `-?[0-9]+(\.[0-9]+)?`.
/// No exponent notation — SpockDSL literals are plain decimals.
fn parse_decimal(word: &str) -> Option<f64> {
    let body = word.strip_prefix('-').unwrap_or(word);
    if body.is_empty() {
        return None;
    }
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = frac_part
        && (frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    word.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<TokenKind> {
        tokenize_line(line, 1).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_a_four_token_statement() {
        let kinds = kinds("@r socrates Bind human");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Declaration("r".into()),
                TokenKind::Identifier("socrates".into()),
                TokenKind::Identifier("Bind".into()),
                TokenKind::Identifier("human".into()),
            ]
        );
    }

    #[test]
    fn scans_negative_and_fractional_numbers() {
        assert_eq!(kinds("-2.5 3"), vec![TokenKind::Literal(-2.5), TokenKind::Literal(3.0)]);
    }

    #[test]
    fn comment_is_stripped_to_end_of_line() {
        assert!(kinds("# full comment").is_empty());
        assert_eq!(kinds("@r a Bind b # trailing").len(), 4);
    }

    #[test]
    fn scans_macro_header_keywords_case_insensitively() {
        let kinds = kinds("@Physics THEORY Begin");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Declaration("Physics".into()),
                TokenKind::Keyword(Keyword::Theory),
                TokenKind::Keyword(Keyword::Begin),
            ]
        );
    }

    #[test]
    fn scans_magic_var_and_placeholder() {
        assert_eq!(kinds("$a _"), vec![TokenKind::MagicVar("a".into()), TokenKind::Placeholder]);
    }

    #[test]
    fn a_word_that_is_not_a_valid_decimal_is_an_identifier() {
        assert_eq!(kinds("3.4.5"), vec![TokenKind::Identifier("3.4.5".into())]);
    }
}
