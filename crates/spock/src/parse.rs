//! The recursive-descent parser: turns tokenized lines into a [`Script`],
//! with SSA (single static assignment — every `@name` declared once per
//! enclosing macro body, not globally) and balanced `begin`/`end` checks
//! woven into the same walk that builds the AST, so a diagnostic always
//! carries the line it failed on.

use indexmap::IndexSet;

use crate::ast::{Macro, MacroKind, Operand, Script, Statement, TopLevel};
use crate::error::SpockError;
use crate::token::{Keyword, Token, TokenKind, tokenize_line};

/// Parses a full script's source text into a [`Script`].
pub fn parse(source: &str) -> Result<Script, SpockError> {
    let mut lines: Vec<Vec<Token>> = Vec::new();
    for (i, raw_line) in source.lines().enumerate() {
        let tokens = tokenize_line(raw_line, i + 1);
        if !tokens.is_empty() {
            lines.push(tokens);
        }
    }

    let mut parser = Parser::new(lines);
    parser.parse_script()
}

struct Parser {
    lines: Vec<Vec<Token>>,
    cursor: usize,
}

impl Parser {
    fn new(lines: Vec<Vec<Token>>) -> Self {
        Self { lines, cursor: 0 }
    }

    fn parse_script(&mut self) -> Result<Script, SpockError> {
        let mut items = Vec::new();
        let mut declared = IndexSet::new();
        while self.cursor < self.lines.len() {
            if self.peek_is_macro_header() {
                items.push(TopLevel::Macro(self.parse_macro()?));
            } else {
                items.push(TopLevel::Statement(self.parse_statement_line(&mut declared)?));
            }
        }
        Ok(Script { items })
    }

    fn peek_is_macro_header(&self) -> bool {
        let line = &self.lines[self.cursor];
        line.len() == 3
            && matches!(line[0].kind, TokenKind::Declaration(_))
            && matches!(
                line[1].kind,
                TokenKind::Keyword(Keyword::Theory) | TokenKind::Keyword(Keyword::Verb) | TokenKind::Keyword(Keyword::Session)
            )
            && line[2].kind == TokenKind::Keyword(Keyword::Begin)
    }

    fn peek_is_end_line(&self) -> bool {
        let line = &self.lines[self.cursor];
        line.len() == 1 && line[0].kind == TokenKind::Keyword(Keyword::End)
    }

    fn parse_macro(&mut self) -> Result<Macro, SpockError> {
        let header = self.lines[self.cursor].clone();
        let line_no = header[0].line;
        let TokenKind::Declaration(name) = header[0].kind.clone() else { unreachable!() };
        let kind = match header[1].kind {
            TokenKind::Keyword(Keyword::Theory) => MacroKind::Theory,
            TokenKind::Keyword(Keyword::Verb) => MacroKind::Verb,
            TokenKind::Keyword(Keyword::Session) => MacroKind::Session,
            _ => unreachable!(),
        };
        self.cursor += 1;

        let mut body = Vec::new();
        let mut macros = Vec::new();
        let mut declared = IndexSet::new();
        loop {
            if self.cursor >= self.lines.len() {
                return Err(SpockError::Parse {
                    message: format!("unterminated macro '@{name}'"),
                    line: line_no,
                    column: None,
                });
            }
            if self.peek_is_end_line() {
                self.cursor += 1;
                break;
            }
            if self.peek_is_macro_header() {
                macros.push(self.parse_macro()?);
            } else {
                body.push(self.parse_statement_line(&mut declared)?);
            }
        }

        if kind == MacroKind::Verb {
            let result_count = body.iter().filter(|s| s.declaration == "result").count();
            if result_count != 1 {
                return Err(SpockError::Parse {
                    message: format!(
                        "verb macro '@{name}' must declare '@result' exactly once, found {result_count}"
                    ),
                    line: line_no,
                    column: None,
                });
            }
        }

        Ok(Macro { name, kind, body, macros, line: line_no })
    }

    fn parse_statement_line(&mut self, declared: &mut IndexSet<String>) -> Result<Statement, SpockError> {
        let tokens = self.lines[self.cursor].clone();
        self.cursor += 1;
        parse_statement(tokens, declared)
    }
}

fn parse_statement(tokens: Vec<Token>, declared: &mut IndexSet<String>) -> Result<Statement, SpockError> {
    let line_no = tokens.first().map_or(0, |t| t.line);

    if tokens.len() != 4 {
        return Err(SpockError::Parse {
            message: format!("expected a 4-token statement '@name subject verb object', found {} tokens", tokens.len()),
            line: line_no,
            column: tokens.first().map(|t| t.column),
        });
    }

    let TokenKind::Declaration(declaration) = tokens[0].kind.clone() else {
        return Err(SpockError::Parse {
            message: format!("expected a declaration '@name', found '{}'", tokens[0].kind),
            line: line_no,
            column: Some(tokens[0].column),
        });
    };

    if !declared.insert(declaration.clone()) {
        return Err(SpockError::Parse {
            message: format!("'{declaration}' is already declared (single static assignment)"),
            line: line_no,
            column: None,
        });
    }

    let subject = parse_operand(&tokens[1], &declaration)?;

    let TokenKind::Identifier(verb) = tokens[2].kind.clone() else {
        return Err(SpockError::Parse {
            message: format!("expected a verb name, found '{}'", tokens[2].kind),
            line: line_no,
            column: Some(tokens[2].column),
        });
    };

    let object = parse_operand(&tokens[3], &declaration)?;

    Ok(Statement { declaration, subject, verb, object, line: line_no })
}

fn parse_operand(token: &Token, declaration: &str) -> Result<Operand, SpockError> {
    match &token.kind {
        TokenKind::MagicVar(name) => Ok(Operand::Reference(name.clone())),
        TokenKind::Identifier(name) => Ok(Operand::Identifier(name.clone())),
        TokenKind::Placeholder => Ok(Operand::Placeholder),
        TokenKind::Literal(value) => Ok(Operand::Literal(*value)),
        other => Err(SpockError::Parse {
            message: format!("declaration '@{declaration}' has an invalid operand '{other}'"),
            line: token.line,
            column: Some(token.column),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_statement() {
        let script = parse("@r socrates Bind human\n").unwrap();
        assert_eq!(script.items.len(), 1);
    }

    #[test]
    fn rejects_duplicate_declaration() {
        let err = parse("@r a Bind b\n@r c Bind d\n").unwrap_err();
        assert!(matches!(err, SpockError::Parse { .. }));
    }

    #[test]
    fn parses_macro_block() {
        let source = "@Velocity verb begin\n@result Bind a b\nend\n";
        let script = parse(source).unwrap();
        assert_eq!(script.macros().len(), 1);
        assert_eq!(script.macros()[0].body.len(), 1);
    }

    #[test]
    fn unterminated_macro_is_parse_error() {
        let source = "@Velocity verb begin\n@result Bind a b\n";
        assert!(parse(source).is_err());
    }

    #[test]
    fn verb_macro_without_result_is_parse_error() {
        let source = "@Velocity verb begin\n@x Bind a b\nend\n";
        assert!(parse(source).is_err());
    }

    #[test]
    fn verb_macro_with_two_results_is_parse_error() {
        let source = "@Velocity verb begin\n@result Bind a b\n@result Bind c d\nend\n";
        assert!(parse(source).is_err());
    }

    #[test]
    fn ssa_is_scoped_per_macro_not_global() {
        let source = "@r a Bind b\n@Velocity verb begin\n@result Bind c d\nend\n@r2 x Bind y\n";
        assert!(parse(source).is_ok());
        let reused_name = "@shared a Bind b\n@Velocity verb begin\n@shared Bind c d\n@result Bind shared shared\nend\n";
        assert!(parse(reused_name).is_ok());
    }

    #[test]
    fn nested_macros_parse_and_flatten() {
        let source = "@Outer theory begin\n@Inner verb begin\n@result Bind a b\nend\nend\n";
        let script = parse(source).unwrap();
        assert_eq!(script.macros().len(), 1);
        assert_eq!(script.macros()[0].macros.len(), 1);
        assert_eq!(script.statements().len(), 1);
    }

    #[test]
    fn parses_literal_operand() {
        let script = parse("@n 5 HasNumericValue 5\n").unwrap();
        let TopLevel::Statement(stmt) = &script.items[0] else { panic!("expected statement") };
        assert_eq!(stmt.subject, Operand::Literal(5.0));
    }
}
