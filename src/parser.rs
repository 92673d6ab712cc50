use crate::ast::{
    BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use thiserror::Error;
use tracing::{debug, instrument};

/// A syntax error collected during a parse pass. The message formats are part
/// of the compatibility surface and must not change.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected next token to be {expected}, got {got} instead")]
    UnexpectedToken {
        expected: TokenKind,
        got: TokenKind,
    },

    #[error("no prefix parse function for {0} found")]
    NoPrefixParseFn(TokenKind),

    #[error("could not parse {literal} as integer")]
    InvalidInteger { literal: String },
}

/// Binding power, low to high. Ties bind left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,      // ==
    LessGreater, // > or <
    Sum,         // +
    Product,     // *
    Prefix,      // -x or !x
    Call,        // myFunction(x)
    Index,       // myArray[x]
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Slash | TokenKind::Asterisk => Precedence::Product,
        TokenKind::LParen => Precedence::Call,
        TokenKind::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

fn infix_operator_of(kind: TokenKind) -> Option<InfixOperator> {
    let operator = match kind {
        TokenKind::Plus => InfixOperator::Plus,
        TokenKind::Minus => InfixOperator::Minus,
        TokenKind::Asterisk => InfixOperator::Asterisk,
        TokenKind::Slash => InfixOperator::Slash,
        TokenKind::Lt => InfixOperator::Lt,
        TokenKind::Gt => InfixOperator::Gt,
        TokenKind::Eq => InfixOperator::Eq,
        TokenKind::NotEq => InfixOperator::NotEq,
        _ => return None,
    };
    Some(operator)
}

/// Parses a whole source unit, collecting every syntax error in one pass.
///
/// The returned [`Program`] is best-effort: callers must not evaluate it when
/// the error list is non-empty.
#[instrument(skip(source))]
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    debug!(
        statements = program.statements.len(),
        errors = parser.errors.len(),
        "finished parsing"
    );
    (program, parser.errors)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    token: Token,
    peek: Token,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(mut lexer: Lexer<'a>) -> Self {
        let token = lexer.next_token();
        let peek = lexer.next_token();
        Parser {
            lexer,
            token,
            peek,
            errors: Vec::new(),
        }
    }

    fn next_token(&mut self) {
        self.token = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn current_token_is(&self, kind: TokenKind) -> bool {
        self.token.kind == kind
    }

    fn peek_token_is(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek.kind)
    }

    fn current_precedence(&self) -> Precedence {
        precedence_of(self.token.kind)
    }

    // Advances past a mandatory token, or records an error and leaves the
    // parser where it is so the caller can bail out of the construct.
    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_token_is(kind) {
            self.next_token();
            true
        } else {
            self.errors.push(ParseError::UnexpectedToken {
                expected: kind,
                got: self.peek.kind,
            });
            false
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while self.token.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }
        Program { statements }
    }

    // A failed construct yields None; its errors are already recorded and the
    // outer loop advances token-by-token to the next viable statement start.
    fn parse_statement(&mut self) -> Option<Statement> {
        match self.token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.token.literal.clone();

        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Statement::Expression(expression))
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let mut left = self.parse_prefix()?;

        while !self.peek_token_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            left = match self.peek.kind {
                TokenKind::LParen => {
                    self.next_token();
                    self.parse_call_expression(left)?
                }
                TokenKind::LBracket => {
                    self.next_token();
                    self.parse_index_expression(left)?
                }
                kind => match infix_operator_of(kind) {
                    Some(operator) => {
                        self.next_token();
                        self.parse_infix_expression(left, operator)?
                    }
                    None => return Some(left),
                },
            };
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        match self.token.kind {
            TokenKind::Ident => Some(Expression::Identifier(self.token.literal.clone())),
            TokenKind::Int => self.parse_integer_literal(),
            TokenKind::Str => Some(Expression::StringLiteral(self.token.literal.clone())),
            TokenKind::True => Some(Expression::Boolean(true)),
            TokenKind::False => Some(Expression::Boolean(false)),
            TokenKind::Bang => self.parse_prefix_expression(PrefixOperator::Bang),
            TokenKind::Minus => self.parse_prefix_expression(PrefixOperator::Minus),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Function => self.parse_function_literal(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            kind => {
                self.errors.push(ParseError::NoPrefixParseFn(kind));
                None
            }
        }
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.token.literal.parse::<i64>() {
            Ok(value) => Some(Expression::IntegerLiteral(value)),
            Err(_) => {
                self.errors.push(ParseError::InvalidInteger {
                    literal: self.token.literal.clone(),
                });
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self, operator: PrefixOperator) -> Option<Expression> {
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(
        &mut self,
        left: Expression,
        operator: InfixOperator,
    ) -> Option<Expression> {
        let precedence = self.current_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expression)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();

        let condition = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block_statement();

        let alternative = if self.peek_token_is(TokenKind::Else) {
            self.next_token();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(self.parse_block_statement())
        } else {
            None
        };

        Some(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_block_statement(&mut self) -> BlockStatement {
        let mut statements = Vec::new();
        self.next_token();
        while !self.current_token_is(TokenKind::RBrace) && !self.current_token_is(TokenKind::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }
        BlockStatement { statements }
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let parameters = self.parse_function_parameters()?;

        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement();

        Some(Expression::FunctionLiteral { parameters, body })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<String>> {
        let mut identifiers = Vec::new();
        if self.peek_token_is(TokenKind::RParen) {
            self.next_token();
            return Some(identifiers);
        }
        self.next_token();
        identifiers.push(self.token.literal.clone());

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            identifiers.push(self.token.literal.clone());
        }

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(identifiers)
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expression::ArrayLiteral(elements))
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut expressions = Vec::new();
        if self.peek_token_is(end) {
            self.next_token();
            return Some(expressions);
        }
        self.next_token();
        expressions.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            expressions.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(expressions)
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        let mut pairs = Vec::new();

        while !self.peek_token_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;

            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;

            pairs.push((key, value));

            if !self.peek_token_is(TokenKind::RBrace) && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }

        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expression::HashLiteral(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};

    fn parse_program(source: &str) -> Result<Program> {
        let (program, errors) = parse(source);
        if !errors.is_empty() {
            bail!("parser errors: {:?}", errors);
        }
        Ok(program)
    }

    fn parse_single_expression(source: &str) -> Result<Expression> {
        let program = parse_program(source)?;
        if program.statements.len() != 1 {
            bail!("expected 1 statement, got {:?}", program.statements);
        }
        match program.statements.into_iter().next() {
            Some(Statement::Expression(expression)) => Ok(expression),
            other => bail!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_can_parse_let_statements() -> Result<()> {
        let cases = [
            ("let x = 5;", "x", "5"),
            ("let y = true;", "y", "true"),
            ("let foobar = y;", "foobar", "y"),
        ];
        for (source, want_name, want_value) in cases {
            let program = parse_program(source)?;
            assert_eq!(program.statements.len(), 1);
            match &program.statements[0] {
                Statement::Let { name, value } => {
                    assert_eq!(name, want_name);
                    assert_eq!(value.to_string(), want_value);
                }
                other => bail!("expected let statement, got {:?}", other),
            }
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_return_statements() -> Result<()> {
        let cases = [
            ("return 5;", "5"),
            ("return true;", "true"),
            ("return foobar;", "foobar"),
        ];
        for (source, want_value) in cases {
            let program = parse_program(source)?;
            assert_eq!(program.statements.len(), 1);
            match &program.statements[0] {
                Statement::Return(value) => assert_eq!(value.to_string(), want_value),
                other => bail!("expected return statement, got {:?}", other),
            }
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_identifier_expression() -> Result<()> {
        let expression = parse_single_expression("foobar;")?;
        assert_eq!(
            expression,
            Expression::Identifier("foobar".to_owned())
        );
        Ok(())
    }

    #[test]
    fn test_can_parse_integer_literal() -> Result<()> {
        let expression = parse_single_expression("5;")?;
        assert_eq!(expression, Expression::IntegerLiteral(5));
        Ok(())
    }

    #[test]
    fn test_can_parse_string_literal() -> Result<()> {
        let expression = parse_single_expression(r#""hello world";"#)?;
        assert_eq!(
            expression,
            Expression::StringLiteral("hello world".to_owned())
        );
        Ok(())
    }

    #[test]
    fn test_can_parse_boolean_literals() -> Result<()> {
        assert_eq!(parse_single_expression("true;")?, Expression::Boolean(true));
        assert_eq!(
            parse_single_expression("false;")?,
            Expression::Boolean(false)
        );
        Ok(())
    }

    #[test]
    fn test_can_parse_prefix_expressions() -> Result<()> {
        let cases = [
            ("!5;", "(!5)"),
            ("-15;", "(-15)"),
            ("!true;", "(!true)"),
            ("!false;", "(!false)"),
        ];
        for (source, want) in cases {
            assert_eq!(parse_single_expression(source)?.to_string(), want);
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_infix_expressions() -> Result<()> {
        let cases = [
            ("5 + 5;", "(5 + 5)"),
            ("5 - 5;", "(5 - 5)"),
            ("5 * 5;", "(5 * 5)"),
            ("5 / 5;", "(5 / 5)"),
            ("5 > 5;", "(5 > 5)"),
            ("5 < 5;", "(5 < 5)"),
            ("5 == 5;", "(5 == 5)"),
            ("5 != 5;", "(5 != 5)"),
            ("true == true", "(true == true)"),
            ("true != false", "(true != false)"),
        ];
        for (source, want) in cases {
            assert_eq!(parse_single_expression(source)?.to_string(), want);
        }
        Ok(())
    }

    #[test]
    fn test_operator_precedence() -> Result<()> {
        let cases = [
            ("-a * b", "((-a) * b)"),
            ("!-a", "(!(-a))"),
            ("a + b + c", "((a + b) + c)"),
            ("a + b - c", "((a + b) - c)"),
            ("a * b * c", "((a * b) * c)"),
            ("a * b / c", "((a * b) / c)"),
            ("a + b / c", "(a + (b / c))"),
            ("a + b * c + d / e - f", "(((a + (b * c)) + (d / e)) - f)"),
            ("3 + 4; -5 * 5", "(3 + 4)((-5) * 5)"),
            ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4))"),
            ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4))"),
            ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))"),
            ("true", "true"),
            ("false", "false"),
            ("3 > 5 == false", "((3 > 5) == false)"),
            ("3 < 5 == true", "((3 < 5) == true)"),
            ("1 + (2 + 3) + 4", "((1 + (2 + 3)) + 4)"),
            ("(5 + 5) * 2", "((5 + 5) * 2)"),
            ("2 / (5 + 5)", "(2 / (5 + 5))"),
            ("-(5 + 5)", "(-(5 + 5))"),
            ("!(true == true)", "(!(true == true))"),
            ("a + add(b * c) + d", "((a + add((b * c))) + d)"),
            (
                "add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))",
                "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)))",
            ),
            ("add(a + b + c * d / f + g)", "add((((a + b) + ((c * d) / f)) + g))"),
            (
                "a * [1, 2, 3, 4][b * c] * d",
                "((a * ([1, 2, 3, 4][(b * c)])) * d)",
            ),
            (
                "add(a * b[2], b[1], 2 * [1, 2][1])",
                "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])))",
            ),
        ];
        for (source, want) in cases {
            let program = parse_program(source)?;
            assert_eq!(program.to_string(), want, "source {:?}", source);
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_if_expression() -> Result<()> {
        let expression = parse_single_expression("if (x < y) { x }")?;
        match expression {
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                assert_eq!(condition.to_string(), "(x < y)");
                assert_eq!(consequence.to_string(), "x");
                assert!(alternative.is_none());
            }
            other => bail!("expected if expression, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_if_else_expression() -> Result<()> {
        let expression = parse_single_expression("if (x < y) { x } else { y }")?;
        match expression {
            Expression::If { alternative, .. } => {
                let alternative = match alternative {
                    Some(v) => v,
                    None => bail!("expected alternative block"),
                };
                assert_eq!(alternative.to_string(), "y");
            }
            other => bail!("expected if expression, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_function_literal() -> Result<()> {
        let expression = parse_single_expression("fn(x, y) { x + y; }")?;
        match expression {
            Expression::FunctionLiteral { parameters, body } => {
                assert_eq!(parameters, vec!["x".to_owned(), "y".to_owned()]);
                assert_eq!(body.to_string(), "(x + y)");
            }
            other => bail!("expected function literal, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_function_parameters() -> Result<()> {
        let cases: [(&str, &[&str]); 3] = [
            ("fn() {};", &[]),
            ("fn(x) {};", &["x"]),
            ("fn(x, y, z) {};", &["x", "y", "z"]),
        ];
        for (source, want) in cases {
            match parse_single_expression(source)? {
                Expression::FunctionLiteral { parameters, .. } => {
                    assert_eq!(parameters, want);
                }
                other => bail!("expected function literal, got {:?}", other),
            }
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_call_expression() -> Result<()> {
        let expression = parse_single_expression("add(1, 2 * 3, 4 + 5);")?;
        match expression {
            Expression::Call {
                function,
                arguments,
            } => {
                assert_eq!(function.to_string(), "add");
                let arguments: Vec<String> =
                    arguments.iter().map(|a| a.to_string()).collect();
                assert_eq!(arguments, vec!["1", "(2 * 3)", "(4 + 5)"]);
            }
            other => bail!("expected call expression, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_array_literal() -> Result<()> {
        let expression = parse_single_expression("[1, 2 * 2, 3 + 3]")?;
        assert_eq!(expression.to_string(), "[1, (2 * 2), (3 + 3)]");
        Ok(())
    }

    #[test]
    fn test_can_parse_empty_array_literal() -> Result<()> {
        let expression = parse_single_expression("[]")?;
        assert_eq!(expression, Expression::ArrayLiteral(Vec::new()));
        Ok(())
    }

    #[test]
    fn test_can_parse_index_expression() -> Result<()> {
        let expression = parse_single_expression("myArray[1 + 1]")?;
        assert_eq!(expression.to_string(), "(myArray[(1 + 1)])");
        Ok(())
    }

    #[test]
    fn test_can_parse_hash_literal_with_string_keys() -> Result<()> {
        let expression = parse_single_expression(r#"{"one": 1, "two": 2, "three": 3}"#)?;
        match expression {
            Expression::HashLiteral(pairs) => {
                let rendered: Vec<(String, String)> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                assert_eq!(
                    rendered,
                    vec![
                        ("one".to_owned(), "1".to_owned()),
                        ("two".to_owned(), "2".to_owned()),
                        ("three".to_owned(), "3".to_owned()),
                    ]
                );
            }
            other => bail!("expected hash literal, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_can_parse_empty_hash_literal() -> Result<()> {
        let expression = parse_single_expression("{}")?;
        assert_eq!(expression, Expression::HashLiteral(Vec::new()));
        Ok(())
    }

    #[test]
    fn test_can_parse_hash_literal_with_expression_values() -> Result<()> {
        let expression =
            parse_single_expression(r#"{"one": 0 + 1, "two": 10 - 8, "three": 15 / 5}"#)?;
        assert_eq!(
            expression.to_string(),
            "{one:(0 + 1), two:(10 - 8), three:(15 / 5)}"
        );
        Ok(())
    }

    #[test]
    fn test_syntax_errors_are_collected_in_one_pass() {
        let (_, errors) = parse("let x 5; let = 10; let 838383;");
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "expected next token to be =, got INT instead",
                "expected next token to be IDENT, got = instead",
                "no prefix parse function for = found",
                "expected next token to be IDENT, got INT instead",
            ]
        );
    }

    #[test]
    fn test_reserved_for_keyword_has_no_parse_rule() {
        let (_, errors) = parse("for");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "no prefix parse function for FOR found"
        );
    }

    #[test]
    fn test_illegal_token_is_rejected() {
        let (_, errors) = parse("@");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "no prefix parse function for ILLEGAL found"
        );
    }
}
