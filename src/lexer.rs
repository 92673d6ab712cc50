use crate::token::{lookup_ident, Token, TokenKind};
use std::iter::Peekable;
use std::str::Chars;
use tracing::trace;

/// Streaming tokenizer over a source string. Each call to [`Lexer::next_token`]
/// yields the next token; once the input is exhausted it returns `Eof` forever.
///
/// Lexical errors are never fatal: unrecognized characters come back as
/// `Illegal` tokens for the parser to reject.
#[derive(Debug)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.chars.next() {
            Some(v) => v,
            None => return Token::eof(),
        };

        let token = match c {
            '=' => {
                if self.peek_match('=') {
                    let _ = self.chars.next();
                    Token::new(TokenKind::Eq, "==")
                } else {
                    Token::new(TokenKind::Assign, "=")
                }
            }
            '!' => {
                if self.peek_match('=') {
                    let _ = self.chars.next();
                    Token::new(TokenKind::NotEq, "!=")
                } else {
                    Token::new(TokenKind::Bang, "!")
                }
            }
            '+' => Token::new(TokenKind::Plus, "+"),
            '-' => Token::new(TokenKind::Minus, "-"),
            '*' => Token::new(TokenKind::Asterisk, "*"),
            '/' => Token::new(TokenKind::Slash, "/"),
            '<' => Token::new(TokenKind::Lt, "<"),
            '>' => Token::new(TokenKind::Gt, ">"),
            ',' => Token::new(TokenKind::Comma, ","),
            ';' => Token::new(TokenKind::Semicolon, ";"),
            ':' => Token::new(TokenKind::Colon, ":"),
            '(' => Token::new(TokenKind::LParen, "("),
            ')' => Token::new(TokenKind::RParen, ")"),
            '{' => Token::new(TokenKind::LBrace, "{"),
            '}' => Token::new(TokenKind::RBrace, "}"),
            '[' => Token::new(TokenKind::LBracket, "["),
            ']' => Token::new(TokenKind::RBracket, "]"),
            '"' => Token::new(TokenKind::Str, self.consume_string()),
            c if is_letter(c) => {
                let literal = self.consume_identifier(c);
                Token::new(lookup_ident(&literal), literal)
            }
            c if is_digit(c) => Token::new(TokenKind::Int, self.consume_number(c)),
            c => Token::new(TokenKind::Illegal, c.to_string()),
        };
        trace!(?token.kind, token.literal = token.literal.as_str());
        token
    }

    fn peek_match(&mut self, val: char) -> bool {
        matches!(self.chars.peek(), Some(v) if *v == val)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            let _ = self.chars.next();
        }
    }

    // No escape processing: everything up to the closing quote is taken
    // verbatim. An unterminated string runs to the end of the input.
    fn consume_string(&mut self) -> String {
        let mut content = String::new();
        while let Some(v) = self.chars.peek() {
            if *v == '"' {
                break;
            }
            // Guarded by the peek above.
            content.push(self.chars.next().unwrap());
        }
        // Consume the closing double-quote, if any.
        let _ = self.chars.next();
        content
    }

    fn consume_identifier(&mut self, first_char: char) -> String {
        let mut content = String::from(first_char);
        while matches!(self.chars.peek(), Some(v) if is_letter(*v)) {
            content.push(self.chars.next().unwrap());
        }
        content
    }

    fn consume_number(&mut self, first_char: char) -> String {
        let mut content = String::from(first_char);
        while matches!(self.chars.peek(), Some(v) if is_digit(*v)) {
            content.push(self.chars.next().unwrap());
        }
        content
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}
