use std::fmt;

use serde_json::Value;

use crate::errors::{JmesPathError, Result};

/// Closed set of token kinds produced by the [`Lexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    UnquotedIdentifier,
    QuotedIdentifier,
    Literal,
    Rbracket,
    Rparen,
    Comma,
    Rbrace,
    Number,
    Current,
    Expref,
    Colon,
    Pipe,
    Or,
    And,
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
    Ne,
    Flatten,
    Star,
    Filter,
    Dot,
    Not,
    Lbrace,
    Lbracket,
    Lparen,
}

impl TokenKind {
    /// Pratt binding power; higher binds tighter.
    pub fn binding_power(self) -> u8 {
        use TokenKind::*;
        match self {
            Eof | UnquotedIdentifier | QuotedIdentifier | Literal | Rbracket | Rparen | Comma
            | Rbrace | Number | Current | Expref | Colon => 0,
            Pipe => 1,
            Or => 2,
            And => 3,
            Eq | Gt | Lt | Gte | Lte | Ne => 5,
            Flatten => 9,
            Star => 10,
            Filter => 21,
            Dot => 40,
            Not => 45,
            Lbrace => 50,
            Lbracket => 55,
            Lparen => 60,
        }
    }

    pub fn as_str(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "eof",
            UnquotedIdentifier => "unquoted_identifier",
            QuotedIdentifier => "quoted_identifier",
            Literal => "literal",
            Rbracket => "rbracket",
            Rparen => "rparen",
            Comma => "comma",
            Rbrace => "rbrace",
            Number => "number",
            Current => "current",
            Expref => "expref",
            Colon => "colon",
            Pipe => "pipe",
            Or => "or",
            And => "and",
            Eq => "eq",
            Gt => "gt",
            Lt => "lt",
            Gte => "gte",
            Lte => "lte",
            Ne => "ne",
            Flatten => "flatten",
            Star => "star",
            Filter => "filter",
            Dot => "dot",
            Not => "not",
            Lbrace => "lbrace",
            Lbracket => "lbracket",
            Lparen => "lparen",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Value,
    pub start: usize,
    pub end: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<Value>, start: usize, end: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            start,
            end,
        }
    }

    /// Token value as shown in error messages: strings unquoted, anything
    /// else as compact JSON.
    pub fn display_value(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Lazily tokenizes an expression. Yields exactly one `Eof` token at the end,
/// and nothing after the first error.
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    finished: bool,
}

/// Start tokenizing `expression`.
pub fn tokenize(expression: &str) -> Result<Lexer> {
    if expression.trim().is_empty() {
        return Err(JmesPathError::EmptyExpression);
    }
    Ok(Lexer {
        chars: expression.chars().collect(),
        position: 0,
        finished: false,
    })
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if !matches!(&token, Ok(t) if t.kind != TokenKind::Eof) {
            self.finished = true;
        }
        Some(token)
    }
}

impl Lexer {
    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn rest_from(&self, start: usize) -> String {
        self.chars[start..].iter().collect()
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            let start = self.position;
            let Some(ch) = self.current_char() else {
                let len = self.chars.len();
                return Ok(Token::new(TokenKind::Eof, "", len, len));
            };

            if let Some(kind) = simple_token(ch) {
                self.advance();
                return Ok(Token::new(kind, ch.to_string(), start, start + 1));
            }
            if is_identifier_start(ch) {
                let ident = self.read_identifier();
                return Ok(Token::new(
                    TokenKind::UnquotedIdentifier,
                    ident,
                    start,
                    self.position,
                ));
            }
            if matches!(ch, ' ' | '\t' | '\n' | '\r') {
                self.advance();
                continue;
            }

            return match ch {
                '[' => Ok(self.consume_square_bracket()),
                '\'' => self.consume_raw_string_literal(),
                '|' => Ok(self.match_or_else('|', TokenKind::Or, TokenKind::Pipe)),
                '&' => Ok(self.match_or_else('&', TokenKind::And, TokenKind::Expref)),
                '`' => self.consume_literal(),
                '0'..='9' => self.consume_number(start),
                '-' => self.consume_negative_number(),
                '"' => self.consume_quoted_identifier(),
                '<' => Ok(self.match_or_else('=', TokenKind::Lte, TokenKind::Lt)),
                '>' => Ok(self.match_or_else('=', TokenKind::Gte, TokenKind::Gt)),
                '!' => Ok(self.match_or_else('=', TokenKind::Ne, TokenKind::Not)),
                '=' => self.consume_equal_sign(),
                other => Err(lexer_error(start, other.to_string())),
            };
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    fn consume_square_bracket(&mut self) -> Token {
        let start = self.position;
        self.advance();
        match self.current_char() {
            Some(']') => {
                self.advance();
                Token::new(TokenKind::Flatten, "[]", start, start + 2)
            }
            Some('?') => {
                self.advance();
                Token::new(TokenKind::Filter, "[?", start, start + 2)
            }
            _ => Token::new(TokenKind::Lbracket, "[", start, start + 1),
        }
    }

    /// Two-character operator if the next char is `expected`, otherwise the
    /// single-character form. The mismatched char is left for the next token.
    fn match_or_else(&mut self, expected: char, matched: TokenKind, otherwise: TokenKind) -> Token {
        let start = self.position;
        let first = self.chars[start];
        self.advance();
        if self.current_char() == Some(expected) {
            self.advance();
            Token::new(matched, format!("{first}{expected}"), start, start + 2)
        } else {
            Token::new(otherwise, first.to_string(), start, start + 1)
        }
    }

    fn consume_number(&mut self, start: usize) -> Result<Token> {
        let digits = self.read_digits();
        let text = if start < self.position && self.chars[start] == '-' {
            format!("-{digits}")
        } else {
            digits
        };
        let number = text
            .parse::<i64>()
            .map_err(|_| lexer_error(start, text.clone()))?;
        Ok(Token::new(TokenKind::Number, number, start, self.position))
    }

    fn consume_negative_number(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance();
        if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            return Err(lexer_error(start, "-".to_string()));
        }
        self.consume_number(start)
    }

    fn consume_equal_sign(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance();
        if self.current_char() == Some('=') {
            self.advance();
            Ok(Token::new(TokenKind::Eq, "==", start, start + 2))
        } else {
            Err(lexer_error(start, "=".to_string()))
        }
    }

    /// Consume a delimited run, keeping backslash escapes verbatim (a
    /// backslash always takes the following char with it).
    fn consume_until(&mut self, delimiter: char) -> Result<String> {
        let start = self.position;
        let mut buff = String::new();
        self.advance();
        loop {
            match self.current_char() {
                None => return Err(lexer_error(start, self.rest_from(start))),
                Some(c) if c == delimiter => break,
                Some('\\') => {
                    buff.push('\\');
                    self.advance();
                    match self.current_char() {
                        None => return Err(lexer_error(start, self.rest_from(start))),
                        Some(c) => {
                            buff.push(c);
                            self.advance();
                        }
                    }
                }
                Some(c) => {
                    buff.push(c);
                    self.advance();
                }
            }
        }
        self.advance();
        Ok(buff)
    }

    fn consume_literal(&mut self) -> Result<Token> {
        let start = self.position;
        let lexeme = self.consume_until('`')?.replace("\\`", "`");
        let parsed: Value =
            serde_json::from_str(&lexeme).map_err(|_| lexer_error(start, lexeme.clone()))?;
        Ok(Token::new(TokenKind::Literal, parsed, start, self.position))
    }

    fn consume_raw_string_literal(&mut self) -> Result<Token> {
        let start = self.position;
        let lexeme = self.consume_until('\'')?.replace("\\'", "'");
        Ok(Token::new(TokenKind::Literal, lexeme, start, self.position))
    }

    fn consume_quoted_identifier(&mut self) -> Result<Token> {
        let start = self.position;
        let lexeme = format!("\"{}\"", self.consume_until('"')?);
        let name: String =
            serde_json::from_str(&lexeme).map_err(|_| lexer_error(start, lexeme.clone()))?;
        Ok(Token::new(
            TokenKind::QuotedIdentifier,
            name,
            start,
            self.position,
        ))
    }
}

fn simple_token(ch: char) -> Option<TokenKind> {
    Some(match ch {
        '.' => TokenKind::Dot,
        '*' => TokenKind::Star,
        ':' => TokenKind::Colon,
        ']' => TokenKind::Rbracket,
        ',' => TokenKind::Comma,
        '@' => TokenKind::Current,
        '(' => TokenKind::Lparen,
        ')' => TokenKind::Rparen,
        '{' => TokenKind::Lbrace,
        '}' => TokenKind::Rbrace,
        _ => return None,
    })
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn lexer_error(position: usize, value: String) -> JmesPathError {
    JmesPathError::Lexer {
        position,
        value,
        expression: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kinds(expression: &str) -> Vec<TokenKind> {
        tokenize(expression)
            .unwrap()
            .map(|t| t.unwrap().kind)
            .collect()
    }

    #[test]
    fn simple_and_compound_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("foo.bar[*] | baz || @ && &x"),
            vec![
                UnquotedIdentifier,
                Dot,
                UnquotedIdentifier,
                Lbracket,
                Star,
                Rbracket,
                Pipe,
                UnquotedIdentifier,
                Or,
                Current,
                And,
                Expref,
                UnquotedIdentifier,
                Eof
            ]
        );
        assert_eq!(kinds("a[]"), vec![UnquotedIdentifier, Flatten, Eof]);
        assert_eq!(kinds("[?a<=b]"), vec![Filter, UnquotedIdentifier, Lte, UnquotedIdentifier, Rbracket, Eof]);
        assert_eq!(kinds("!a != b"), vec![Not, UnquotedIdentifier, Ne, UnquotedIdentifier, Eof]);
    }

    #[test]
    fn eof_sits_at_expression_length() {
        let tokens: Vec<Token> = tokenize("ab").unwrap().map(|t| t.unwrap()).collect();
        let eof = tokens.last().unwrap();
        assert_eq!((eof.kind, eof.start, eof.end), (TokenKind::Eof, 2, 2));
    }

    #[test]
    fn numbers_and_literals() {
        let tokens: Vec<Token> = tokenize("[-12] `{\"a\": [1.5]}` 'it\\'s' \"q\\\"d\"")
            .unwrap()
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].value, json!(-12));
        assert_eq!(tokens[3].value, json!({"a": [1.5]}));
        assert_eq!(tokens[4].kind, TokenKind::Literal);
        assert_eq!(tokens[4].value, json!("it's"));
        assert_eq!(tokens[5].kind, TokenKind::QuotedIdentifier);
        assert_eq!(tokens[5].value, json!("q\"d"));
    }

    #[test]
    fn escaped_backtick_inside_literal() {
        let token = tokenize("`\"a\\`b\"`").unwrap().next().unwrap().unwrap();
        assert_eq!(token.value, json!("a`b"));
    }

    fn first_error(expression: &str) -> JmesPathError {
        tokenize(expression)
            .unwrap()
            .find_map(|t| t.err())
            .expect("expected a lexer error")
    }

    #[test]
    fn lexer_errors_carry_position_and_value() {
        assert_eq!(
            first_error("foo[#]"),
            JmesPathError::Lexer { position: 4, value: "#".into(), expression: None }
        );
        assert_eq!(
            first_error("\"foo"),
            JmesPathError::Lexer { position: 0, value: "\"foo".into(), expression: None }
        );
        assert!(matches!(first_error("a = b"), JmesPathError::Lexer { position: 2, .. }));
        assert!(matches!(first_error("[-]"), JmesPathError::Lexer { position: 1, .. }));
        assert!(matches!(first_error("`{bad`"), JmesPathError::Lexer { position: 0, .. }));
    }

    #[test]
    fn lexer_stops_after_error() {
        let mut lexer = tokenize("# a").unwrap();
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn empty_expression_is_rejected() {
        assert!(matches!(tokenize("   "), Err(JmesPathError::EmptyExpression)));
    }
}
