//! Lexer: tokenizes condition expressions
//!
//! Keywords (`AND`, `OR`, `NOT`, `true`, `false`, `null`) are matched case
//! insensitively. `&&`, `||` and `!` are accepted as symbolic aliases.
//! Identifiers may contain any Unicode letter, digit or underscore.

use crate::errors::{ConditionError, ConditionResult};

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw or unescaped text of the token
    pub text: String,
    /// Column of the first character (1-based)
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            col,
        }
    }
}

/// Token types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    And,
    Or,
    Not,
    True,
    False,
    Null,

    // Identifiers and literals
    Identifier,
    StringLiteral,
    NumberLiteral,

    // Comparison operators
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,

    // Structural
    Dot,
    Minus,
    OpenParen,
    CloseParen,

    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Not => write!(f, "NOT"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Null => write!(f, "null"),
            Self::Identifier => write!(f, "identifier"),
            Self::StringLiteral => write!(f, "string literal"),
            Self::NumberLiteral => write!(f, "number"),
            Self::Eq => write!(f, "=="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Dot => write!(f, "."),
            Self::Minus => write!(f, "-"),
            Self::OpenParen => write!(f, "("),
            Self::CloseParen => write!(f, ")"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer for condition expressions
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the entire input, ending with an `Eof` token
    pub fn tokenize(&mut self) -> ConditionResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.pos >= self.input.len() {
                tokens.push(Token::new(TokenKind::Eof, "", self.pos + 1));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> ConditionResult<Token> {
        let ch = self.input[self.pos];
        let col = self.pos + 1;

        match (ch, self.peek_at(1)) {
            ('=', Some('=')) => Ok(self.emit(TokenKind::Eq, "==", col)),
            ('!', Some('=')) => Ok(self.emit(TokenKind::Ne, "!=", col)),
            ('>', Some('=')) => Ok(self.emit(TokenKind::Ge, ">=", col)),
            ('<', Some('=')) => Ok(self.emit(TokenKind::Le, "<=", col)),
            ('&', Some('&')) => Ok(self.emit(TokenKind::And, "&&", col)),
            ('|', Some('|')) => Ok(self.emit(TokenKind::Or, "||", col)),
            ('>', _) => Ok(self.emit(TokenKind::Gt, ">", col)),
            ('<', _) => Ok(self.emit(TokenKind::Lt, "<", col)),
            ('!', _) => Ok(self.emit(TokenKind::Not, "!", col)),
            ('.', _) => Ok(self.emit(TokenKind::Dot, ".", col)),
            ('-', _) => Ok(self.emit(TokenKind::Minus, "-", col)),
            ('(', _) => Ok(self.emit(TokenKind::OpenParen, "(", col)),
            (')', _) => Ok(self.emit(TokenKind::CloseParen, ")", col)),
            ('"', _) | ('\'', _) => self.read_string_literal(ch),
            (c, _) if c.is_ascii_digit() => Ok(self.read_number()),
            (c, _) if c.is_alphabetic() || c == '_' => Ok(self.read_identifier_or_keyword()),
            ('=', _) => Err(ConditionError::Lex {
                col,
                message: "single '=' is not an operator, use '=='".into(),
            }),
            _ => Err(ConditionError::Lex {
                col,
                message: format!("unexpected character '{}'", ch),
            }),
        }
    }

    /// Consume an operator or punctuation token of `text.len()` characters
    fn emit(&mut self, kind: TokenKind, text: &str, col: usize) -> Token {
        self.pos += text.len();
        Token::new(kind, text, col)
    }

    fn read_string_literal(&mut self, quote: char) -> ConditionResult<Token> {
        let col = self.pos + 1;
        self.pos += 1; // opening quote

        let mut text = String::new();
        loop {
            match self.input.get(self.pos).copied() {
                None => {
                    return Err(ConditionError::Lex {
                        col,
                        message: "unterminated string literal".into(),
                    })
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => match self.peek_at(1) {
                    Some(escaped @ ('\\' | '"' | '\'')) => {
                        text.push(escaped);
                        self.pos += 2;
                    }
                    _ => {
                        text.push('\\');
                        self.pos += 1;
                    }
                },
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        Ok(Token::new(TokenKind::StringLiteral, text, col))
    }

    fn read_number(&mut self) -> Token {
        let col = self.pos + 1;
        let mut text = String::new();

        while let Some(c) = self.input.get(self.pos).copied().filter(char::is_ascii_digit) {
            text.push(c);
            self.pos += 1;
        }

        // A fraction needs a digit after the dot, otherwise the dot is a path separator
        if self.input.get(self.pos) == Some(&'.')
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            text.push('.');
            self.pos += 1;
            while let Some(c) = self.input.get(self.pos).copied().filter(char::is_ascii_digit) {
                text.push(c);
                self.pos += 1;
            }
        }

        Token::new(TokenKind::NumberLiteral, text, col)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let col = self.pos + 1;
        let mut text = String::new();

        while let Some(c) = self
            .input
            .get(self.pos)
            .copied()
            .filter(|c| c.is_alphanumeric() || *c == '_')
        {
            text.push(c);
            self.pos += 1;
        }

        let kind = match text.to_ascii_lowercase().as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Identifier,
        };

        Token::new(kind, text, col)
    }

    fn skip_whitespace(&mut self) {
        while self.input.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("== != > >= < <="),
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_any_case_and_aliases() {
        assert_eq!(
            kinds("and Or NOT && || ! TRUE false Null"),
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dotted_path() {
        let tokens = Lexer::new("entity.estimated_cost").tokenize().unwrap();
        assert_eq!(tokens[0].text, "entity");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].text, "estimated_cost");
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("10000 12.75").tokenize().unwrap();
        assert_eq!(tokens[0].text, "10000");
        assert_eq!(tokens[1].text, "12.75");
        assert_eq!(tokens[1].col, 7);
    }

    #[test]
    fn test_string_literals_both_quotes() {
        let tokens = Lexer::new(r#"'R&D' "it\"s""#).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "R&D");
        assert_eq!(tokens[1].text, "it\"s");
    }

    #[test]
    fn test_unicode_identifier() {
        let tokens = Lexer::new("form.金额 > 1").tokenize().unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].text, "金额");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Lexer::new("'open").tokenize(),
            Err(ConditionError::Lex { col: 1, .. })
        ));
        assert!(matches!(
            Lexer::new("a = 1").tokenize(),
            Err(ConditionError::Lex { col: 3, .. })
        ));
        assert!(Lexer::new("a # b").tokenize().is_err());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }
}
