use phf::phf_map;
use thiserror::Error;
use tracing::{trace, warn};

use crate::tokens::{Literal, Token, TokenType};

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "if" => TokenType::If,
    "else" => TokenType::Else,
    "for" => TokenType::For,
    "while" => TokenType::While,
    "break" => TokenType::Break,
    "continue" => TokenType::Continue,
    "return" => TokenType::Return,
    "eye" => TokenType::Eye,
    "zeros" => TokenType::Zeros,
    "ones" => TokenType::Ones,
    "print" => TokenType::Print,
};

/// Starts lexing `source`. Tokens are produced on demand as the returned
/// lexer is iterated.
pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer::new(source)
}

/// 1-based column of the byte at `offset`, in characters counted from the
/// last newline before it.
pub fn find_column(source: &str, offset: usize) -> usize {
    let bytes = &source.as_bytes()[..offset.min(source.len())];
    let line_start = bytes
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    // UTF-8 continuation bytes do not start a character.
    bytes[line_start..]
        .iter()
        .filter(|&&b| b & 0xC0 != 0x80)
        .count()
        + 1
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexerError {
    #[error("{line}: illegal character '{character}'")]
    IllegalCharacter {
        character: char,
        line: usize,
        col: usize,
    },
    #[error("{line}: integer literal '{lexeme}' is out of range")]
    IntegerOutOfRange {
        lexeme: String,
        line: usize,
        col: usize,
    },
}

impl LexerError {
    pub fn line(&self) -> usize {
        match self {
            Self::IllegalCharacter { line, .. } | Self::IntegerOutOfRange { line, .. } => *line,
        }
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    start: usize,
    current: usize,
    start_line: usize,
    line: usize,
    errors: Vec<LexerError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            input: source.as_bytes(),
            start: 0,
            current: 0,
            start_line: 1,
            line: 1,
            errors: Vec::new(),
        }
    }

    pub fn column(&self, offset: usize) -> usize {
        find_column(self.source, offset)
    }

    /// Errors reported so far. Each offending character was skipped.
    pub fn errors(&self) -> &[LexerError] {
        &self.errors
    }

    fn scan_token(&mut self) -> Option<Token> {
        let c = self.advance();
        match c {
            b' ' | b'\t' | b'\r' => None,
            b'\n' => {
                self.line += 1;
                None
            }
            b'#' => {
                while self.get_current() != b'\n' && !self.is_at_end() {
                    self.advance();
                }
                None
            }
            b'"' => self.string(),
            b'(' => self.make_token(TokenType::LeftParen),
            b')' => self.make_token(TokenType::RightParen),
            b'[' => self.make_token(TokenType::LeftBracket),
            b']' => self.make_token(TokenType::RightBracket),
            b'{' => self.make_token(TokenType::LeftBrace),
            b'}' => self.make_token(TokenType::RightBrace),
            b',' => self.make_token(TokenType::Comma),
            b';' => self.make_token(TokenType::Semicolon),
            b':' => self.make_token(TokenType::Colon),
            b'\'' => self.make_token(TokenType::Apostrophe),
            b'+' => self.with_assign(TokenType::AddAssign, TokenType::Plus),
            b'-' => self.with_assign(TokenType::SubAssign, TokenType::Minus),
            b'*' => self.with_assign(TokenType::MulAssign, TokenType::Times),
            b'/' => self.with_assign(TokenType::DivAssign, TokenType::Divide),
            b'=' => self.with_assign(TokenType::Equal, TokenType::Assign),
            b'<' => self.with_assign(TokenType::LessEqual, TokenType::Less),
            b'>' => self.with_assign(TokenType::GreaterEqual, TokenType::Greater),
            b'!' => {
                if self.match_char(b'=') {
                    self.make_token(TokenType::NotEqual)
                } else {
                    self.illegal_character()
                }
            }
            b'.' => {
                if self.get_current().is_ascii_digit() {
                    return self.number();
                }
                let token_type = match self.get_current() {
                    b'+' => TokenType::DotPlus,
                    b'-' => TokenType::DotMinus,
                    b'*' => TokenType::DotTimes,
                    b'/' => TokenType::DotDivide,
                    _ => return self.illegal_character(),
                };
                self.advance();
                self.make_token(token_type)
            }
            _ => {
                if c.is_ascii_digit() {
                    self.number()
                } else if c.is_ascii_alphabetic() || c == b'_' {
                    self.identifier()
                } else {
                    self.illegal_character()
                }
            }
        }
    }

    /// Picks `long` when the operator is followed by `=`.
    fn with_assign(&mut self, long: TokenType, short: TokenType) -> Option<Token> {
        if self.match_char(b'=') {
            self.make_token(long)
        } else {
            self.make_token(short)
        }
    }

    fn string(&mut self) -> Option<Token> {
        while !self.is_at_end() && self.get_current() != b'"' {
            if self.get_current() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            // Unterminated: only the opening quote is dropped, lexing resumes after it.
            self.current = self.start + 1;
            self.line = self.start_line;
            return self.illegal_character();
        }

        self.advance();
        let value = self.source[self.start + 1..self.current - 1].to_string();
        self.make_token_literal(TokenType::String, Literal::String(value))
    }

    fn identifier(&mut self) -> Option<Token> {
        while self.get_current().is_ascii_alphanumeric() || self.get_current() == b'_' {
            self.advance();
        }

        let text = self.get_text();
        if let Some(token_type) = KEYWORDS.get(text.as_str()).copied() {
            self.make_token(token_type)
        } else {
            self.make_token_literal(TokenType::Identifier, Literal::Identifier(text))
        }
    }

    fn number(&mut self) -> Option<Token> {
        let mut is_float = self.input[self.start] == b'.';

        while self.get_current().is_ascii_digit() {
            self.advance();
        }

        // `2.*x` is an integer followed by an elementwise operator.
        if !is_float
            && self.get_current() == b'.'
            && !matches!(self.get_next(), b'+' | b'-' | b'*' | b'/')
        {
            is_float = true;
            self.advance();
            while self.get_current().is_ascii_digit() {
                self.advance();
            }
        }

        if is_float && matches!(self.get_current(), b'e' | b'E') {
            let signed = matches!(self.get_next(), b'+' | b'-');
            let first_digit = if signed {
                self.peek_at(2)
            } else {
                self.get_next()
            };
            if first_digit.is_ascii_digit() {
                self.advance();
                if signed {
                    self.advance();
                }
                while self.get_current().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        let text = self.get_text();
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => self.make_token_literal(TokenType::Float, Literal::Float(value)),
                Err(_) => self.illegal_character(),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.make_token_literal(TokenType::Integer, Literal::Integer(value)),
                Err(_) => {
                    self.report(LexerError::IntegerOutOfRange {
                        lexeme: text,
                        line: self.start_line,
                        col: self.column(self.start),
                    });
                    None
                }
            }
        }
    }

    fn illegal_character(&mut self) -> Option<Token> {
        let character = self.source[self.start..].chars().next().unwrap_or('\0');
        self.current = self.start + character.len_utf8().max(1);
        self.report(LexerError::IllegalCharacter {
            character,
            line: self.start_line,
            col: self.column(self.start),
        });
        None
    }

    fn report(&mut self, error: LexerError) {
        warn!("{}", error);
        self.errors.push(error);
    }

    fn peek_at(&self, distance: usize) -> u8 {
        self.input
            .get(self.current + distance)
            .copied()
            .unwrap_or(b'\0')
    }

    fn get_next(&self) -> u8 {
        self.peek_at(1)
    }

    fn get_current(&self) -> u8 {
        self.peek_at(0)
    }

    fn match_char(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.get_current() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_token(&self, token_type: TokenType) -> Option<Token> {
        Some(Token::new(
            token_type,
            self.get_text(),
            None,
            self.start_line,
            self.start,
        ))
    }

    fn make_token_literal(&self, token_type: TokenType, literal: Literal) -> Option<Token> {
        Some(Token::new(
            token_type,
            self.get_text(),
            Some(literal),
            self.start_line,
            self.start,
        ))
    }

    fn get_text(&self) -> String {
        self.source[self.start..self.current].to_string()
    }

    fn advance(&mut self) -> u8 {
        self.current += 1;
        self.input[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.input.len()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            if let Some(token) = self.scan_token() {
                trace!(kind = ?token.token_type, lexeme = %token.lexeme, line = token.line, "token");
                return Some(token);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        tokenize(source).map(|token| token.token_type).collect()
    }

    #[test]
    fn reserved_words_are_keywords() {
        let words = [
            ("if", TokenType::If),
            ("else", TokenType::Else),
            ("for", TokenType::For),
            ("while", TokenType::While),
            ("break", TokenType::Break),
            ("continue", TokenType::Continue),
            ("return", TokenType::Return),
            ("eye", TokenType::Eye),
            ("zeros", TokenType::Zeros),
            ("ones", TokenType::Ones),
            ("print", TokenType::Print),
        ];
        for (word, expected) in words {
            assert_eq!(kinds(word), vec![expected], "keyword {}", word);
        }
        assert_eq!(kinds("iffy"), vec![TokenType::Identifier]);
    }

    #[test]
    fn compound_assignment_with_float() {
        let tokens: Vec<Token> = tokenize("a += 3.5").collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].token_type, TokenType::Identifier);
        assert_eq!(tokens[0].literal, Some(Literal::Identifier("a".to_string())));
        assert_eq!(tokens[1].token_type, TokenType::AddAssign);
        assert_eq!(tokens[2].token_type, TokenType::Float);
        assert_eq!(tokens[2].literal, Some(Literal::Float(3.5)));
    }

    #[test]
    fn longest_match_operators() {
        let cases = [
            ("==", TokenType::Equal),
            (">=", TokenType::GreaterEqual),
            ("<=", TokenType::LessEqual),
            ("!=", TokenType::NotEqual),
            (".+", TokenType::DotPlus),
            (".-", TokenType::DotMinus),
            (".*", TokenType::DotTimes),
            ("./", TokenType::DotDivide),
            ("-=", TokenType::SubAssign),
            ("*=", TokenType::MulAssign),
            ("/=", TokenType::DivAssign),
        ];
        for (text, expected) in cases {
            assert_eq!(kinds(text), vec![expected], "operator {}", text);
        }
        assert_eq!(
            kinds("= < > + - * /"),
            vec![
                TokenType::Assign,
                TokenType::Less,
                TokenType::Greater,
                TokenType::Plus,
                TokenType::Minus,
                TokenType::Times,
                TokenType::Divide,
            ]
        );
    }

    #[test]
    fn numbers() {
        let tokens: Vec<Token> = tokenize("42 .5 5. 1.5e-3 2.*x").collect();
        let literals: Vec<_> = tokens.iter().map(|t| t.literal.clone()).collect();
        assert_eq!(literals[0], Some(Literal::Integer(42)));
        assert_eq!(literals[1], Some(Literal::Float(0.5)));
        assert_eq!(literals[2], Some(Literal::Float(5.0)));
        assert_eq!(literals[3], Some(Literal::Float(1.5e-3)));
        assert_eq!(literals[4], Some(Literal::Integer(2)));
        assert_eq!(tokens[5].token_type, TokenType::DotTimes);
        assert_eq!(tokens[6].token_type, TokenType::Identifier);
    }

    #[test]
    fn strings_comments_and_lines() {
        let tokens: Vec<Token> = tokenize("print \"hi there\"; # note\n  x'").collect();
        assert_eq!(tokens[1].literal, Some(Literal::String("hi there".to_string())));
        assert_eq!(tokens[1].lexeme, "\"hi there\"");
        assert_eq!(tokens[3].token_type, TokenType::Identifier);
        assert_eq!(tokens[3].line, 2);
        assert_eq!(tokens[4].token_type, TokenType::Apostrophe);
    }

    #[test]
    fn illegal_characters_are_skipped() {
        let mut lexer = tokenize("a $ b\n@");
        let tokens: Vec<Token> = lexer.by_ref().collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].lexeme, "b");
        assert_eq!(
            lexer.errors(),
            &[
                LexerError::IllegalCharacter {
                    character: '$',
                    line: 1,
                    col: 3
                },
                LexerError::IllegalCharacter {
                    character: '@',
                    line: 2,
                    col: 1
                },
            ]
        );
        assert_eq!(lexer.errors()[0].to_string(), "1: illegal character '$'");
    }

    #[test]
    fn unterminated_string_drops_the_quote() {
        let mut lexer = tokenize("\"abc");
        let tokens: Vec<Token> = lexer.by_ref().collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].lexeme, "abc");
        assert_eq!(lexer.errors().len(), 1);
    }

    #[test]
    fn columns_from_offsets() {
        let source = "x = 1;\n  yy = 2;";
        let tokens: Vec<Token> = tokenize(source).collect();
        let yy = &tokens[4];
        assert_eq!(yy.lexeme, "yy");
        assert_eq!(find_column(source, yy.offset), 3);
        assert_eq!(find_column(source, tokens[0].offset), 1);
    }

    #[test]
    fn columns_count_characters() {
        let source = "s = \"żółw\"; x = ;\nź $";
        let mut lexer = tokenize(source);
        let tokens: Vec<Token> = lexer.by_ref().collect();
        let last = &tokens[tokens.len() - 1];
        assert_eq!(last.token_type, TokenType::Semicolon);
        assert_eq!(find_column(source, last.offset), 17);
        assert_eq!(
            lexer.errors(),
            &[
                LexerError::IllegalCharacter {
                    character: 'ź',
                    line: 2,
                    col: 1
                },
                LexerError::IllegalCharacter {
                    character: '$',
                    line: 2,
                    col: 3
                },
            ]
        );
    }
}
