#[derive(Clone, Debug, PartialEq, Eq, Copy, Hash)]
pub enum TokenType {
    // Assignment operators
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,

    // Comparison operators
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Arithmetic operators, plain and elementwise
    Plus,
    Minus,
    DotPlus,
    DotMinus,
    Times,
    Divide,
    DotTimes,
    DotDivide,

    Apostrophe,
    Colon,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,

    // Literals
    Identifier,
    Integer,
    Float,
    String,

    // Keywords
    If,
    Else,
    For,
    While,
    Break,
    Continue,
    Return,
    Eye,
    Zeros,
    Ones,
    Print,
}

impl TokenType {
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            TokenType::Assign
                | TokenType::AddAssign
                | TokenType::SubAssign
                | TokenType::MulAssign
                | TokenType::DivAssign
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Identifier(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
    /// Byte offset of the first character of the lexeme in the source.
    pub offset: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        lexeme: String,
        literal: Option<Literal>,
        line: usize,
        offset: usize,
    ) -> Self {
        Token {
            token_type,
            lexeme,
            literal,
            line,
            offset,
        }
    }
}
