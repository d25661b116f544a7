pub mod ast;
pub mod lexer;
pub mod parser;
pub mod symbol_table;
pub mod tokens;
pub mod typechecker;
pub mod types;

pub use lexer::{tokenize, Lexer, LexerError};
pub use parser::{parse, Parser, ParserError};
pub use typechecker::{check, Diagnostic, SemanticError, TypeChecker};
pub use types::{MatrixType, Type};
