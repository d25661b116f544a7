use std::fmt::{Display, Formatter};

use thiserror::Error;
use tracing::debug;

use crate::ast::{
    AstError, BinaryOp, CodeBlock, ElseBranch, ForStatement, IfStatement, ListOfIntegers, Matrix,
    Node, NodeKind, RangeExpression, UnaryOp, WhileStatement,
};
use crate::lexer::{tokenize, Lexer, LexerError};
use crate::tokens::{Literal, Token, TokenType};

pub fn parse(source: &str) -> Result<Node, ParserError> {
    let mut parser = Parser::new(tokenize(source));
    parser.parse()
}

/// The token a syntax error was raised on.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorToken {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize,
    pub col: usize,
}

impl Display for ErrorToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}, column {}: {:?} '{}'",
            self.line, self.col, self.token_type, self.lexeme
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParserError {
    #[error("Syntax error at {0}")]
    UnexpectedToken(ErrorToken),
    #[error("Syntax error at {found}: {message}")]
    TokenMismatch {
        expected: TokenType,
        found: ErrorToken,
        message: &'static str,
    },
    #[error("Syntax error at {0}: expected an expression")]
    ExpectedExpression(ErrorToken),
    #[error("Syntax error at {0}: invalid assignment target")]
    InvalidAssignment(ErrorToken),
    #[error("Syntax error at {found}: {source}")]
    InvalidMatrix { found: ErrorToken, source: AstError },
    #[error("Unexpected end of input: {message}")]
    UnexpectedEof { message: &'static str },
}

impl ParserError {
    /// Location of the offending token, absent for end of input.
    pub fn token(&self) -> Option<&ErrorToken> {
        match self {
            Self::UnexpectedToken(token)
            | Self::ExpectedExpression(token)
            | Self::InvalidAssignment(token) => Some(token),
            Self::TokenMismatch { found, .. } | Self::InvalidMatrix { found, .. } => Some(found),
            Self::UnexpectedEof { .. } => None,
        }
    }
}

/*
program -> multiline_statement EOF;

multiline_statement -> code_block+;

code_block -> statement | "{" multiline_statement "}";

statement -> ";"
    | statement ";"
    | exprStmt ";"
    | ifStmt | whileStmt | forStmt | printStmt | returnStmt | "break" | "continue";

exprStmt -> expression (("=" | "+=" | "-=" | "*=" | "/=") expression)?;

ifStmt -> "if" expression code_block ("else" (ifStmt | code_block))?;

whileStmt -> "while" expression code_block;

forStmt -> "for" IDENTIFIER "=" addition ":" addition code_block;

printStmt -> "print" expression ("," expression)*;

returnStmt -> "return" expression?;

expression -> equality;

equality -> comparison (("==" | "!=") comparison)?;

comparison -> addition (("<" | ">" | "<=" | ">=") addition)?;

addition -> multiplication (("+" | "-" | ".+" | ".-") multiplication)*;

multiplication -> unary (("*" | "/" | ".*" | "./") unary)*;

unary -> "-" unary | primary;

primary -> INTEGER | FLOAT | STRING
    | lvalue "'"?
    | matrix
    | ("eye" | "zeros" | "ones") "(" INTEGER ")"
    | "(" expression ")";

lvalue -> IDENTIFIER ("[" INTEGER ("," INTEGER)* "]")?;

matrix -> "[" "]" | "[" row (";" row)* "]";

row -> element ("," element)*;

element -> "-"? (INTEGER | FLOAT) | STRING | matrix;
*/

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next();
        Parser { lexer, current }
    }

    /// Errors the underlying lexer reported while feeding this parser.
    pub fn lexer_errors(&self) -> &[LexerError] {
        self.lexer.errors()
    }

    pub fn parse(&mut self) -> Result<Node, ParserError> {
        debug!("parsing program");
        let line = self.current_line();
        let statements = self.multiline_statement()?;

        if let Some(token) = &self.current {
            return Err(ParserError::UnexpectedToken(self.error_token(token)));
        }

        debug!(statements = statements.len(), "parsed program");
        Ok(CodeBlock::new(statements, line).into_node())
    }

    fn multiline_statement(&mut self) -> Result<Vec<Node>, ParserError> {
        let mut statements = Vec::new();

        loop {
            if self.check(TokenType::LeftBrace) {
                statements.push(self.braced_block()?.into_node());
            } else if let Some(statement) = self.statement()? {
                statements.push(statement);
            }

            if self.is_at_end() || self.check(TokenType::RightBrace) {
                break;
            }
        }

        Ok(statements)
    }

    /// Body of a control statement. A single statement is wrapped into a
    /// block of its own.
    fn code_block(&mut self) -> Result<CodeBlock, ParserError> {
        if self.check(TokenType::LeftBrace) {
            return self.braced_block();
        }

        let line = self.current_line();
        let statement = self.statement()?;
        Ok(CodeBlock::new(statement.into_iter().collect(), line))
    }

    fn braced_block(&mut self) -> Result<CodeBlock, ParserError> {
        let brace = self.consume(TokenType::LeftBrace, "a code block starts with '{'")?;
        let statements = self.multiline_statement()?;
        self.consume(TokenType::RightBrace, "expected '}' after code block")?;
        Ok(CodeBlock::new(statements, brace.line))
    }

    /// Parses one statement, swallowing trailing semicolons. An empty
    /// statement yields `None`.
    fn statement(&mut self) -> Result<Option<Node>, ParserError> {
        let statement = if self.match_token(TokenType::Semicolon).is_some() {
            None
        } else if let Some(keyword) = self.match_token(TokenType::If) {
            Some(self.if_stmt(keyword)?)
        } else if let Some(keyword) = self.match_token(TokenType::While) {
            Some(self.while_stmt(keyword)?)
        } else if let Some(keyword) = self.match_token(TokenType::For) {
            Some(self.for_stmt(keyword)?)
        } else if let Some(keyword) = self.match_token(TokenType::Print) {
            Some(self.print_stmt(keyword)?)
        } else if let Some(keyword) = self.match_token(TokenType::Return) {
            Some(self.return_stmt(keyword)?)
        } else if let Some(keyword) = self.match_token(TokenType::Break) {
            Some(Node::new(NodeKind::BreakStatement, keyword.line))
        } else if let Some(keyword) = self.match_token(TokenType::Continue) {
            Some(Node::new(NodeKind::ContinueStatement, keyword.line))
        } else {
            let statement = self.expression_stmt()?;
            self.consume(
                TokenType::Semicolon,
                "expected ';' after expression statement",
            )?;
            Some(statement)
        };

        while self.match_token(TokenType::Semicolon).is_some() {}

        Ok(statement)
    }

    fn if_stmt(&mut self, keyword: Token) -> Result<Node, ParserError> {
        /*
            ifStmt -> "if" expression code_block ("else" (ifStmt | code_block))?;
        */
        let condition = self.expression()?;
        let then_block = self.code_block()?;

        // The else always goes to the innermost if still missing one.
        let else_branch = if self.match_token(TokenType::Else).is_some() {
            if let Some(nested) = self.match_token(TokenType::If) {
                Some(ElseBranch::If(Box::new(self.if_stmt(nested)?)))
            } else {
                Some(ElseBranch::Block(self.code_block()?))
            }
        } else {
            None
        };

        Ok(Node::new(
            NodeKind::IfStatement(IfStatement {
                condition: Box::new(condition),
                then_block,
                else_branch,
            }),
            keyword.line,
        ))
    }

    fn while_stmt(&mut self, keyword: Token) -> Result<Node, ParserError> {
        let condition = self.expression()?;
        let body = self.code_block()?;

        Ok(Node::new(
            NodeKind::WhileStatement(WhileStatement {
                condition: Box::new(condition),
                body,
            }),
            keyword.line,
        ))
    }

    fn for_stmt(&mut self, keyword: Token) -> Result<Node, ParserError> {
        /*
            forStmt -> "for" IDENTIFIER "=" addition ":" addition code_block;
        */
        let name = self.consume(TokenType::Identifier, "expected loop variable after 'for'")?;
        self.consume(TokenType::Assign, "expected '=' after loop variable")?;
        let low = self.addition()?;
        let colon = self.consume(TokenType::Colon, "expected ':' between range bounds")?;
        let high = self.addition()?;
        let body = self.code_block()?;

        Ok(Node::new(
            NodeKind::ForStatement(ForStatement {
                variable: name.lexeme,
                range: RangeExpression {
                    low: Box::new(low),
                    high: Box::new(high),
                    line: colon.line,
                },
                body,
            }),
            keyword.line,
        ))
    }

    fn print_stmt(&mut self, keyword: Token) -> Result<Node, ParserError> {
        let mut values = vec![self.expression()?];
        while self.match_token(TokenType::Comma).is_some() {
            values.push(self.expression()?);
        }

        Ok(Node::new(NodeKind::PrintStatement(values), keyword.line))
    }

    fn return_stmt(&mut self, keyword: Token) -> Result<Node, ParserError> {
        let value = if self.starts_expression() {
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        Ok(Node::new(NodeKind::ReturnStatement(value), keyword.line))
    }

    fn expression_stmt(&mut self) -> Result<Node, ParserError> {
        let expr = self.expression()?;

        let is_assignment = self
            .current
            .as_ref()
            .map_or(false, |token| token.token_type.is_assignment());
        if !is_assignment {
            return Ok(expr);
        }

        let operator = self.advance().ok_or(ParserError::UnexpectedEof {
            message: "expected an assignment operator",
        })?;
        if !expr.is_lvalue() {
            return Err(ParserError::InvalidAssignment(self.error_token(&operator)));
        }

        let op = self.binary_op_type(&operator)?;
        let value = self.expression()?;
        Ok(Node::new(
            NodeKind::BinaryExpression {
                op,
                left: Box::new(expr),
                right: Box::new(value),
            },
            operator.line,
        ))
    }

    fn expression(&mut self) -> Result<Node, ParserError> {
        self.equality()
    }

    fn equality(&mut self) -> Result<Node, ParserError> {
        // equality -> comparison (("==" | "!=") comparison)?;
        let expr = self.comparison()?;
        if let Some(operator) = self.matches_one(&[TokenType::Equal, TokenType::NotEqual]) {
            let right = self.comparison()?;
            return self.binary(expr, &operator, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Node, ParserError> {
        // comparison -> addition (("<" | ">" | "<=" | ">=") addition)?;
        let expr = self.addition()?;
        if let Some(operator) = self.matches_one(&[
            TokenType::Less,
            TokenType::Greater,
            TokenType::LessEqual,
            TokenType::GreaterEqual,
        ]) {
            let right = self.addition()?;
            return self.binary(expr, &operator, right);
        }

        Ok(expr)
    }

    fn addition(&mut self) -> Result<Node, ParserError> {
        // addition -> multiplication (("+" | "-" | ".+" | ".-") multiplication)*;
        let mut expr = self.multiplication()?;
        while let Some(operator) = self.matches_one(&[
            TokenType::Plus,
            TokenType::Minus,
            TokenType::DotPlus,
            TokenType::DotMinus,
        ]) {
            let right = self.multiplication()?;
            expr = self.binary(expr, &operator, right)?;
        }

        Ok(expr)
    }

    fn multiplication(&mut self) -> Result<Node, ParserError> {
        // multiplication -> unary (("*" | "/" | ".*" | "./") unary)*;
        let mut expr = self.unary()?;
        while let Some(operator) = self.matches_one(&[
            TokenType::Times,
            TokenType::Divide,
            TokenType::DotTimes,
            TokenType::DotDivide,
        ]) {
            let right = self.unary()?;
            expr = self.binary(expr, &operator, right)?;
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Node, ParserError> {
        // unary -> "-" unary | primary;
        if let Some(operator) = self.match_token(TokenType::Minus) {
            let operand = self.unary()?;
            return Ok(Node::new(
                NodeKind::UnaryExpression {
                    op: UnaryOp::Minus,
                    operand: Box::new(operand),
                },
                operator.line,
            ));
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Node, ParserError> {
        let token = match self.advance() {
            Some(token) => token,
            None => {
                return Err(ParserError::UnexpectedEof {
                    message: "expected an expression",
                })
            }
        };

        match token.token_type {
            TokenType::Integer | TokenType::Float | TokenType::String => self.literal(&token),
            TokenType::Identifier => {
                let lvalue = self.lvalue(token)?;
                if let Some(apostrophe) = self.match_token(TokenType::Apostrophe) {
                    return Ok(Node::new(
                        NodeKind::TransposeStatement(Box::new(lvalue)),
                        apostrophe.line,
                    ));
                }
                Ok(lvalue)
            }
            TokenType::LeftBracket => Ok(self.matrix(&token)?.into_node()),
            TokenType::Eye | TokenType::Zeros | TokenType::Ones => self.matrix_function(token),
            TokenType::LeftParen => {
                let expr = self.expression()?;
                self.consume(
                    TokenType::RightParen,
                    "expected ')' after grouping expression",
                )?;
                Ok(expr)
            }
            _ => Err(ParserError::ExpectedExpression(self.error_token(&token))),
        }
    }

    fn literal(&self, token: &Token) -> Result<Node, ParserError> {
        let kind = match &token.literal {
            Some(Literal::Integer(value)) => NodeKind::IntegerNumber(*value),
            Some(Literal::Float(value)) => NodeKind::FloatNumber(*value),
            Some(Literal::String(value)) => NodeKind::StringValue(value.clone()),
            _ => return Err(ParserError::ExpectedExpression(self.error_token(token))),
        };

        Ok(Node::new(kind, token.line))
    }

    fn lvalue(&mut self, name: Token) -> Result<Node, ParserError> {
        // lvalue -> IDENTIFIER ("[" INTEGER ("," INTEGER)* "]")?;
        if self.match_token(TokenType::LeftBracket).is_none() {
            return Ok(Node::new(NodeKind::Variable(name.lexeme), name.line));
        }

        let mut index = ListOfIntegers::new(self.integer("expected an integer index")?);
        while self.match_token(TokenType::Comma).is_some() {
            index.push(self.integer("expected an integer index after ','")?);
        }
        self.consume(TokenType::RightBracket, "expected ']' after index list")?;

        Ok(Node::new(
            NodeKind::ElementAccessExpression {
                variable: name.lexeme,
                index,
            },
            name.line,
        ))
    }

    fn matrix(&mut self, bracket: &Token) -> Result<Matrix, ParserError> {
        // matrix -> "[" "]" | "[" row (";" row)* "]";
        if self.match_token(TokenType::RightBracket).is_some() {
            return Ok(Matrix::new(Vec::new(), bracket.line)
                .map_err(|source| self.invalid_matrix(bracket, source))?);
        }

        let mut rows = vec![self.matrix_row()?];
        while self.match_token(TokenType::Semicolon).is_some() {
            rows.push(self.matrix_row()?);
        }
        let closing = self.consume(TokenType::RightBracket, "expected ']' after matrix rows")?;

        let children = if rows.len() == 1 {
            rows.pop().unwrap_or_default()
        } else {
            rows.into_iter()
                .map(|row| Matrix::new(row, bracket.line).map(Matrix::into_node))
                .collect::<Result<Vec<Node>, AstError>>()
                .map_err(|source| self.invalid_matrix(&closing, source))?
        };

        Matrix::new(children, bracket.line).map_err(|source| self.invalid_matrix(&closing, source))
    }

    fn matrix_row(&mut self) -> Result<Vec<Node>, ParserError> {
        // row -> element ("," element)*;
        let mut row = vec![self.matrix_element()?];
        while self.match_token(TokenType::Comma).is_some() {
            row.push(self.matrix_element()?);
        }

        Ok(row)
    }

    fn matrix_element(&mut self) -> Result<Node, ParserError> {
        let negative = self.match_token(TokenType::Minus).is_some();
        let token = match self.advance() {
            Some(token) => token,
            None => {
                return Err(ParserError::UnexpectedEof {
                    message: "expected a matrix element",
                })
            }
        };

        match (token.token_type, negative) {
            (TokenType::LeftBracket, false) => Ok(self.matrix(&token)?.into_node()),
            (TokenType::String, false) => self.literal(&token),
            (TokenType::Integer | TokenType::Float, _) => {
                let mut node = self.literal(&token)?;
                if negative {
                    node.kind = match node.kind {
                        NodeKind::IntegerNumber(value) => NodeKind::IntegerNumber(-value),
                        NodeKind::FloatNumber(value) => NodeKind::FloatNumber(-value),
                        other => other,
                    };
                }
                Ok(node)
            }
            _ => Err(ParserError::ExpectedExpression(self.error_token(&token))),
        }
    }

    fn matrix_function(&mut self, keyword: Token) -> Result<Node, ParserError> {
        self.consume(TokenType::LeftParen, "expected '(' after matrix function")?;
        let size = self.integer("expected an integer matrix size")?;
        self.consume(TokenType::RightParen, "expected ')' after matrix size")?;

        let kind = match keyword.token_type {
            TokenType::Eye => NodeKind::EyeStatement(size),
            TokenType::Zeros => NodeKind::ZerosStatement(size),
            TokenType::Ones => NodeKind::OnesStatement(size),
            _ => return Err(ParserError::UnexpectedToken(self.error_token(&keyword))),
        };

        Ok(Node::new(kind, keyword.line))
    }

    fn integer(&mut self, message: &'static str) -> Result<i64, ParserError> {
        let token = self.consume(TokenType::Integer, message)?;
        match token.literal {
            Some(Literal::Integer(value)) => Ok(value),
            _ => Err(ParserError::UnexpectedToken(self.error_token(&token))),
        }
    }

    fn binary(&self, left: Node, operator: &Token, right: Node) -> Result<Node, ParserError> {
        let op = self.binary_op_type(operator)?;
        Ok(Node::new(
            NodeKind::BinaryExpression {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            operator.line,
        ))
    }

    fn starts_expression(&self) -> bool {
        self.current.as_ref().map_or(false, |token| {
            matches!(
                token.token_type,
                TokenType::Identifier
                    | TokenType::Integer
                    | TokenType::Float
                    | TokenType::String
                    | TokenType::LeftParen
                    | TokenType::LeftBracket
                    | TokenType::Minus
                    | TokenType::Eye
                    | TokenType::Zeros
                    | TokenType::Ones
            )
        })
    }

    fn matches_one(&mut self, items: &[TokenType]) -> Option<Token> {
        for item in items {
            if let Some(token) = self.match_token(*item) {
                return Some(token);
            }
        }

        None
    }

    fn consume(&mut self, expected: TokenType, message: &'static str) -> Result<Token, ParserError> {
        if let Some(token) = self.match_token(expected) {
            return Ok(token);
        }

        match &self.current {
            Some(found) => Err(ParserError::TokenMismatch {
                expected,
                found: self.error_token(found),
                message,
            }),
            None => Err(ParserError::UnexpectedEof { message }),
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let next = self.lexer.next();
        std::mem::replace(&mut self.current, next)
    }

    fn match_token(&mut self, token_type: TokenType) -> Option<Token> {
        if self.check(token_type) {
            self.advance()
        } else {
            None
        }
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.current
            .as_ref()
            .map_or(false, |token| token.token_type == token_type)
    }

    fn current_line(&self) -> usize {
        self.current.as_ref().map_or(1, |token| token.line)
    }

    fn is_at_end(&self) -> bool {
        self.current.is_none()
    }

    fn error_token(&self, token: &Token) -> ErrorToken {
        ErrorToken {
            token_type: token.token_type,
            lexeme: token.lexeme.clone(),
            line: token.line,
            col: self.lexer.column(token.offset),
        }
    }

    fn invalid_matrix(&self, token: &Token, source: AstError) -> ParserError {
        ParserError::InvalidMatrix {
            found: self.error_token(token),
            source,
        }
    }

    fn binary_op_type(&self, token: &Token) -> Result<BinaryOp, ParserError> {
        let op = match token.token_type {
            TokenType::Assign => BinaryOp::Assign,
            TokenType::AddAssign => BinaryOp::AddAssign,
            TokenType::SubAssign => BinaryOp::SubAssign,
            TokenType::MulAssign => BinaryOp::MulAssign,
            TokenType::DivAssign => BinaryOp::DivAssign,
            TokenType::Equal => BinaryOp::Equal,
            TokenType::NotEqual => BinaryOp::NotEqual,
            TokenType::Less => BinaryOp::Less,
            TokenType::Greater => BinaryOp::Greater,
            TokenType::LessEqual => BinaryOp::LessEqual,
            TokenType::GreaterEqual => BinaryOp::GreaterEqual,
            TokenType::Plus => BinaryOp::Plus,
            TokenType::Minus => BinaryOp::Minus,
            TokenType::DotPlus => BinaryOp::DotPlus,
            TokenType::DotMinus => BinaryOp::DotMinus,
            TokenType::Times => BinaryOp::Times,
            TokenType::Divide => BinaryOp::Divide,
            TokenType::DotTimes => BinaryOp::DotTimes,
            TokenType::DotDivide => BinaryOp::DotDivide,
            _ => return Err(ParserError::UnexpectedToken(self.error_token(token))),
        };

        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(source: &str) -> Vec<Node> {
        match parse(source) {
            Ok(Node {
                kind: NodeKind::CodeBlock(block),
                ..
            }) => block.statements,
            Ok(other) => panic!("expected a code block, got {:?}", other),
            Err(e) => panic!("Parser error: {}", e),
        }
    }

    fn single(source: &str) -> Node {
        let mut statements = statements(source);
        assert_eq!(statements.len(), 1, "statements: {:#?}", statements);
        statements.remove(0)
    }

    fn var(name: &str) -> NodeKind {
        NodeKind::Variable(name.to_string())
    }

    #[test]
    fn assignment_of_sum() {
        let node = single("x = 1 + 2;");
        match node.kind {
            NodeKind::BinaryExpression { op, left, right } => {
                assert_eq!(op, BinaryOp::Assign);
                assert_eq!(left.kind, var("x"));
                match right.kind {
                    NodeKind::BinaryExpression { op, left, right } => {
                        assert_eq!(op, BinaryOp::Plus);
                        assert_eq!(left.kind, NodeKind::IntegerNumber(1));
                        assert_eq!(right.kind, NodeKind::IntegerNumber(2));
                    }
                    other => panic!("expected a sum, got {:?}", other),
                }
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn multiplication_binds_tighter_and_is_left_associative() {
        let node = single("y = 1 - 2 - 3 * 4;");
        let NodeKind::BinaryExpression { right, .. } = node.kind else {
            panic!("expected an assignment");
        };
        // (1 - 2) - (3 * 4)
        let NodeKind::BinaryExpression { op, left, right } = right.kind else {
            panic!("expected a difference");
        };
        assert_eq!(op, BinaryOp::Minus);
        assert!(matches!(
            left.kind,
            NodeKind::BinaryExpression {
                op: BinaryOp::Minus,
                ..
            }
        ));
        assert!(matches!(
            right.kind,
            NodeKind::BinaryExpression {
                op: BinaryOp::Times,
                ..
            }
        ));
    }

    #[test]
    fn dangling_else_binds_to_inner_if() {
        let node = single("if a if b {1;} else {2;}");
        let NodeKind::IfStatement(outer) = node.kind else {
            panic!("expected an if statement");
        };
        assert!(outer.else_branch.is_none());
        assert_eq!(outer.then_block.statements.len(), 1);
        let NodeKind::IfStatement(inner) = &outer.then_block.statements[0].kind else {
            panic!("expected a nested if statement");
        };
        assert_eq!(inner.condition.kind, var("b"));
        match &inner.else_branch {
            Some(ElseBranch::Block(block)) => {
                assert_eq!(block.statements[0].kind, NodeKind::IntegerNumber(2));
            }
            other => panic!("expected an else block, got {:?}", other),
        }
    }

    #[test]
    fn else_if_chain() {
        let node = single("if x < 1 { y = 1; } else if x > 2 y = 2; else { y = 3; }");
        let NodeKind::IfStatement(statement) = node.kind else {
            panic!("expected an if statement");
        };
        let Some(ElseBranch::If(nested)) = statement.else_branch else {
            panic!("expected else if");
        };
        let NodeKind::IfStatement(nested) = nested.kind else {
            panic!("expected a nested if statement");
        };
        assert_eq!(nested.then_block.statements.len(), 1);
        assert!(matches!(nested.else_branch, Some(ElseBranch::Block(_))));
    }

    #[test]
    fn matrix_rows() {
        let node = single("a = [1, 2; 3, 4];");
        let NodeKind::BinaryExpression { right, .. } = node.kind else {
            panic!("expected an assignment");
        };
        let NodeKind::Matrix(matrix) = right.kind else {
            panic!("expected a matrix");
        };
        let crate::ast::MatrixContent::Rows(rows) = matrix.content() else {
            panic!("expected matrix rows");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn negative_literals_in_rows() {
        let node = single("a = [-1, 2.5, -0.5];");
        let NodeKind::BinaryExpression { right, .. } = node.kind else {
            panic!("expected an assignment");
        };
        let NodeKind::Matrix(matrix) = right.kind else {
            panic!("expected a matrix");
        };
        let crate::ast::MatrixContent::Values(values) = matrix.content() else {
            panic!("expected values");
        };
        assert_eq!(values[0].kind, NodeKind::IntegerNumber(-1));
        assert_eq!(values[2].kind, NodeKind::FloatNumber(-0.5));
    }

    #[test]
    fn mixed_matrix_rows_fail() {
        assert!(matches!(
            parse("a = [[1, 2], 3];"),
            Err(ParserError::InvalidMatrix { .. })
        ));
        assert!(matches!(
            parse("a = [[1, 2]; 3];"),
            Err(ParserError::InvalidMatrix { .. })
        ));
    }

    #[test]
    fn for_loop_with_range() {
        let node = single("for i = 1:n { print i; }");
        let NodeKind::ForStatement(statement) = node.kind else {
            panic!("expected a for statement");
        };
        assert_eq!(statement.variable, "i");
        assert_eq!(statement.range.low.kind, NodeKind::IntegerNumber(1));
        assert_eq!(statement.range.high.kind, var("n"));
        assert_eq!(statement.body.statements.len(), 1);
    }

    #[test]
    fn unbraced_body_is_wrapped_in_a_block() {
        let node = single("while i < 10 i += 1;");
        let NodeKind::WhileStatement(statement) = node.kind else {
            panic!("expected a while statement");
        };
        assert_eq!(statement.body.statements.len(), 1);
    }

    #[test]
    fn access_transpose_and_builtins() {
        let node = single("b = -a[1, 2] + c' .* eye(3);");
        let NodeKind::BinaryExpression { right, .. } = node.kind else {
            panic!("expected an assignment");
        };
        let NodeKind::BinaryExpression { op, left, right } = right.kind else {
            panic!("expected a sum");
        };
        assert_eq!(op, BinaryOp::Plus);
        let NodeKind::UnaryExpression { operand, .. } = left.kind else {
            panic!("expected unary minus");
        };
        match operand.kind {
            NodeKind::ElementAccessExpression { variable, index } => {
                assert_eq!(variable, "a");
                assert_eq!(index.values, vec![1, 2]);
            }
            other => panic!("expected element access, got {:?}", other),
        }
        let NodeKind::BinaryExpression { op, left, right } = right.kind else {
            panic!("expected a product");
        };
        assert_eq!(op, BinaryOp::DotTimes);
        assert!(matches!(left.kind, NodeKind::TransposeStatement(_)));
        assert_eq!(right.kind, NodeKind::EyeStatement(3));
    }

    #[test]
    fn print_return_break_continue() {
        let nodes = statements("print 1, \"a\", x; return; return x; break; continue;");
        assert!(matches!(&nodes[0].kind, NodeKind::PrintStatement(values) if values.len() == 3));
        assert_eq!(nodes[1].kind, NodeKind::ReturnStatement(None));
        assert!(matches!(nodes[2].kind, NodeKind::ReturnStatement(Some(_))));
        assert_eq!(nodes[3].kind, NodeKind::BreakStatement);
        assert_eq!(nodes[4].kind, NodeKind::ContinueStatement);
    }

    #[test]
    fn braces_nest_code_blocks() {
        let nodes = statements("x = 1; { y = 2; z = 3; } ;;");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[1].kind, NodeKind::CodeBlock(block) if block.statements.len() == 2));
    }

    #[test]
    fn lines_are_recorded() {
        let nodes = statements("x = 1;\n\ny = 2;");
        assert_eq!(nodes[0].line, 1);
        assert_eq!(nodes[1].line, 3);
    }

    #[test]
    fn syntax_error_location() {
        match parse("x = 1;\n y = ;") {
            Err(ParserError::ExpectedExpression(token)) => {
                assert_eq!(token.line, 2);
                assert_eq!(token.col, 6);
                assert_eq!(token.token_type, TokenType::Semicolon);
                assert_eq!(token.lexeme, ";");
            }
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn syntax_error_message() {
        let error = parse("x = 1 +;").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Syntax error at line 1, column 8: Semicolon ';': expected an expression"
        );
    }

    #[test]
    fn token_mismatch_message() {
        let error = parse("x = 1 2;").unwrap_err();
        assert!(matches!(
            error,
            ParserError::TokenMismatch {
                expected: TokenType::Semicolon,
                ..
            }
        ));
        assert_eq!(
            error.to_string(),
            "Syntax error at line 1, column 7: Integer '2': expected ';' after expression statement"
        );
    }

    #[test]
    fn invalid_assignment_target() {
        assert!(matches!(
            parse("1 = 2;"),
            Err(ParserError::InvalidAssignment(_))
        ));
        assert!(matches!(
            parse("x' = 2;"),
            Err(ParserError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn rejected_programs() {
        assert!(matches!(parse(""), Err(ParserError::UnexpectedEof { .. })));
        assert!(matches!(parse("# only a comment"), Err(ParserError::UnexpectedEof { .. })));
        assert!(parse("{}").is_err());
        assert!(parse("x = 1").is_err());
        assert!(parse("a == b == c;").is_err());
        assert!(parse("x = y = 1;").is_err());
        assert!(parse("}").is_err());
        assert!(parse("a[1.5] = 2;").is_err());
    }

    #[test]
    fn lexer_errors_do_not_stop_parsing() {
        let mut parser = Parser::new(tokenize("x = 1 $ + 2;"));
        let root = parser.parse();
        assert!(root.is_ok());
        assert_eq!(parser.lexer_errors().len(), 1);
    }
}
