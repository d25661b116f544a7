use std::fmt::{Display, Formatter};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub line: usize,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize) -> Self {
        Node { kind, line }
    }

    /// True for the node kinds that may stand on the left of an assignment.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Variable(_) | NodeKind::ElementAccessExpression { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    CodeBlock(CodeBlock),
    IntegerNumber(i64),
    FloatNumber(f64),
    StringValue(String),
    Variable(String),
    BinaryExpression {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryExpression {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Matrix(Matrix),
    ElementAccessExpression {
        variable: String,
        index: ListOfIntegers,
    },
    IfStatement(IfStatement),
    WhileStatement(WhileStatement),
    ForStatement(ForStatement),
    ReturnStatement(Option<Box<Node>>),
    BreakStatement,
    ContinueStatement,
    TransposeStatement(Box<Node>),
    PrintStatement(Vec<Node>),
    EyeStatement(i64),
    ZerosStatement(i64),
    OnesStatement(i64),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeBlock {
    pub statements: Vec<Node>,
    pub line: usize,
}

impl CodeBlock {
    pub fn new(statements: Vec<Node>, line: usize) -> Self {
        CodeBlock { statements, line }
    }

    pub fn into_node(self) -> Node {
        let line = self.line;
        Node::new(NodeKind::CodeBlock(self), line)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AstError {
    #[error("{line}: invalid matrix, a matrix can contain only submatrices or only values")]
    HeterogeneousMatrix { line: usize },
}

/// The children of a matrix literal, either all nested matrices or all
/// scalar values.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixContent {
    Rows(Vec<Matrix>),
    Values(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    content: MatrixContent,
    pub line: usize,
}

impl Matrix {
    /// Builds a matrix from its children, rejecting a mix of nested matrices
    /// and values. An empty child list is an empty row of values.
    pub fn new(children: Vec<Node>, line: usize) -> Result<Self, AstError> {
        let nested = children
            .iter()
            .filter(|child| matches!(child.kind, NodeKind::Matrix(_)))
            .count();

        let content = if nested == 0 {
            MatrixContent::Values(children)
        } else if nested == children.len() {
            let rows: Vec<Matrix> = children
                .into_iter()
                .filter_map(|child| match child.kind {
                    NodeKind::Matrix(matrix) => Some(matrix),
                    _ => None,
                })
                .collect();
            // Rows themselves must agree on holding submatrices or values.
            let nested_rows = rows
                .iter()
                .filter(|row| matches!(row.content, MatrixContent::Rows(_)))
                .count();
            if nested_rows != 0 && nested_rows != rows.len() {
                return Err(AstError::HeterogeneousMatrix { line });
            }
            MatrixContent::Rows(rows)
        } else {
            return Err(AstError::HeterogeneousMatrix { line });
        };

        Ok(Matrix { content, line })
    }

    pub fn content(&self) -> &MatrixContent {
        &self.content
    }

    pub fn len(&self) -> usize {
        match &self.content {
            MatrixContent::Rows(rows) => rows.len(),
            MatrixContent::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_node(self) -> Node {
        let line = self.line;
        Node::new(NodeKind::Matrix(self), line)
    }
}

/// Index list of an element access, e.g. the `1, 2` in `a[1, 2]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListOfIntegers {
    pub values: Vec<i64>,
}

impl ListOfIntegers {
    pub fn new(first: i64) -> Self {
        ListOfIntegers {
            values: vec![first],
        }
    }

    pub fn push(&mut self, value: i64) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Box<Node>,
    pub then_block: CodeBlock,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    Block(CodeBlock),
    If(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Box<Node>,
    pub body: CodeBlock,
}

/// Inclusive `low:high` range driving a for loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeExpression {
    pub low: Box<Node>,
    pub high: Box<Node>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub variable: String,
    pub range: RangeExpression,
    pub body: CodeBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Plus,
    Minus,
    DotPlus,
    DotMinus,
    Times,
    Divide,
    DotTimes,
    DotDivide,
}

impl BinaryOp {
    pub fn is_compound_assignment(&self) -> bool {
        matches!(
            self,
            BinaryOp::AddAssign | BinaryOp::SubAssign | BinaryOp::MulAssign | BinaryOp::DivAssign
        )
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use crate::ast::BinaryOp::*;
        let string = match self {
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            Plus => "+",
            Minus => "-",
            DotPlus => ".+",
            DotMinus => ".-",
            Times => "*",
            Divide => "/",
            DotTimes => ".*",
            DotDivide => "./",
        };

        write!(f, "{}", string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Minus => write!(f, "-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> Node {
        Node::new(NodeKind::IntegerNumber(value), 1)
    }

    #[test]
    fn matrix_of_values() {
        let matrix = Matrix::new(vec![int(1), int(2)], 1).unwrap();
        assert_eq!(matrix.len(), 2);
        assert!(matches!(matrix.content(), MatrixContent::Values(_)));
    }

    #[test]
    fn matrix_of_rows() {
        let first = Matrix::new(vec![int(1), int(2)], 1).unwrap().into_node();
        let second = Matrix::new(vec![int(3), int(4)], 1).unwrap().into_node();
        let matrix = Matrix::new(vec![first, second], 1).unwrap();
        match matrix.content() {
            MatrixContent::Rows(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1].len(), 2);
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn mixed_matrix_is_rejected() {
        let row = Matrix::new(vec![int(1), int(2)], 3).unwrap().into_node();
        assert_eq!(
            Matrix::new(vec![row, int(3)], 3),
            Err(AstError::HeterogeneousMatrix { line: 3 })
        );
    }

    #[test]
    fn rows_mixing_submatrices_and_values_are_rejected() {
        let inner = Matrix::new(vec![int(1)], 2).unwrap().into_node();
        let nested_row = Matrix::new(vec![inner], 2).unwrap().into_node();
        let value_row = Matrix::new(vec![int(3)], 2).unwrap().into_node();
        assert_eq!(
            Matrix::new(vec![nested_row, value_row], 2),
            Err(AstError::HeterogeneousMatrix { line: 2 })
        );
    }

    #[test]
    fn empty_matrix() {
        let matrix = Matrix::new(Vec::new(), 1).unwrap();
        assert!(matrix.is_empty());
    }

    #[test]
    fn operator_symbols() {
        assert_eq!(BinaryOp::DotDivide.to_string(), "./");
        assert_eq!(BinaryOp::AddAssign.to_string(), "+=");
        assert_eq!(UnaryOp::Minus.to_string(), "-");
        assert!(BinaryOp::DivAssign.is_compound_assignment());
        assert!(!BinaryOp::Assign.is_compound_assignment());
    }
}
