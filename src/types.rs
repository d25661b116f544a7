use std::fmt::Display;

use crate::ast::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Integer,
    Float,
    String,
    /// Result of an inference that already failed and was reported.
    Error,
    Matrix(MatrixType),
    CodeBlock,
}

impl Type {
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Integer => TypeTag::Integer,
            Self::Float => TypeTag::Float,
            Self::String => TypeTag::String,
            Self::Error => TypeTag::Error,
            Self::Matrix(_) => TypeTag::Matrix,
            Self::CodeBlock => TypeTag::CodeBlock,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    pub fn matrix(lengths: Vec<usize>, element: Type) -> Self {
        Self::Matrix(MatrixType::new(lengths, element))
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "Integer"),
            Self::Float => write!(f, "Float"),
            Self::String => write!(f, "String"),
            Self::Error => write!(f, "Error"),
            Self::Matrix(matrix) => write!(f, "{}", matrix),
            Self::CodeBlock => write!(f, "CodeBlock"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixType {
    pub dimensions: usize,
    pub lengths: Vec<usize>,
    pub element: Box<Type>,
}

impl MatrixType {
    pub fn new(lengths: Vec<usize>, element: Type) -> Self {
        Self {
            dimensions: lengths.len(),
            lengths,
            element: Box::new(element),
        }
    }

    /// Same dimension count, per-dimension lengths and element type.
    pub fn same_shape(&self, other: &MatrixType) -> bool {
        self == other
    }

    pub fn transposed(&self) -> Self {
        Self {
            dimensions: self.dimensions,
            lengths: self.lengths.iter().rev().copied().collect(),
            element: self.element.clone(),
        }
    }

    /// Type left after fixing the first `indices` dimensions: a smaller
    /// matrix, or the element type once every dimension is fixed.
    pub fn slice(&self, indices: usize) -> Type {
        if indices >= self.dimensions {
            return (*self.element).clone();
        }
        Type::matrix(self.lengths[indices..].to_vec(), (*self.element).clone())
    }
}

impl Display for MatrixType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lengths = self
            .lengths
            .iter()
            .map(|length| length.to_string())
            .collect::<Vec<_>>()
            .join("x");
        write!(f, "Matrix[{}] of {}", lengths, self.element)
    }
}

/// Type kind without payload, used as the key of the operator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Integer,
    Float,
    String,
    Error,
    Matrix,
    CodeBlock,
}

/// Result kind of `left op right`, or `None` when the combination is not
/// allowed. Plain assignment is not covered here.
pub fn binary_result(op: BinaryOp, left: TypeTag, right: TypeTag) -> Option<TypeTag> {
    use TypeTag::*;

    match op {
        BinaryOp::Plus
        | BinaryOp::Minus
        | BinaryOp::Times
        | BinaryOp::Divide
        | BinaryOp::AddAssign
        | BinaryOp::SubAssign
        | BinaryOp::MulAssign
        | BinaryOp::DivAssign => match (left, right) {
            (String, String) if op == BinaryOp::Plus => Some(String),
            (Matrix, Matrix) => Some(Matrix),
            _ => numeric_result(left, right),
        },
        BinaryOp::DotPlus | BinaryOp::DotMinus | BinaryOp::DotTimes | BinaryOp::DotDivide => {
            match (left, right) {
                (Matrix, Matrix) => Some(Matrix),
                _ => None,
            }
        }
        BinaryOp::Equal
        | BinaryOp::NotEqual
        | BinaryOp::Less
        | BinaryOp::Greater
        | BinaryOp::LessEqual
        | BinaryOp::GreaterEqual => numeric_result(left, right),
        BinaryOp::Assign => None,
    }
}

fn numeric_result(left: TypeTag, right: TypeTag) -> Option<TypeTag> {
    match (left, right) {
        (TypeTag::Integer, TypeTag::Integer) => Some(TypeTag::Integer),
        (TypeTag::Integer, TypeTag::Float)
        | (TypeTag::Float, TypeTag::Integer)
        | (TypeTag::Float, TypeTag::Float) => Some(TypeTag::Float),
        _ => None,
    }
}

pub fn unary_result(op: UnaryOp, operand: TypeTag) -> Option<TypeTag> {
    match (op, operand) {
        (UnaryOp::Minus, TypeTag::Integer | TypeTag::Float | TypeTag::Matrix) => Some(operand),
        _ => None,
    }
}
