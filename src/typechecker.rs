use std::fmt::Display;

use thiserror::Error;
use tracing::{debug, warn};

use crate::ast::{
    BinaryOp, CodeBlock, ElseBranch, ForStatement, IfStatement, ListOfIntegers, Matrix,
    MatrixContent, Node, NodeKind, RangeExpression, UnaryOp, WhileStatement,
};
use crate::symbol_table::SymbolTable;
use crate::types::{binary_result, unary_result, MatrixType, Type, TypeTag};

/// Largest size accepted by `eye`, `zeros` and `ones`. The matrix type keeps
/// one length per dimension, so the size also bounds that list.
pub const MAX_CONSTRUCTOR_SIZE: i64 = 1 << 16;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SemanticError {
    #[error("Undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("Incorrect types of operand `{op}` values: {left} and {right}")]
    IncorrectOperandTypes { op: BinaryOp, left: Type, right: Type },
    #[error("Different sizes of operand `{op}` parts: {left} and {right}")]
    ShapeMismatch {
        op: BinaryOp,
        left: MatrixType,
        right: MatrixType,
    },
    #[error("Incorrect type for unary `{op}` expression: {operand}")]
    UnaryOperandType { op: UnaryOp, operand: Type },
    #[error("Invalid matrix, a matrix can contain only submatrices or values of the same type")]
    InvalidMatrix,
    #[error("Only matrices can be accessed by index, `{name}` is {found}")]
    NotIndexable { name: String, found: Type },
    #[error("Too many dimensions specified in index list: {given} for {matrix}")]
    TooManyIndices { given: usize, matrix: MatrixType },
    #[error("Specified index {index} is out of matrix dimension range 1..={length}")]
    IndexOutOfRange { index: i64, length: usize },
    #[error("Incorrect range expression type: {0}")]
    RangeType(Type),
    #[error("Transpose can be applied only to matrices, found {0}")]
    TransposeType(Type),
    #[error("Unexpected break statement outside of loop")]
    BreakOutsideLoop,
    #[error("Unexpected continue statement outside of loop")]
    ContinueOutsideLoop,
    #[error(
        "Matrix size {0} is not supported, sizes are limited to 0..={max} by the implementation",
        max = MAX_CONSTRUCTOR_SIZE
    )]
    InvalidMatrixSize(i64),
    #[error("Cannot assign {value} to an element of type {target}")]
    AssignmentType { target: Type, value: Type },
}

/// A semantic error tied to the source line it was found on.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub error: SemanticError,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.line, self.error)
    }
}

/// Type-checks `root` with a fresh checker. Returns true if at least one
/// semantic error was found.
pub fn check(root: &Node) -> bool {
    TypeChecker::new().check(root)
}

/// Walks the tree assigning a type to every node. Errors are collected, not
/// returned: a failed subexpression is typed `Type::Error`, and anything
/// built on top of it becomes `Type::Error` without a new diagnostic.
pub struct TypeChecker {
    symbols: SymbolTable<Type>,
    loop_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            loop_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn check(&mut self, root: &Node) -> bool {
        debug!("type checking");
        self.visit(root);
        debug!(diagnostics = self.diagnostics.len(), "type checking done");
        self.error_occurred()
    }

    pub fn error_occurred(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn symbols(&self) -> &SymbolTable<Type> {
        &self.symbols
    }

    pub fn visit(&mut self, node: &Node) -> Type {
        match &node.kind {
            NodeKind::CodeBlock(block) => self.visit_block(block, "code_block"),
            NodeKind::IntegerNumber(_) => Type::Integer,
            NodeKind::FloatNumber(_) => Type::Float,
            NodeKind::StringValue(_) => Type::String,
            NodeKind::Variable(name) => self.visit_variable(name, node.line),
            NodeKind::BinaryExpression { op, left, right } => {
                self.visit_binary(*op, left, right, node.line)
            }
            NodeKind::UnaryExpression { op, operand } => self.visit_unary(*op, operand, node.line),
            NodeKind::Matrix(matrix) => self.visit_matrix(matrix),
            NodeKind::ElementAccessExpression { variable, index } => {
                self.visit_element_access(variable, index, node.line)
            }
            NodeKind::IfStatement(statement) => self.visit_if(statement),
            NodeKind::WhileStatement(statement) => self.visit_while(statement),
            NodeKind::ForStatement(statement) => self.visit_for(statement),
            NodeKind::ReturnStatement(value) => match value {
                Some(value) => self.visit(value),
                None => Type::CodeBlock,
            },
            NodeKind::BreakStatement => {
                if self.loop_depth == 0 {
                    self.report(node.line, SemanticError::BreakOutsideLoop);
                }
                Type::CodeBlock
            }
            NodeKind::ContinueStatement => {
                if self.loop_depth == 0 {
                    self.report(node.line, SemanticError::ContinueOutsideLoop);
                }
                Type::CodeBlock
            }
            NodeKind::TransposeStatement(operand) => self.visit_transpose(operand, node.line),
            NodeKind::PrintStatement(values) => {
                for value in values {
                    self.visit(value);
                }
                Type::CodeBlock
            }
            NodeKind::EyeStatement(size)
            | NodeKind::ZerosStatement(size)
            | NodeKind::OnesStatement(size) => self.visit_matrix_constructor(*size, node.line),
        }
    }

    fn visit_block(&mut self, block: &CodeBlock, label: &str) -> Type {
        self.symbols.push(label);
        for statement in &block.statements {
            self.visit(statement);
        }
        self.symbols.pop();
        Type::CodeBlock
    }

    fn visit_variable(&mut self, name: &str, line: usize) -> Type {
        match self.symbols.lookup(name) {
            Some(ty) => ty.clone(),
            None => self.report(line, SemanticError::UndefinedVariable(name.to_string())),
        }
    }

    fn visit_binary(&mut self, op: BinaryOp, left: &Node, right: &Node, line: usize) -> Type {
        if op == BinaryOp::Assign {
            return self.visit_assignment(left, right, line);
        }

        let left_ty = self.visit(left);
        let right_ty = self.visit(right);
        let result = self.binary_type(op, left_ty, right_ty, line);

        // `x += 2.5` changes what `x` holds where it was declared.
        if op.is_compound_assignment() && !result.is_error() {
            if let NodeKind::Variable(name) = &left.kind {
                self.symbols.update(name, result.clone());
            }
        }
        result
    }

    fn binary_type(&mut self, op: BinaryOp, left: Type, right: Type, line: usize) -> Type {
        if left.is_error() || right.is_error() {
            return Type::Error;
        }

        match binary_result(op, left.tag(), right.tag()) {
            Some(TypeTag::Integer) => Type::Integer,
            Some(TypeTag::Float) => Type::Float,
            Some(TypeTag::String) => Type::String,
            Some(TypeTag::Matrix) => match (left, right) {
                (Type::Matrix(l), Type::Matrix(r)) if l.same_shape(&r) => Type::Matrix(l),
                (Type::Matrix(l), Type::Matrix(r)) => self.report(
                    line,
                    SemanticError::ShapeMismatch {
                        op,
                        left: l,
                        right: r,
                    },
                ),
                (left, right) => {
                    self.report(line, SemanticError::IncorrectOperandTypes { op, left, right })
                }
            },
            Some(TypeTag::Error) | Some(TypeTag::CodeBlock) | None => {
                self.report(line, SemanticError::IncorrectOperandTypes { op, left, right })
            }
        }
    }

    /// `name = value` (re)declares `name` in the current scope. Assigning
    /// into a matrix element requires the element type.
    fn visit_assignment(&mut self, target: &Node, value: &Node, line: usize) -> Type {
        let value_ty = self.visit(value);

        if let NodeKind::Variable(name) = &target.kind {
            self.symbols.declare(name, value_ty.clone());
            return value_ty;
        }

        let target_ty = self.visit(target);
        if target_ty.is_error() || value_ty.is_error() {
            return Type::Error;
        }

        if target_ty == value_ty || (target_ty == Type::Float && value_ty == Type::Integer) {
            target_ty
        } else {
            self.report(
                line,
                SemanticError::AssignmentType {
                    target: target_ty,
                    value: value_ty,
                },
            )
        }
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &Node, line: usize) -> Type {
        let operand_ty = self.visit(operand);
        if operand_ty.is_error() {
            return Type::Error;
        }

        match unary_result(op, operand_ty.tag()) {
            Some(_) => operand_ty,
            None => self.report(
                line,
                SemanticError::UnaryOperandType {
                    op,
                    operand: operand_ty,
                },
            ),
        }
    }

    fn visit_matrix(&mut self, matrix: &Matrix) -> Type {
        match matrix.content() {
            MatrixContent::Values(values) => {
                let types: Vec<Type> = values.iter().map(|value| self.visit(value)).collect();
                if types.iter().any(Type::is_error) {
                    return Type::Error;
                }

                let Some(first) = types.first() else {
                    return Type::matrix(vec![0], Type::Integer);
                };
                if matches!(first, Type::Matrix(_) | Type::CodeBlock)
                    || types.iter().any(|ty| ty != first)
                {
                    return self.report(matrix.line, SemanticError::InvalidMatrix);
                }

                Type::matrix(vec![types.len()], first.clone())
            }
            MatrixContent::Rows(rows) => {
                let types: Vec<Type> = rows.iter().map(|row| self.visit_matrix(row)).collect();
                if types.iter().any(Type::is_error) {
                    return Type::Error;
                }

                match types.first() {
                    Some(Type::Matrix(first)) if types.iter().all(|ty| ty == &types[0]) => {
                        let mut lengths = vec![rows.len()];
                        lengths.extend_from_slice(&first.lengths);
                        Type::matrix(lengths, (*first.element).clone())
                    }
                    _ => self.report(matrix.line, SemanticError::InvalidMatrix),
                }
            }
        }
    }

    fn visit_element_access(&mut self, name: &str, index: &ListOfIntegers, line: usize) -> Type {
        let matrix = match self.visit_variable(name, line) {
            Type::Error => return Type::Error,
            Type::Matrix(matrix) => matrix,
            found => {
                return self.report(
                    line,
                    SemanticError::NotIndexable {
                        name: name.to_string(),
                        found,
                    },
                )
            }
        };

        if index.len() > matrix.dimensions {
            return self.report(
                line,
                SemanticError::TooManyIndices {
                    given: index.len(),
                    matrix,
                },
            );
        }

        let out_of_range = index
            .values
            .iter()
            .zip(&matrix.lengths)
            .find(|&(&index, &length)| index < 1 || index > length as i64);
        if let Some((&index, &length)) = out_of_range {
            return self.report(line, SemanticError::IndexOutOfRange { index, length });
        }

        matrix.slice(index.len())
    }

    fn visit_if(&mut self, statement: &IfStatement) -> Type {
        // Any successfully typed condition is accepted.
        self.visit(&statement.condition);

        self.symbols.push("if");
        self.visit_block(&statement.then_block, "code_block");
        self.symbols.pop();

        if let Some(else_branch) = &statement.else_branch {
            self.symbols.push("else");
            match else_branch {
                ElseBranch::Block(block) => {
                    self.visit_block(block, "code_block");
                }
                ElseBranch::If(nested) => {
                    self.visit(nested);
                }
            }
            self.symbols.pop();
        }

        Type::CodeBlock
    }

    fn visit_while(&mut self, statement: &WhileStatement) -> Type {
        self.loop_depth += 1;
        self.symbols.push("while");

        self.visit(&statement.condition);
        self.visit_block(&statement.body, "code_block");

        self.symbols.pop();
        self.loop_depth -= 1;
        Type::CodeBlock
    }

    fn visit_for(&mut self, statement: &ForStatement) -> Type {
        self.loop_depth += 1;
        self.symbols.push("for");

        let variable_ty = self.visit_range(&statement.range);
        self.symbols.declare(&statement.variable, variable_ty);
        self.visit_block(&statement.body, "code_block");

        self.symbols.pop();
        self.loop_depth -= 1;
        Type::CodeBlock
    }

    /// Type of the loop variable: Integer when both bounds are, else Float.
    fn visit_range(&mut self, range: &RangeExpression) -> Type {
        let low = self.visit(&range.low);
        let high = self.visit(&range.high);

        for bound in [&low, &high] {
            if bound.is_error() {
                return Type::Error;
            }
            if !bound.is_numeric() {
                return self.report(range.line, SemanticError::RangeType(bound.clone()));
            }
        }

        if low == Type::Integer && high == Type::Integer {
            Type::Integer
        } else {
            Type::Float
        }
    }

    fn visit_transpose(&mut self, operand: &Node, line: usize) -> Type {
        match self.visit(operand) {
            Type::Error => Type::Error,
            Type::Matrix(matrix) => Type::Matrix(matrix.transposed()),
            other => self.report(line, SemanticError::TransposeType(other)),
        }
    }

    /// `eye(n)`, `zeros(n)` and `ones(n)` build an n-dimensional matrix
    /// with every length n.
    fn visit_matrix_constructor(&mut self, size: i64, line: usize) -> Type {
        if !(0..=MAX_CONSTRUCTOR_SIZE).contains(&size) {
            return self.report(line, SemanticError::InvalidMatrixSize(size));
        }

        let size = size as usize;
        Type::matrix(vec![size; size], Type::Integer)
    }

    fn report(&mut self, line: usize, error: SemanticError) -> Type {
        let diagnostic = Diagnostic { line, error };
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
        Type::Error
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}
