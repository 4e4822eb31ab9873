use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compiler::intermediate::symtab::EntryId;
use crate::compiler::intermediate::typespec::TypeId;

/**
The annotated syntax tree handed over by the external parsing collaborator.

The parser fills in the structural fields and source line numbers. The
`ty` and `entry` slots on expression and identifier nodes start out empty
and are populated by the semantic pass; the code generator then reads them
and must never see an unresolved slot. Because the annotations are an
artifact of analysis, not of parsing, they are skipped during
serialization: the tree crosses the process boundary bare and is resolved
on this side.
*/

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub line: u32,
    pub routines: Vec<Routine>,
    pub main: Vec<Statement>,
    #[serde(skip)]
    pub entry: Option<EntryId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutineKind {
    /// A value-producing routine (a function).
    Definition,
    /// A statement-only routine (a procedure).
    DefinitionNoReturn,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub kind: RoutineKind,
    pub name: String,
    pub line: u32,
    pub params: Vec<Param>,
    /// Explicit return type annotation. `None` means the return type is
    /// inferred from the designated return variable.
    pub return_type: Option<TypeName>,
    /// The designated return variable. `None` for a procedure.
    pub return_var: Option<VariableRef>,
    pub body: Vec<Statement>,
    #[serde(skip)]
    pub entry: Option<EntryId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMode {
    Value,
    Reference,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub type_name: TypeName,
    pub mode: ParamMode,
    pub line: u32,
    #[serde(skip)]
    pub entry: Option<EntryId>,
}

/// A type keyword as written in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeName {
    Number,
    Boolean,
    String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Assignment(Assignment),
    If(IfStatement),
    While(WhileStatement),
    Guard(GuardStatement),
    Call(Call),
    Display(DisplayStatement),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// `Some` for a declaring assignment (`name : type = expr`), `None`
    /// for a bare assignment to an existing name.
    pub declared: Option<TypeName>,
    pub lhs: VariableRef,
    pub rhs: Expression,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub if_branch: CondBranch,
    pub elseif_branches: Vec<CondBranch>,
    pub else_branch: Option<Vec<Statement>>,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CondBranch {
    pub condition: Expression,
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuardStatement {
    pub conditions: Vec<Expression>,
    pub body: Vec<Statement>,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expression>,
    pub line: u32,
    #[serde(skip)]
    pub entry: Option<EntryId>,
    #[serde(skip)]
    pub ty: Option<TypeId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayStatement {
    /// `None` prints a bare newline.
    pub value: Option<Expression>,
    pub line: u32,
}

/// `expression : simpleExpression (relOperator simpleExpression)?`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub first: SimpleExpression,
    pub rel: Option<(RelOp, SimpleExpression)>,
    pub line: u32,
    #[serde(skip)]
    pub ty: Option<TypeId>,
}

/// `simpleExpression : sign? term (addOperator term)*`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleExpression {
    pub sign: Option<Sign>,
    pub terms: Vec<Term>,
    /// One operator between each pair of adjacent terms.
    pub ops: Vec<AddOp>,
    pub line: u32,
    #[serde(skip)]
    pub ty: Option<TypeId>,
}

/// `term : factor (mulOperator factor)*`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub factors: Vec<Factor>,
    pub ops: Vec<MulOp>,
    pub line: u32,
    #[serde(skip)]
    pub ty: Option<TypeId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub kind: FactorKind,
    pub line: u32,
    #[serde(skip)]
    pub ty: Option<TypeId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FactorKind {
    Variable(VariableRef),
    NumberLiteral(f32),
    StringLiteral(String),
    BooleanLiteral(bool),
    Call(Call),
    Not(Box<Factor>),
    Parenthesized(Box<Expression>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableRef {
    pub name: String,
    pub line: u32,
    #[serde(skip)]
    pub entry: Option<EntryId>,
    #[serde(skip)]
    pub ty: Option<TypeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    Plus,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddOp {
    Add,
    Subtract,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MulOp {
    Multiply,
    Divide,
    And,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Expression {
    /// True iff the expression is nothing but a single variable reference.
    /// Reference-parameter arguments must satisfy this.
    pub fn is_variable(&self) -> bool {
        self.as_variable().is_some()
    }

    /// The variable reference when the expression is a bare variable.
    pub fn as_variable(&self) -> Option<&VariableRef> {
        if self.rel.is_some() {
            return None;
        }
        let simple = &self.first;
        if simple.sign.is_some() || simple.terms.len() != 1 {
            return None;
        }
        let term = &simple.terms[0];
        if term.factors.len() != 1 {
            return None;
        }
        match &term.factors[0].kind {
            FactorKind::Variable(v) => Some(v),
            _ => None,
        }
    }
}

// Compact source renderings, used for the "found near" column of the
// semantic error table.

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Number => f.write_str("number"),
            TypeName::Boolean => f.write_str("boolean"),
            TypeName::String => f.write_str("string"),
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sign::Plus => "+",
            Sign::Minus => "-",
        })
    }
}

impl fmt::Display for AddOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddOp::Add => "+",
            AddOp::Subtract => "-",
            AddOp::Or => " or ",
        })
    }
}

impl fmt::Display for MulOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MulOp::Multiply => "*",
            MulOp::Divide => "/",
            MulOp::And => " and ",
        })
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelOp::Eq => "==",
            RelOp::Ne => "<>",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        })
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FactorKind::Variable(v) => write!(f, "{}", v),
            FactorKind::NumberLiteral(n) => write!(f, "{}", n),
            FactorKind::StringLiteral(s) => write!(f, "\"{}\"", s),
            FactorKind::BooleanLiteral(b) => write!(f, "{}", b),
            FactorKind::Call(c) => write!(f, "{}", c),
            FactorKind::Not(inner) => write!(f, "not {}", inner),
            FactorKind::Parenthesized(e) => write!(f, "({})", e),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.factors[0])?;
        for (op, factor) in self.ops.iter().zip(self.factors.iter().skip(1)) {
            write!(f, "{}{}", op, factor)?;
        }
        Ok(())
    }
}

impl fmt::Display for SimpleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sign) = &self.sign {
            write!(f, "{}", sign)?;
        }
        write!(f, "{}", self.terms[0])?;
        for (op, term) in self.ops.iter().zip(self.terms.iter().skip(1)) {
            write!(f, "{}{}", op, term)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        if let Some((op, second)) = &self.rel {
            write!(f, "{}{}", op, second)?;
        }
        Ok(())
    }
}
