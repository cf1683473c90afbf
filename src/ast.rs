use num_bigint::BigInt;

pub type Identifier = String;
pub type TableName = Identifier;
pub type ColumnName = Identifier;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    String(String),
    Integer(BigInt),
}

/// Comparison operators of the query language. Only `Eq` and `In` are ever
/// rewritten; every other operator is opaque to the rewriter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    Within,
    Like,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Scalar(Literal),
    List(Vec<Literal>),
}

/// An atomic condition: a fixed LHS column compared against an operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub op: Operator,
    pub column: ColumnName,
    pub operand: Operand,
}

/// A filter condition that does not fit the (operator, column, operand)
/// triplet shape, e.g. an arithmetic or aggregate comparison. Carried through
/// the rewrite verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Column(ColumnName),
    Literal(Literal),
    List(Vec<Literal>),
    Call {
        func: Identifier,
        args: Vec<Expr>,
    },
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cmp {
        op: Operator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterEntry {
    Condition(Condition),
    Opaque(Expr),
}

/// Conditions are implicitly conjoined. Order is irrelevant to evaluation but
/// preserved by every transformation, so outputs are deterministic.
pub type Filter = Vec<FilterEntry>;

/// A single-relation filtered select. Together with the `Query::Select` tag
/// this is the only shape the rewriter ever touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Select {
    pub table: TableName,
    pub filter: Filter,
    pub group: Vec<ColumnName>,
    pub projection: Vec<ColumnName>,
}

/// A statement the rewriter does not understand, carried verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unsupported {
    pub verb: Identifier,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    Select(Select),
    Other(Unsupported),
}
