// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_storage::Table;
use forgedb_type::{ColumnId, ParameterId, Type, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
	Add,
	Subtract,
	Multiply,
	Divide,
	Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
	Equals,
	NotEquals,
	LessThan,
	LessThanEquals,
	GreaterThan,
	GreaterThanEquals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
	And,
	Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
	Count,
	CountDistinct,
	Sum,
	Min,
	Max,
	Avg,
}

impl AggregateFunction {
	pub fn name(&self) -> &'static str {
		match self {
			AggregateFunction::Count | AggregateFunction::CountDistinct => "COUNT",
			AggregateFunction::Sum => "SUM",
			AggregateFunction::Min => "MIN",
			AggregateFunction::Max => "MAX",
			AggregateFunction::Avg => "AVG",
		}
	}
}

/// A column of a table some plan node produces. Equality is identity of
/// the originating table plus the column position, matching how the plan
/// optimizer resolves columns across nodes.
#[derive(Debug, Clone)]
pub struct ColumnRef {
	pub table: Arc<Table>,
	pub column_id: ColumnId,
}

impl ColumnRef {
	pub fn new(table: Arc<Table>, column_id: ColumnId) -> Self {
		Self { table, column_id }
	}

	pub fn name(&self) -> String {
		self.table.column_def(self.column_id).map(|def| def.name.clone()).unwrap_or_else(|_| self.column_id.to_string())
	}

	pub fn ty(&self) -> Type {
		self.table.column_type(self.column_id).unwrap_or(Type::Undefined)
	}

	pub fn nullable(&self) -> bool {
		self.table.column_is_nullable(self.column_id).unwrap_or(true)
	}
}

impl PartialEq for ColumnRef {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.table, &other.table) && self.column_id == other.column_id
	}
}

/// An aggregate over one argument expression, or over nothing for
/// `COUNT(*)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpression {
	pub function: AggregateFunction,
	pub argument: Option<Expression>,
}

impl AggregateExpression {
	pub fn new(function: AggregateFunction, argument: Option<Expression>) -> Self {
		Self { function, argument }
	}

	pub fn as_column_name(&self) -> String {
		match &self.argument {
			Some(argument) => format!("{}({})", self.function.name(), argument.as_column_name()),
			None => format!("{}(*)", self.function.name()),
		}
	}
}

/// The plan-level expression language. The jit-aware translator supports
/// a subset (columns, literals, typed parameters, arithmetic, comparisons
/// and logical connectives, between, null checks); everything else makes
/// the surrounding plan node fall back to the non-JIT operators.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
	Column(ColumnRef),
	Literal(Value),
	Parameter {
		id: ParameterId,
		ty: Option<Type>,
		nullable: bool,
	},
	Arithmetic {
		op: ArithmeticOp,
		left: Box<Expression>,
		right: Box<Expression>,
	},
	Comparison {
		op: ComparisonOp,
		left: Box<Expression>,
		right: Box<Expression>,
	},
	Between {
		value: Box<Expression>,
		lower: Box<Expression>,
		upper: Box<Expression>,
	},
	IsNull(Box<Expression>),
	IsNotNull(Box<Expression>),
	Logical {
		op: LogicalOp,
		left: Box<Expression>,
		right: Box<Expression>,
	},
	In {
		value: Box<Expression>,
		list: Vec<Expression>,
		negated: bool,
	},
	Like {
		value: Box<Expression>,
		pattern: Box<Expression>,
		negated: bool,
	},
	Cast {
		expr: Box<Expression>,
		to: Type,
	},
	Case {
		when: Box<Expression>,
		then: Box<Expression>,
		otherwise: Box<Expression>,
	},
	Call {
		function: String,
		arguments: Vec<Expression>,
	},
	UnaryMinus(Box<Expression>),
}

impl Expression {
	pub fn column(table: &Arc<Table>, column_id: ColumnId) -> Self {
		Expression::Column(ColumnRef::new(Arc::clone(table), column_id))
	}

	pub fn literal(value: impl Into<Value>) -> Self {
		Expression::Literal(value.into())
	}

	pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Self {
		Expression::Comparison { op, left: Box::new(left), right: Box::new(right) }
	}

	pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
		Expression::Arithmetic { op, left: Box::new(left), right: Box::new(right) }
	}

	pub fn and(left: Expression, right: Expression) -> Self {
		Expression::Logical { op: LogicalOp::And, left: Box::new(left), right: Box::new(right) }
	}

	pub fn or(left: Expression, right: Expression) -> Self {
		Expression::Logical { op: LogicalOp::Or, left: Box::new(left), right: Box::new(right) }
	}

	pub fn between(value: Expression, lower: Expression, upper: Expression) -> Self {
		Expression::Between { value: Box::new(value), lower: Box::new(lower), upper: Box::new(upper) }
	}

	/// The type this expression evaluates to, as far as the plan can
	/// tell without executing it.
	pub fn ty(&self) -> Type {
		match self {
			Expression::Column(column) => column.ty(),
			Expression::Literal(value) => value.ty(),
			Expression::Parameter { ty, .. } => ty.unwrap_or(Type::Undefined),
			Expression::Arithmetic { left, right, .. } => {
				left.ty().promote(right.ty()).unwrap_or(Type::Undefined)
			}
			Expression::Comparison { .. }
			| Expression::Between { .. }
			| Expression::IsNull(_)
			| Expression::IsNotNull(_)
			| Expression::Logical { .. }
			| Expression::In { .. }
			| Expression::Like { .. } => Type::Bool,
			Expression::Cast { to, .. } => *to,
			Expression::Case { then, .. } => then.ty(),
			Expression::Call { .. } => Type::Undefined,
			Expression::UnaryMinus(expr) => expr.ty(),
		}
	}

	pub fn nullable(&self) -> bool {
		match self {
			Expression::Column(column) => column.nullable(),
			Expression::Literal(value) => value.is_undefined(),
			Expression::Parameter { nullable, .. } => *nullable,
			Expression::Arithmetic { left, right, .. }
			| Expression::Comparison { left, right, .. }
			| Expression::Logical { left, right, .. } => left.nullable() || right.nullable(),
			Expression::Between { value, lower, upper } => {
				value.nullable() || lower.nullable() || upper.nullable()
			}
			Expression::IsNull(_) | Expression::IsNotNull(_) => false,
			Expression::In { value, .. } | Expression::Like { value, .. } => value.nullable(),
			Expression::Cast { expr, .. } | Expression::UnaryMinus(expr) => expr.nullable(),
			Expression::Case { .. } | Expression::Call { .. } => true,
		}
	}

	/// The name this expression gets when it becomes an output column.
	pub fn as_column_name(&self) -> String {
		match self {
			Expression::Column(column) => column.name(),
			Expression::Literal(value) => value.to_string(),
			Expression::Parameter { id, .. } => id.to_string(),
			Expression::Arithmetic { op, left, right } => {
				let symbol = match op {
					ArithmeticOp::Add => "+",
					ArithmeticOp::Subtract => "-",
					ArithmeticOp::Multiply => "*",
					ArithmeticOp::Divide => "/",
					ArithmeticOp::Modulo => "%",
				};
				format!("{} {} {}", left.as_column_name(), symbol, right.as_column_name())
			}
			Expression::Comparison { op, left, right } => {
				let symbol = match op {
					ComparisonOp::Equals => "=",
					ComparisonOp::NotEquals => "<>",
					ComparisonOp::LessThan => "<",
					ComparisonOp::LessThanEquals => "<=",
					ComparisonOp::GreaterThan => ">",
					ComparisonOp::GreaterThanEquals => ">=",
				};
				format!("{} {} {}", left.as_column_name(), symbol, right.as_column_name())
			}
			Expression::Between { value, lower, upper } => format!(
				"{} BETWEEN {} AND {}",
				value.as_column_name(),
				lower.as_column_name(),
				upper.as_column_name()
			),
			Expression::IsNull(expr) => format!("{} IS NULL", expr.as_column_name()),
			Expression::IsNotNull(expr) => format!("{} IS NOT NULL", expr.as_column_name()),
			Expression::Logical { op, left, right } => {
				let symbol = match op {
					LogicalOp::And => "AND",
					LogicalOp::Or => "OR",
				};
				format!("{} {} {}", left.as_column_name(), symbol, right.as_column_name())
			}
			Expression::In { value, negated, .. } => {
				format!("{}{} IN (...)", value.as_column_name(), if *negated { " NOT" } else { "" })
			}
			Expression::Like { value, pattern, negated } => format!(
				"{}{} LIKE {}",
				value.as_column_name(),
				if *negated { " NOT" } else { "" },
				pattern.as_column_name()
			),
			Expression::Cast { expr, to } => format!("CAST({} AS {})", expr.as_column_name(), to),
			Expression::Case { .. } => "CASE".to_string(),
			Expression::Call { function, .. } => format!("{function}(...)"),
			Expression::UnaryMinus(expr) => format!("-{}", expr.as_column_name()),
		}
	}
}
