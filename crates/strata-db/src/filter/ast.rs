//! The filter expression tree.

use serde::{Deserialize, Serialize};

/// Leaf operators of the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
	// comparison terms
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	// function terms
	Contains,
	NotContains,
	StartsWith,
	NotStartsWith,
	EndsWith,
	NotEndsWith,
	Has,
	NotHas,
	// presence terms, no literal
	IsTrue,
	IsFalse,
	IsEmpty,
	IsNotEmpty,
}

impl FilterOperator {
	/// Whether this operator takes a literal argument.
	pub fn takes_literal(&self) -> bool {
		!matches!(
			self,
			Self::IsTrue | Self::IsFalse | Self::IsEmpty | Self::IsNotEmpty
		)
	}

	/// The keyword as written in the filter language.
	pub fn keyword(&self) -> &'static str {
		match self {
			Self::Eq => "eq",
			Self::Ne => "ne",
			Self::Lt => "lt",
			Self::Le => "le",
			Self::Gt => "gt",
			Self::Ge => "ge",
			Self::Contains => "contains",
			Self::NotContains => "notcontains",
			Self::StartsWith => "startswith",
			Self::NotStartsWith => "notstartswith",
			Self::EndsWith => "endswith",
			Self::NotEndsWith => "notendswith",
			Self::Has => "has",
			Self::NotHas => "nothas",
			Self::IsTrue => "istrue",
			Self::IsFalse => "isfalse",
			Self::IsEmpty => "isempty",
			Self::IsNotEmpty => "isnotempty",
		}
	}

	/// Comparison operators usable in infix position.
	pub fn from_comparison_keyword(word: &str) -> Option<Self> {
		match word {
			"eq" => Some(Self::Eq),
			"ne" => Some(Self::Ne),
			"lt" => Some(Self::Lt),
			"le" => Some(Self::Le),
			"gt" => Some(Self::Gt),
			"ge" => Some(Self::Ge),
			_ => None,
		}
	}

	/// Function-style operators: `fn(field, 'literal')`.
	pub fn from_function_keyword(word: &str) -> Option<Self> {
		match word {
			"contains" => Some(Self::Contains),
			"notcontains" => Some(Self::NotContains),
			"startswith" => Some(Self::StartsWith),
			"notstartswith" => Some(Self::NotStartsWith),
			"endswith" => Some(Self::EndsWith),
			"notendswith" => Some(Self::NotEndsWith),
			"has" => Some(Self::Has),
			"nothas" => Some(Self::NotHas),
			_ => None,
		}
	}

	/// Zero-argument presence operators in postfix position.
	pub fn from_presence_keyword(word: &str) -> Option<Self> {
		match word {
			"istrue" => Some(Self::IsTrue),
			"isfalse" => Some(Self::IsFalse),
			"isempty" => Some(Self::IsEmpty),
			"isnotempty" => Some(Self::IsNotEmpty),
			_ => None,
		}
	}
}

/// Boolean combinator of a group node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOperator {
	And,
	Or,
}

impl GroupOperator {
	pub fn to_sql(&self) -> &'static str {
		match self {
			Self::And => "AND",
			Self::Or => "OR",
		}
	}
}

/// One node of a parsed filter expression.
///
/// Leaves carry `{field, operator, literal-or-absent}`; groups carry their
/// combinator and children in insertion order; negation wraps a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
	Condition {
		field: String,
		operator: FilterOperator,
		value: Option<String>,
	},
	Group {
		op: GroupOperator,
		children: Vec<FilterNode>,
	},
	Not(Box<FilterNode>),
}

impl FilterNode {
	pub fn condition(
		field: impl Into<String>,
		operator: FilterOperator,
		value: Option<String>,
	) -> Self {
		Self::Condition {
			field: field.into(),
			operator,
			value,
		}
	}

	/// Combine two nodes with a combinator, flattening same-operator groups
	/// on the left so `a and b and c` parses to one three-child group.
	pub fn combine(op: GroupOperator, left: Self, right: Self) -> Self {
		match left {
			Self::Group {
				op: existing,
				mut children,
			} if existing == op => {
				children.push(right);
				Self::Group { op, children }
			}
			other => Self::Group {
				op,
				children: vec![other, right],
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn combine_flattens_left_associative_chains() {
		let a = FilterNode::condition("a", FilterOperator::IsTrue, None);
		let b = FilterNode::condition("b", FilterOperator::IsTrue, None);
		let c = FilterNode::condition("c", FilterOperator::IsTrue, None);

		let ab = FilterNode::combine(GroupOperator::And, a, b);
		let abc = FilterNode::combine(GroupOperator::And, ab, c);

		match abc {
			FilterNode::Group { op, children } => {
				assert_eq!(op, GroupOperator::And);
				assert_eq!(children.len(), 3);
			}
			other => panic!("expected group, got {other:?}"),
		}
	}

	#[test]
	fn combine_keeps_mixed_operators_nested() {
		let a = FilterNode::condition("a", FilterOperator::IsTrue, None);
		let b = FilterNode::condition("b", FilterOperator::IsTrue, None);
		let c = FilterNode::condition("c", FilterOperator::IsTrue, None);

		let ab = FilterNode::combine(GroupOperator::And, a, b);
		let or = FilterNode::combine(GroupOperator::Or, ab, c);

		match or {
			FilterNode::Group { op, children } => {
				assert_eq!(op, GroupOperator::Or);
				assert_eq!(children.len(), 2);
				assert!(matches!(&children[0], FilterNode::Group { .. }));
			}
			other => panic!("expected group, got {other:?}"),
		}
	}
}
