//! Recursive-descent parser for the filter language.

use strata_core::{Error, Result, normalize_name};

use super::ast::{FilterNode, FilterOperator, GroupOperator};
use super::lexer::{Token, TokenKind, tokenize};

/// Parse one filter string into an expression tree.
///
/// # Examples
///
/// ```
/// use strata_db::filter::{FilterNode, parse_filter};
///
/// let tree = parse_filter("featured istrue and views gt '10'").unwrap();
/// assert!(matches!(tree, FilterNode::Group { .. }));
/// ```
pub fn parse_filter(input: &str) -> Result<FilterNode> {
	let tokens = tokenize(input)?;
	let mut parser = Parser {
		input,
		tokens,
		pos: 0,
	};
	let node = parser.or_expr()?;
	if let Some(token) = parser.peek() {
		return Err(Error::filter_parse(
			input,
			format!("unexpected trailing input at offset {}", token.offset),
		));
	}
	Ok(node)
}

/// Parse several independently-supplied filter strings and combine them
/// with AND at the top level, each string one parenthesized clause. Returns
/// `None` when no strings were supplied.
pub fn parse_filters<S: AsRef<str>>(inputs: &[S]) -> Result<Option<FilterNode>> {
	let mut clauses = Vec::with_capacity(inputs.len());
	for input in inputs {
		clauses.push(parse_filter(input.as_ref())?);
	}

	Ok(match clauses.len() {
		0 => None,
		1 => clauses.pop(),
		_ => Some(FilterNode::Group {
			op: GroupOperator::And,
			children: clauses,
		}),
	})
}

struct Parser<'a> {
	input: &'a str,
	tokens: Vec<Token>,
	pos: usize,
}

impl Parser<'_> {
	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.pos)
	}

	fn advance(&mut self) -> Option<Token> {
		let token = self.tokens.get(self.pos).cloned();
		if token.is_some() {
			self.pos += 1;
		}
		token
	}

	fn error(&self, reason: impl Into<String>) -> Error {
		Error::filter_parse(self.input, reason)
	}

	/// Peek the current token as a lowercased word, if it is one.
	fn peek_word(&self) -> Option<String> {
		match self.peek() {
			Some(Token {
				kind: TokenKind::Word(w),
				..
			}) => Some(w.to_ascii_lowercase()),
			_ => None,
		}
	}

	fn expect(&mut self, expected: &TokenKind) -> Result<()> {
		match self.advance() {
			Some(token) if &token.kind == expected => Ok(()),
			Some(token) => Err(self.error(format!(
				"expected '{expected}' but found '{}' at offset {}",
				token.kind, token.offset
			))),
			None => Err(self.error(format!("expected '{expected}' but input ended"))),
		}
	}

	fn or_expr(&mut self) -> Result<FilterNode> {
		let mut node = self.and_expr()?;
		while self.peek_word().as_deref() == Some("or") {
			self.advance();
			let right = self.and_expr()?;
			node = FilterNode::combine(GroupOperator::Or, node, right);
		}
		Ok(node)
	}

	fn and_expr(&mut self) -> Result<FilterNode> {
		let mut node = self.unary()?;
		while self.peek_word().as_deref() == Some("and") {
			self.advance();
			let right = self.unary()?;
			node = FilterNode::combine(GroupOperator::And, node, right);
		}
		Ok(node)
	}

	fn unary(&mut self) -> Result<FilterNode> {
		if self.peek_word().as_deref() == Some("not") {
			self.advance();
			let inner = self.unary()?;
			return Ok(FilterNode::Not(Box::new(inner)));
		}
		self.primary()
	}

	fn primary(&mut self) -> Result<FilterNode> {
		match self.peek() {
			Some(Token {
				kind: TokenKind::LParen,
				..
			}) => {
				self.advance();
				let inner = self.or_expr()?;
				self.expect(&TokenKind::RParen)?;
				Ok(inner)
			}
			Some(Token {
				kind: TokenKind::Word(_),
				..
			}) => self.term(),
			Some(token) => Err(self.error(format!(
				"expected a term but found '{}' at offset {}",
				token.kind, token.offset
			))),
			None => Err(self.error("empty filter expression")),
		}
	}

	/// One leaf term, starting at a word token.
	fn term(&mut self) -> Result<FilterNode> {
		let word = match self.advance() {
			Some(Token {
				kind: TokenKind::Word(w),
				..
			}) => w.to_ascii_lowercase(),
			_ => return Err(self.error("expected a term")),
		};

		// Function form wins only with an immediate '(' — a field may
		// legitimately be named e.g. `contains`.
		if let Some(operator) = FilterOperator::from_function_keyword(&word)
			&& matches!(
				self.peek(),
				Some(Token {
					kind: TokenKind::LParen,
					..
				})
			) {
			self.advance();
			let field = match self.advance() {
				Some(Token {
					kind: TokenKind::Word(w),
					..
				}) => normalize_name(&w),
				Some(token) => {
					return Err(self.error(format!(
						"expected a field name but found '{}' at offset {}",
						token.kind, token.offset
					)));
				}
				None => return Err(self.error("expected a field name but input ended")),
			};
			self.expect(&TokenKind::Comma)?;
			let value = self.literal()?;
			self.expect(&TokenKind::RParen)?;
			return Ok(FilterNode::condition(field, operator, Some(value)));
		}

		let field = normalize_name(&word);
		let op_word = self
			.peek_word()
			.ok_or_else(|| self.error(format!("field '{field}' is missing an operator")))?;

		if let Some(operator) = FilterOperator::from_comparison_keyword(&op_word) {
			self.advance();
			let value = self.literal()?;
			return Ok(FilterNode::condition(field, operator, Some(value)));
		}

		if let Some(operator) = FilterOperator::from_presence_keyword(&op_word) {
			self.advance();
			return Ok(FilterNode::condition(field, operator, None));
		}

		Err(self.error(format!(
			"unknown operator '{op_word}' after field '{field}'"
		)))
	}

	fn literal(&mut self) -> Result<String> {
		match self.advance() {
			Some(Token {
				kind: TokenKind::Literal(value),
				..
			}) => Ok(value),
			Some(token) => Err(self.error(format!(
				"expected a quoted literal but found '{}' at offset {}",
				token.kind, token.offset
			))),
			None => Err(self.error("expected a quoted literal but input ended")),
		}
	}
}
