//! Tokenizer for the filter language.

use strata_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
	/// A bare word: field name or keyword. Keyword recognition happens in
	/// the parser, case-insensitively.
	Word(String),
	/// A single-quoted literal, quotes stripped and `''` unescaped.
	Literal(String),
	LParen,
	RParen,
	Comma,
}

impl std::fmt::Display for TokenKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Word(w) => write!(f, "{w}"),
			Self::Literal(l) => write!(f, "'{l}'"),
			Self::LParen => write!(f, "("),
			Self::RParen => write!(f, ")"),
			Self::Comma => write!(f, ","),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub kind: TokenKind,
	/// Byte offset in the filter string, for error messages.
	pub offset: usize,
}

/// Tokenize one filter string.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
	let bytes = input.as_bytes();
	let mut tokens = Vec::new();
	let mut pos = 0;

	while pos < bytes.len() {
		let c = bytes[pos] as char;

		if c.is_ascii_whitespace() {
			pos += 1;
			continue;
		}

		match c {
			'(' => {
				tokens.push(Token {
					kind: TokenKind::LParen,
					offset: pos,
				});
				pos += 1;
			}
			')' => {
				tokens.push(Token {
					kind: TokenKind::RParen,
					offset: pos,
				});
				pos += 1;
			}
			',' => {
				tokens.push(Token {
					kind: TokenKind::Comma,
					offset: pos,
				});
				pos += 1;
			}
			'\'' => {
				let (literal, next) = scan_literal(input, pos)?;
				tokens.push(Token {
					kind: TokenKind::Literal(literal),
					offset: pos,
				});
				pos = next;
			}
			c if c.is_ascii_alphabetic() || c == '_' => {
				let start = pos;
				while pos < bytes.len() {
					let c = bytes[pos] as char;
					if c.is_ascii_alphanumeric() || c == '_' {
						pos += 1;
					} else {
						break;
					}
				}
				tokens.push(Token {
					kind: TokenKind::Word(input[start..pos].to_string()),
					offset: start,
				});
			}
			other => {
				return Err(Error::filter_parse(
					input,
					format!("unexpected character '{other}' at offset {pos}"),
				));
			}
		}
	}

	Ok(tokens)
}

/// Scan a single-quoted literal starting at `open`. Returns the unescaped
/// content and the offset just past the closing quote.
fn scan_literal(input: &str, open: usize) -> Result<(String, usize)> {
	let bytes = input.as_bytes();
	let mut value = String::new();
	let mut pos = open + 1;

	while pos < bytes.len() {
		if bytes[pos] == b'\'' {
			// '' inside a literal is an escaped quote
			if bytes.get(pos + 1) == Some(&b'\'') {
				value.push('\'');
				pos += 2;
			} else {
				return Ok((value, pos + 1));
			}
		} else {
			let c = input[pos..].chars().next().unwrap_or('\u{fffd}');
			value.push(c);
			pos += c.len_utf8();
		}
	}

	Err(Error::filter_parse(
		input,
		format!("unterminated string literal starting at offset {open}"),
	))
}
