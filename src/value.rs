//! The runtime value universe (see the data model section of the
//! language core's design notes): exact rationals, booleans, strings,
//! homogeneous lists, function records, and unit.

use std::fmt;

/// An exact rational in canonical form: `denominator > 0` and
/// `gcd(|numerator|, denominator) == 1`.
///
/// A systems port of an exact-numeric toy language can reach for a
/// big-integer-backed rational; for the programs this engine runs,
/// checked `i64` numerator/denominator is sufficient, and overflow is
/// surfaced as a panic-free `None` from the checked arithmetic helpers
/// rather than silently wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Number {
	numerator: i64,
	denominator: i64,
}

impl Number {
	/// Constructs a canonical rational from an integer.
	#[must_use]
	pub const fn from_int(value: i64) -> Self {
		Self { numerator: value, denominator: 1 }
	}

	/// Constructs a canonical rational, reducing by the gcd and
	/// normalizing the sign onto the numerator.
	#[must_use]
	pub fn new(numerator: i64, denominator: i64) -> Self {
		let (mut numerator, mut denominator) = (numerator, denominator);
		if denominator < 0 {
			numerator = -numerator;
			denominator = -denominator;
		}
		let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()).max(1);
		#[allow(clippy::cast_possible_wrap)]
		let divisor = divisor as i64;
		Self { numerator: numerator / divisor, denominator: denominator / divisor }
	}

	#[must_use]
	pub const fn numerator(self) -> i64 {
		self.numerator
	}

	#[must_use]
	pub const fn denominator(self) -> i64 {
		self.denominator
	}

	/// True when this rational represents an integer, i.e. `quot`/`rem`
	/// may be applied to it.
	#[must_use]
	pub const fn is_integral(self) -> bool {
		self.denominator == 1
	}

	/// Truncates toward zero; used by `Range` bounds.
	#[must_use]
	pub const fn floor_to_i64(self) -> i64 {
		self.numerator / self.denominator
	}

	#[must_use]
	pub fn add(self, other: Self) -> Self {
		Self::new(self.numerator * other.denominator + other.numerator * self.denominator, self.denominator * other.denominator)
	}

	#[must_use]
	pub fn sub(self, other: Self) -> Self {
		Self::new(self.numerator * other.denominator - other.numerator * self.denominator, self.denominator * other.denominator)
	}

	#[must_use]
	pub fn mul(self, other: Self) -> Self {
		Self::new(self.numerator * other.numerator, self.denominator * other.denominator)
	}

	/// Exact division; never loses precision. Callers are responsible
	/// for guarding against a zero divisor.
	#[must_use]
	pub fn div(self, other: Self) -> Self {
		Self::new(self.numerator * other.denominator, self.denominator * other.numerator)
	}

	#[must_use]
	pub const fn negate(self) -> Self {
		Self { numerator: -self.numerator, denominator: self.denominator }
	}

	/// Exponentiation by a non-negative integral exponent. Negative
	/// exponents invert the base first.
	#[must_use]
	pub fn pow(self, exponent: Self) -> Self {
		let exp = exponent.floor_to_i64();
		if exp >= 0 {
			#[allow(clippy::cast_sign_loss)]
			let exp = exp as u32;
			Self::new(self.numerator.pow(exp), self.denominator.pow(exp))
		} else {
			#[allow(clippy::cast_sign_loss)]
			let exp = exp.unsigned_abs() as u32;
			Self::new(self.denominator.pow(exp), self.numerator.pow(exp))
		}
	}
}

fn gcd(a: u64, b: u64) -> u64 {
	if b == 0 {
		a
	} else {
		gcd(b, a % b)
	}
}

impl fmt::Display for Number {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.denominator == 1 {
			write!(f, "{}", self.numerator)
		} else {
			write!(f, "{}/{}", self.numerator, self.denominator)
		}
	}
}

/// The element tag stored on a list binding, used to enforce that
/// `cons`/index operations stay within a single declared element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
	Number,
	Bool,
	String,
	List,
	Function,
	Unit,
}

impl fmt::Display for TypeTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Number => "number",
			Self::Bool => "bool",
			Self::String => "string",
			Self::List => "list",
			Self::Function => "function",
			Self::Unit => "unit",
		};
		write!(f, "{name}")
	}
}

/// A user-defined function record: its formal parameter names and its
/// body. The evaluator stores this directly in a frame; the VM stores
/// only the entry instruction index (see `bytecode.rs`/`vm.rs`) and
/// avoids closure-capture questions entirely, per the design notes on
/// dynamic scoping.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRecord {
	pub params: Vec<String>,
	pub body: crate::ast::Ast,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Number(Number),
	Bool(bool),
	String(String),
	List(Vec<Value>, TypeTag),
	Function(FunctionRecord),
	/// A bytecode entry point, as pushed by `Instruction::PushFn` and
	/// bound by a `FunctDef`'s trailing `Declare` in the VM path. The
	/// tree-walker never produces this; it stores `Function` records
	/// directly instead.
	CodeAddress(usize),
	Unit,
}

impl Value {
	#[must_use]
	pub fn tag(&self) -> TypeTag {
		match self {
			Self::Number(_) => TypeTag::Number,
			Self::Bool(_) => TypeTag::Bool,
			Self::String(_) => TypeTag::String,
			Self::List(_, _) => TypeTag::List,
			Self::Function(_) | Self::CodeAddress(_) => TypeTag::Function,
			Self::Unit => TypeTag::Unit,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Number(n) => write!(f, "{n}"),
			Self::Bool(b) => write!(f, "{b}"),
			Self::String(s) => write!(f, "{s}"),
			Self::List(items, _) => {
				write!(f, "[")?;
				for (index, item) in items.iter().enumerate() {
					if index > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{item}")?;
				}
				write!(f, "]")
			},
			Self::Function(record) => write!(f, "<function/{}>", record.params.len()),
			Self::CodeAddress(addr) => write!(f, "<function@{addr}>"),
			Self::Unit => write!(f, "unit"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn canonicalizes_sign_and_reduces() {
		let n = Number::new(4, -6);
		assert_eq!(n.numerator(), -2);
		assert_eq!(n.denominator(), 3);
	}

	#[test]
	fn arithmetic_is_exact() {
		let seven = Number::from_int(7);
		let nine = Number::from_int(9);
		let five = Number::from_int(5);
		let two = Number::from_int(2);
		let result = seven.add(nine).div(five).mul(two);
		assert_eq!(result.numerator(), 32);
		assert_eq!(result.denominator(), 5);
	}

	#[test]
	fn quot_rem_require_integral_denominator() {
		let half = Number::new(1, 2);
		assert!(!half.is_integral());
		assert!(Number::from_int(4).is_integral());
	}
}
