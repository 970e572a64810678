use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

/// A WebAssembly value category. `Any` and `None` exist only at validation
/// time: `Any` is the bottom type produced by reads in unreachable code, and
/// `None` marks a read past the bottom of the operand stack. Neither is valid
/// in an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
	None,
	Any,
	I32,
	I64,
	F32,
	F64,
	V128,
	AnyRef,
	FuncRef,
	NullRef,
}

impl ValueType {
	pub fn is_numeric(self) -> bool {
		match self {
			ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64 | ValueType::V128 => true,
			_ => false,
		}
	}

	pub fn is_reference(self) -> bool {
		match self {
			ValueType::AnyRef | ValueType::FuncRef | ValueType::NullRef => true,
			_ => false,
		}
	}
}

impl Display for ValueType {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.write_str(match self {
			ValueType::None => "none",
			ValueType::Any => "any",
			ValueType::I32 => "i32",
			ValueType::I64 => "i64",
			ValueType::F32 => "f32",
			ValueType::F64 => "f64",
			ValueType::V128 => "v128",
			ValueType::AnyRef => "anyref",
			ValueType::FuncRef => "funcref",
			ValueType::NullRef => "nullref",
		})
	}
}

/// Whether a value of type `actual` may be used where `expected` is demanded.
/// `Any` on either side always matches: an unreachable read produces a value
/// of any type, and an expectation of `Any` accepts a value of any type.
pub fn is_subtype(actual: ValueType, expected: ValueType) -> bool {
	if actual == expected {
		return true;
	}
	match (actual, expected) {
		(ValueType::Any, _) | (_, ValueType::Any) => true,
		(ValueType::NullRef, ValueType::FuncRef) => true,
		(ValueType::NullRef, ValueType::AnyRef) => true,
		(ValueType::FuncRef, ValueType::AnyRef) => true,
		_ => false,
	}
}

/// The subset of value types a table may hold. `None` is the decoder's
/// placeholder for a malformed element type and never validates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceType {
	None,
	AnyRef,
	FuncRef,
}

impl ReferenceType {
	pub fn as_value_type(self) -> ValueType {
		match self {
			ReferenceType::None => ValueType::None,
			ReferenceType::AnyRef => ValueType::AnyRef,
			ReferenceType::FuncRef => ValueType::FuncRef,
		}
	}
}

impl Display for ReferenceType {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		Display::fmt(&self.as_value_type(), f)
	}
}

/// An ordered sequence of value types, used for params and results.
pub type TypeTuple = Vec<ValueType>;

/// `max == UNBOUNDED` means no declared maximum.
pub const UNBOUNDED: u64 = u64::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeConstraints {
	pub min: u64,
	pub max: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionType {
	pub params: TypeTuple,
	pub results: TypeTuple,
}

impl FunctionType {
	pub fn new(params: TypeTuple, results: TypeTuple) -> Self {
		FunctionType { params, results }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableType {
	pub element_type: ReferenceType,
	pub is_shared: bool,
	pub size: SizeConstraints,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryType {
	pub is_shared: bool,
	pub size: SizeConstraints,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalType {
	pub is_mutable: bool,
	pub value_type: ValueType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExceptionType {
	pub params: TypeTuple,
}
