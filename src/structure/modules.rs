use crate::structure::{
	operators::Operator,
	types::{ExceptionType, FunctionType, GlobalType, MemoryType, TableType, ValueType},
};
use alloc::{string::String, vec::Vec};

/// Most 64KiB pages a memory may declare.
pub const MAX_MEMORY_PAGES: u64 = 65536;
/// Most elements a table may declare.
pub const MAX_TABLE_ELEMS: u64 = u32::MAX as u64;
/// Most results a function type used as a function signature may carry.
pub const MAX_RETURN_VALUES: usize = 16;

/// The set of WebAssembly extensions a validation pass accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureSpec {
	pub mvp: bool,
	pub simd: bool,
	pub reference_types: bool,
	pub multiple_results_and_block_params: bool,
	pub shared_tables: bool,
	pub atomics: bool,
	pub exception_handling: bool,
	pub import_export_mutable_globals: bool,
	pub require_shared_flag_for_atomic_operators: bool,
}

impl FeatureSpec {
	/// Everything off. Rarely what you want; `Default` enables the MVP.
	pub fn none() -> Self {
		FeatureSpec {
			mvp: false,
			simd: false,
			reference_types: false,
			multiple_results_and_block_params: false,
			shared_tables: false,
			atomics: false,
			exception_handling: false,
			import_export_mutable_globals: false,
			require_shared_flag_for_atomic_operators: false,
		}
	}

	/// Every extension on.
	pub fn all() -> Self {
		FeatureSpec {
			mvp: true,
			simd: true,
			reference_types: true,
			multiple_results_and_block_params: true,
			shared_tables: true,
			atomics: true,
			exception_handling: true,
			import_export_mutable_globals: true,
			require_shared_flag_for_atomic_operators: false,
		}
	}

	pub fn has(&self, feature: Feature) -> bool {
		match feature {
			Feature::Mvp => self.mvp,
			Feature::Simd => self.simd,
			Feature::ReferenceTypes => self.reference_types,
			Feature::MultipleResultsAndBlockParams => self.multiple_results_and_block_params,
			Feature::SharedTables => self.shared_tables,
			Feature::Atomics => self.atomics,
			Feature::ExceptionHandling => self.exception_handling,
			Feature::ImportExportMutableGlobals => self.import_export_mutable_globals,
			Feature::RequireSharedFlagForAtomicOperators => self.require_shared_flag_for_atomic_operators,
		}
	}
}

impl Default for FeatureSpec {
	fn default() -> Self {
		FeatureSpec { mvp: true, import_export_mutable_globals: true, ..FeatureSpec::none() }
	}
}

/// Names a `FeatureSpec` flag, so an operator can declare which flag gates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
	Mvp,
	Simd,
	ReferenceTypes,
	MultipleResultsAndBlockParams,
	SharedTables,
	Atomics,
	ExceptionHandling,
	ImportExportMutableGlobals,
	RequireSharedFlagForAtomicOperators,
}

impl Feature {
	/// The token used in "requires ... feature" errors.
	pub fn name(self) -> &'static str {
		match self {
			Feature::Mvp => "mvp",
			Feature::Simd => "simd",
			Feature::ReferenceTypes => "reference types",
			Feature::MultipleResultsAndBlockParams => "multivalue",
			Feature::SharedTables => "shared tables",
			Feature::Atomics => "atomics",
			Feature::ExceptionHandling => "exception handling",
			Feature::ImportExportMutableGlobals => "mutable global import/export",
			Feature::RequireSharedFlagForAtomicOperators => "shared flag for atomic operators",
		}
	}
}

/// An import of a single external with its declared type.
#[derive(Clone, Debug, PartialEq)]
pub struct Import<Type> {
	pub module_name: String,
	pub export_name: String,
	pub typ: Type,
}

/// Yields the declared type of a definition in an index space.
pub trait DeclaredType<Type> {
	fn declared_type(&self) -> &Type;
}

/// An index space over imported entries followed by module-defined entries.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexSpace<Definition, Type> {
	pub imports: Vec<Import<Type>>,
	pub defs: Vec<Definition>,
}

impl<Definition: DeclaredType<Type>, Type> IndexSpace<Definition, Type> {
	pub fn size(&self) -> usize {
		self.imports.len() + self.defs.len()
	}

	/// The declared type of the entry at `index`, which must be less than
	/// `size()`; callers bounds-check first.
	pub fn get_type(&self, index: usize) -> &Type {
		if index < self.imports.len() {
			&self.imports[index].typ
		} else {
			self.defs[index - self.imports.len()].declared_type()
		}
	}
}

impl<Definition, Type> Default for IndexSpace<Definition, Type> {
	fn default() -> Self {
		IndexSpace { imports: Vec::new(), defs: Vec::new() }
	}
}

/// A reference into the module's type section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexedFunctionType {
	pub index: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionDef {
	pub typ: IndexedFunctionType,
	pub non_parameter_local_types: Vec<ValueType>,
	/// Target-depth lists referenced by `br_table` operators in `code`.
	pub branch_tables: Vec<Vec<usize>>,
	pub code: Vec<Operator>,
}

impl DeclaredType<IndexedFunctionType> for FunctionDef {
	fn declared_type(&self) -> &IndexedFunctionType {
		&self.typ
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableDef {
	pub typ: TableType,
}

impl DeclaredType<TableType> for TableDef {
	fn declared_type(&self) -> &TableType {
		&self.typ
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryDef {
	pub typ: MemoryType,
}

impl DeclaredType<MemoryType> for MemoryDef {
	fn declared_type(&self) -> &MemoryType {
		&self.typ
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalDef {
	pub typ: GlobalType,
	pub initializer: InitializerExpression,
}

impl DeclaredType<GlobalType> for GlobalDef {
	fn declared_type(&self) -> &GlobalType {
		&self.typ
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExceptionTypeDef {
	pub typ: ExceptionType,
}

impl DeclaredType<ExceptionType> for ExceptionTypeDef {
	fn declared_type(&self) -> &ExceptionType {
		&self.typ
	}
}

/// A restricted constant expression, as allowed in global, element, and data
/// initializations. `Invalid` is the decoder's placeholder for an expression
/// that was not a recognized constant form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InitializerExpression {
	I32Const(i32),
	I64Const(i64),
	F32Const(f32),
	F64Const(f64),
	V128Const([u8; 16]),
	GlobalGet(usize),
	RefNull,
	RefFunc(usize),
	Invalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternKind {
	Invalid,
	Function,
	Table,
	Memory,
	Global,
	ExceptionType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Export {
	pub name: String,
	pub kind: ExternKind,
	pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Elem {
	RefNull,
	RefFunc(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElemSegment {
	pub is_active: bool,
	pub table_index: usize,
	pub base_offset: InitializerExpression,
	pub elems: Vec<Elem>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataSegment {
	pub is_active: bool,
	pub memory_index: usize,
	pub base_offset: InitializerExpression,
}

/// A decoded module: static content only, no instances. The validator reads
/// it and never holds a reference beyond one validation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
	pub feature_spec: FeatureSpec,
	pub types: Vec<FunctionType>,
	pub functions: IndexSpace<FunctionDef, IndexedFunctionType>,
	pub tables: IndexSpace<TableDef, TableType>,
	pub memories: IndexSpace<MemoryDef, MemoryType>,
	pub globals: IndexSpace<GlobalDef, GlobalType>,
	pub exception_types: IndexSpace<ExceptionTypeDef, ExceptionType>,
	pub exports: Vec<Export>,
	pub start_function_index: Option<usize>,
	pub elem_segments: Vec<ElemSegment>,
	pub data_segments: Vec<DataSegment>,
}
