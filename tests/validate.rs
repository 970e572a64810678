use wasm_ir::{
	module_validate,
	structure::{
		modules::{
			DataSegment, Elem, ElemSegment, ExceptionTypeDef, Export, ExternKind, FunctionDef, GlobalDef,
			Import, IndexedFunctionType, InitializerExpression, MemoryDef, Module, TableDef,
		},
		operators::{
			BranchImm, BranchTableImm, CallIndirectImm, ControlStructureImm, DataSegmentAndMemImm,
			ExceptionTypeImm, FunctionImm, IndexedBlockType, LoadOrStoreImm, MemoryCopyImm, MemoryImm,
			Operator, RethrowImm, SelectImm, TableImm, VariableImm,
		},
		types::{
			ExceptionType, FunctionType, GlobalType, MemoryType, ReferenceType, SizeConstraints, TableType,
			ValueType, UNBOUNDED,
		},
	},
	valid,
};

fn ft(params: &[ValueType], results: &[ValueType]) -> FunctionType {
	FunctionType::new(params.to_vec(), results.to_vec())
}

fn module_with_func(function_type: FunctionType, code: Vec<Operator>) -> Module {
	let mut module = Module::default();
	module.types.push(function_type);
	module.functions.defs.push(FunctionDef {
		typ: IndexedFunctionType { index: 0 },
		non_parameter_local_types: vec![],
		branch_tables: vec![],
		code,
	});
	module
}

fn import<T>(typ: T) -> Import<T> {
	Import { module_name: String::from("env"), export_name: String::from("x"), typ }
}

fn memory() -> MemoryDef {
	MemoryDef { typ: MemoryType { is_shared: false, size: SizeConstraints { min: 1, max: UNBOUNDED } } }
}

fn shared_memory() -> MemoryDef {
	MemoryDef { typ: MemoryType { is_shared: true, size: SizeConstraints { min: 1, max: 16 } } }
}

fn table(element_type: ReferenceType) -> TableDef {
	TableDef { typ: TableType { element_type, is_shared: false, size: SizeConstraints { min: 0, max: UNBOUNDED } } }
}

fn mem_arg(alignment_log2: u32) -> LoadOrStoreImm {
	LoadOrStoreImm { alignment_log2, offset: 0 }
}

fn block_type(typ: IndexedBlockType) -> ControlStructureImm {
	ControlStructureImm { typ }
}

fn expect_invalid(module: &Module, token: &str) {
	let err = module_validate(module).expect_err("expected validation failure");
	assert!(err.reason.contains(token), "unexpected reason: {}", err.reason);
}

#[test]
fn empty_function_validates() {
	let module = module_with_func(FunctionType::default(), vec![Operator::End]);
	module_validate(&module).unwrap();
}

#[test]
fn add_operand_type_mismatch() {
	let module = module_with_func(
		ft(&[], &[ValueType::I32]),
		vec![Operator::I64Const(1), Operator::I32Const(2), Operator::I32Add, Operator::End],
	);
	expect_invalid(&module, "type mismatch");
}

#[test]
fn multiple_results_require_multivalue() {
	let mut module = Module::default();
	module.types.push(ft(&[], &[ValueType::I32, ValueType::I32]));
	expect_invalid(&module, "multivalue\" extension is disabled");

	module.feature_spec.multiple_results_and_block_params = true;
	module_validate(&module).unwrap();
}

#[test]
fn unreachable_code_is_stack_polymorphic() {
	let module = module_with_func(ft(&[], &[ValueType::I32]), vec![Operator::Unreachable, Operator::End]);
	module_validate(&module).unwrap();
}

#[test]
fn mutable_global_export_requires_feature() {
	let mut module = Module::default();
	module.feature_spec.import_export_mutable_globals = false;
	module.globals.defs.push(GlobalDef {
		typ: GlobalType { is_mutable: true, value_type: ValueType::I32 },
		initializer: InitializerExpression::I32Const(0),
	});
	module.exports.push(Export { name: String::from("g"), kind: ExternKind::Global, index: 0 });
	expect_invalid(&module, "may only access immutable globals");

	module.feature_spec.import_export_mutable_globals = true;
	module_validate(&module).unwrap();
}

#[test]
fn br_table_targets_must_agree_on_arity() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::Block(block_type(IndexedBlockType::OneResult(ValueType::I32))),
			Operator::Block(block_type(IndexedBlockType::NoParametersOrResult)),
			Operator::I32Const(0),
			Operator::BrTable(BranchTableImm { default_target_depth: 0, branch_table_index: 0 }),
			Operator::End,
			Operator::End,
			Operator::End,
		],
	);
	module.functions.defs[0].branch_tables = vec![vec![1]];
	expect_invalid(&module, "br_table targets must all take the same number of parameters");
}

#[test]
fn br_table_with_only_a_default_target() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::I32Const(0),
			Operator::BrTable(BranchTableImm { default_target_depth: 0, branch_table_index: 0 }),
			Operator::End,
		],
	);
	module.functions.defs[0].branch_tables = vec![vec![]];
	module_validate(&module).unwrap();
}

#[test]
fn table_size_bounds_must_not_be_disjoint() {
	let mut module = Module::default();
	module.tables.defs.push(TableDef {
		typ: TableType {
			element_type: ReferenceType::FuncRef,
			is_shared: false,
			size: SizeConstraints { min: 2, max: 1 },
		},
	});
	expect_invalid(&module, "disjoint size bounds");

	module.tables.defs[0].typ.size = SizeConstraints { min: 2, max: 2 };
	module_validate(&module).unwrap();
}

#[test]
fn else_less_if_needs_identity_signature() {
	let module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::I32Const(1),
			Operator::If(block_type(IndexedBlockType::OneResult(ValueType::I32))),
			Operator::I32Const(2),
			Operator::End,
			Operator::Drop,
			Operator::End,
		],
	);
	expect_invalid(&module, "else-less if must have identity signature");
}

#[test]
fn else_less_if_with_empty_signature() {
	let module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::I32Const(1),
			Operator::If(block_type(IndexedBlockType::NoParametersOrResult)),
			Operator::End,
			Operator::End,
		],
	);
	module_validate(&module).unwrap();
}

#[test]
fn if_with_both_arms() {
	let module = module_with_func(
		ft(&[], &[ValueType::I32]),
		vec![
			Operator::I32Const(1),
			Operator::If(block_type(IndexedBlockType::OneResult(ValueType::I32))),
			Operator::I32Const(2),
			Operator::Else,
			Operator::I32Const(3),
			Operator::End,
			Operator::End,
		],
	);
	module_validate(&module).unwrap();
}

#[test]
fn else_outside_if_is_rejected() {
	let module = module_with_func(FunctionType::default(), vec![Operator::Else, Operator::End]);
	expect_invalid(&module, "else only allowed in if context");
}

#[test]
fn select_after_unreachable_propagates_bottom() {
	let module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::Unreachable,
			Operator::Select(SelectImm { typ: ValueType::Any }),
			Operator::Drop,
			Operator::End,
		],
	);
	module_validate(&module).unwrap();
}

#[test]
fn select_operands_must_share_a_numeric_type() {
	let module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::I32Const(1),
			Operator::I64Const(2),
			Operator::I32Const(0),
			Operator::Select(SelectImm { typ: ValueType::Any }),
			Operator::Drop,
			Operator::End,
		],
	);
	expect_invalid(&module, "same numeric type");
}

#[test]
fn typed_select_requires_reference_types() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::I32Const(1),
			Operator::I32Const(2),
			Operator::I32Const(0),
			Operator::Select(SelectImm { typ: ValueType::I32 }),
			Operator::Drop,
			Operator::End,
		],
	);
	expect_invalid(&module, "requires reference types feature");

	module.feature_spec.reference_types = true;
	module_validate(&module).unwrap();
}

#[test]
fn start_function_must_be_nullary() {
	let mut module = module_with_func(ft(&[ValueType::I32], &[]), vec![Operator::End]);
	module.start_function_index = Some(0);
	expect_invalid(&module, "start function must not have any parameters or results");

	let mut module = module_with_func(FunctionType::default(), vec![Operator::End]);
	module.start_function_index = Some(0);
	module_validate(&module).unwrap();

	module.start_function_index = Some(1);
	expect_invalid(&module, "invalid index");
}

#[test]
fn duplicate_export_names_are_rejected() {
	let mut module = module_with_func(FunctionType::default(), vec![Operator::End]);
	module.exports.push(Export { name: String::from("f"), kind: ExternKind::Function, index: 0 });
	module.exports.push(Export { name: String::from("f"), kind: ExternKind::Function, index: 0 });
	expect_invalid(&module, "duplicate export");
}

#[test]
fn unknown_export_kind_is_rejected() {
	let mut module = Module::default();
	module.exports.push(Export { name: String::from("x"), kind: ExternKind::Invalid, index: 0 });
	expect_invalid(&module, "unknown export kind");
}

#[test]
fn export_index_out_of_bounds() {
	let mut module = Module::default();
	module.exports.push(Export { name: String::from("f"), kind: ExternKind::Function, index: 0 });
	expect_invalid(&module, "invalid index");
}

#[test]
fn at_most_one_memory() {
	let mut module = Module::default();
	module.memories.defs.push(memory());
	module.memories.defs.push(memory());
	expect_invalid(&module, "too many memories");
}

#[test]
fn multiple_tables_require_reference_types() {
	let mut module = Module::default();
	module.tables.defs.push(table(ReferenceType::FuncRef));
	module.tables.defs.push(table(ReferenceType::FuncRef));
	expect_invalid(&module, "too many tables");

	module.feature_spec.reference_types = true;
	module_validate(&module).unwrap();
}

#[test]
fn mutable_global_import_requires_feature() {
	let mut module = Module::default();
	module.feature_spec.import_export_mutable_globals = false;
	module.globals.imports.push(import(GlobalType { is_mutable: true, value_type: ValueType::I32 }));
	expect_invalid(&module, "mutable globals cannot be imported");
}

#[test]
fn initializer_may_only_read_imported_globals() {
	let mut module = Module::default();
	module.globals.defs.push(GlobalDef {
		typ: GlobalType { is_mutable: false, value_type: ValueType::I32 },
		initializer: InitializerExpression::GlobalGet(0),
	});
	expect_invalid(&module, "may only access imported globals");

	let mut module = Module::default();
	module.globals.imports.push(import(GlobalType { is_mutable: false, value_type: ValueType::I32 }));
	module.globals.defs.push(GlobalDef {
		typ: GlobalType { is_mutable: false, value_type: ValueType::I32 },
		initializer: InitializerExpression::GlobalGet(0),
	});
	module_validate(&module).unwrap();
}

#[test]
fn initializer_may_only_read_immutable_globals() {
	let mut module = Module::default();
	module.globals.imports.push(import(GlobalType { is_mutable: true, value_type: ValueType::I32 }));
	module.globals.defs.push(GlobalDef {
		typ: GlobalType { is_mutable: false, value_type: ValueType::I32 },
		initializer: InitializerExpression::GlobalGet(0),
	});
	expect_invalid(&module, "may only access immutable globals");
}

#[test]
fn initializer_type_must_match() {
	let mut module = Module::default();
	module.globals.defs.push(GlobalDef {
		typ: GlobalType { is_mutable: false, value_type: ValueType::I32 },
		initializer: InitializerExpression::I64Const(1),
	});
	expect_invalid(&module, "type mismatch");
}

#[test]
fn invalid_initializer_expression() {
	let mut module = Module::default();
	module.globals.defs.push(GlobalDef {
		typ: GlobalType { is_mutable: false, value_type: ValueType::I32 },
		initializer: InitializerExpression::Invalid,
	});
	expect_invalid(&module, "invalid initializer expression");
}

#[test]
fn active_elem_segment_needs_funcref_table() {
	let mut module = Module::default();
	module.tables.defs.push(table(ReferenceType::None));
	module.elem_segments.push(ElemSegment {
		is_active: true,
		table_index: 0,
		base_offset: InitializerExpression::I32Const(0),
		elems: vec![],
	});
	// The table type itself is rejected first by the full driver; the
	// segment check still guards direct entry.
	let err = valid::validate_elem_segments(&module).expect_err("expected validation failure");
	assert!(err.reason.contains("active elem segments must be in funcref tables"), "{}", err.reason);
}

#[test]
fn elem_segments_check_offsets_and_functions() {
	let mut module = module_with_func(FunctionType::default(), vec![Operator::End]);
	module.tables.defs.push(table(ReferenceType::FuncRef));
	module.elem_segments.push(ElemSegment {
		is_active: true,
		table_index: 0,
		base_offset: InitializerExpression::I32Const(0),
		elems: vec![Elem::RefFunc(0)],
	});
	module_validate(&module).unwrap();

	module.elem_segments[0].base_offset = InitializerExpression::I64Const(0);
	expect_invalid(&module, "type mismatch");

	module.elem_segments[0].base_offset = InitializerExpression::I32Const(0);
	module.elem_segments[0].elems = vec![Elem::RefFunc(7)];
	expect_invalid(&module, "invalid index");
}

#[test]
fn ref_null_elements_only_in_passive_segments() {
	let mut module = Module::default();
	module.tables.defs.push(table(ReferenceType::FuncRef));
	module.elem_segments.push(ElemSegment {
		is_active: true,
		table_index: 0,
		base_offset: InitializerExpression::I32Const(0),
		elems: vec![Elem::RefNull],
	});
	expect_invalid(&module, "ref.null is only allowed in passive segments");

	module.elem_segments[0].is_active = false;
	module_validate(&module).unwrap();
}

#[test]
fn active_data_segment_needs_memory_and_i32_offset() {
	let mut module = Module::default();
	module.data_segments.push(DataSegment {
		is_active: true,
		memory_index: 0,
		base_offset: InitializerExpression::I32Const(0),
	});
	expect_invalid(&module, "invalid index");

	module.memories.defs.push(memory());
	module_validate(&module).unwrap();

	module.data_segments[0].base_offset = InitializerExpression::F32Const(0.0);
	expect_invalid(&module, "type mismatch");
}

#[test]
fn call_checks_the_callee_signature() {
	let mut module = Module::default();
	module.types.push(FunctionType::default());
	module.types.push(ft(&[ValueType::I32], &[ValueType::I64]));
	module.functions.defs.push(FunctionDef {
		typ: IndexedFunctionType { index: 0 },
		non_parameter_local_types: vec![],
		branch_tables: vec![],
		code: vec![
			Operator::I32Const(1),
			Operator::Call(FunctionImm { function_index: 1 }),
			Operator::Drop,
			Operator::End,
		],
	});
	module.functions.defs.push(FunctionDef {
		typ: IndexedFunctionType { index: 1 },
		non_parameter_local_types: vec![],
		branch_tables: vec![],
		code: vec![Operator::I64Const(9), Operator::End],
	});
	module_validate(&module).unwrap();

	module.functions.defs[0].code[0] = Operator::F32Const(1.0);
	expect_invalid(&module, "type mismatch");
}

#[test]
fn call_indirect_requires_a_funcref_table() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::I32Const(0),
			Operator::CallIndirect(CallIndirectImm {
				typ: IndexedFunctionType { index: 0 },
				table_index: 0,
			}),
			Operator::End,
		],
	);
	module.feature_spec.reference_types = true;
	module.tables.defs.push(table(ReferenceType::AnyRef));
	expect_invalid(&module, "call_indirect requires a table element type of funcref");

	module.tables.defs[0] = table(ReferenceType::FuncRef);
	module_validate(&module).unwrap();
}

#[test]
fn loads_respect_natural_alignment() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(0), Operator::I32Load(mem_arg(3)), Operator::Drop, Operator::End],
	);
	module.memories.defs.push(memory());
	expect_invalid(&module, "alignment greater than natural alignment");

	module.functions.defs[0].code[1] = Operator::I32Load(mem_arg(2));
	module_validate(&module).unwrap();
}

#[test]
fn loads_require_a_default_memory() {
	let module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(0), Operator::I32Load(mem_arg(2)), Operator::Drop, Operator::End],
	);
	expect_invalid(&module, "without default memory");
}

#[test]
fn atomic_operators_demand_shared_memory_when_required() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(0), Operator::I32AtomicLoad(mem_arg(2)), Operator::Drop, Operator::End],
	);
	module.feature_spec.atomics = true;
	module.feature_spec.require_shared_flag_for_atomic_operators = true;
	module.memories.defs.push(memory());
	expect_invalid(&module, "require a memory with the shared flag");

	module.memories.defs[0] = shared_memory();
	module_validate(&module).unwrap();
}

#[test]
fn atomic_operators_need_natural_alignment() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(0), Operator::I32AtomicLoad(mem_arg(1)), Operator::Drop, Operator::End],
	);
	module.feature_spec.atomics = true;
	module.memories.defs.push(memory());
	expect_invalid(&module, "must have natural alignment");
}

#[test]
fn atomic_operators_are_feature_gated() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(0), Operator::I32AtomicLoad(mem_arg(2)), Operator::Drop, Operator::End],
	);
	module.memories.defs.push(memory());
	expect_invalid(&module, "requires atomics feature");
}

#[test]
fn try_catch_round_trip() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::Try(block_type(IndexedBlockType::NoParametersOrResult)),
			Operator::Catch(ExceptionTypeImm { exception_type_index: 0 }),
			Operator::Drop,
			Operator::End,
			Operator::End,
		],
	);
	module.feature_spec.exception_handling = true;
	module.exception_types.defs.push(ExceptionTypeDef {
		typ: ExceptionType { params: vec![ValueType::I32] },
	});
	module_validate(&module).unwrap();
}

#[test]
fn end_may_not_close_a_try() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::Try(block_type(IndexedBlockType::NoParametersOrResult)),
			Operator::End,
			Operator::End,
		],
	);
	module.feature_spec.exception_handling = true;
	expect_invalid(&module, "end may not occur in try context");
}

#[test]
fn catch_outside_try_is_rejected() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::Catch(ExceptionTypeImm { exception_type_index: 0 }), Operator::End],
	);
	module.feature_spec.exception_handling = true;
	module.exception_types.defs.push(ExceptionTypeDef {
		typ: ExceptionType { params: vec![] },
	});
	expect_invalid(&module, "catch only allowed in try/catch context");
}

#[test]
fn throw_pops_the_exception_params() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(0), Operator::Throw(ExceptionTypeImm { exception_type_index: 0 }), Operator::End],
	);
	module.feature_spec.exception_handling = true;
	module.exception_types.defs.push(ExceptionTypeDef {
		typ: ExceptionType { params: vec![ValueType::I32] },
	});
	module_validate(&module).unwrap();
}

#[test]
fn throw_is_feature_gated() {
	let module = module_with_func(
		FunctionType::default(),
		vec![Operator::Throw(ExceptionTypeImm { exception_type_index: 0 }), Operator::End],
	);
	expect_invalid(&module, "requires exception handling feature");
}

#[test]
fn rethrow_must_target_a_catch() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::Rethrow(RethrowImm { catch_depth: 0 }), Operator::End],
	);
	module.feature_spec.exception_handling = true;
	expect_invalid(&module, "rethrow must target a catch");
}

#[test]
fn missing_end_is_detected_at_finish() {
	let module = module_with_func(FunctionType::default(), vec![]);
	expect_invalid(&module, "end of code reached before end of function");

	let module = module_with_func(
		FunctionType::default(),
		vec![Operator::Block(block_type(IndexedBlockType::NoParametersOrResult)), Operator::End],
	);
	expect_invalid(&module, "end of code reached before end of function");
}

#[test]
fn block_params_require_multivalue() {
	let mut module = Module::default();
	module.types.push(FunctionType::default());
	module.types.push(ft(&[ValueType::I32], &[ValueType::I32]));
	module.functions.defs.push(FunctionDef {
		typ: IndexedFunctionType { index: 0 },
		non_parameter_local_types: vec![],
		branch_tables: vec![],
		code: vec![
			Operator::I32Const(1),
			Operator::Block(block_type(IndexedBlockType::FunctionType(1))),
			Operator::End,
			Operator::Drop,
			Operator::End,
		],
	});
	expect_invalid(&module, "block has params");

	module.feature_spec.multiple_results_and_block_params = true;
	module_validate(&module).unwrap();
}

#[test]
fn branches_deliver_the_target_params() {
	let mut module = Module::default();
	module.feature_spec.multiple_results_and_block_params = true;
	module.types.push(FunctionType::default());
	module.types.push(ft(&[ValueType::I32], &[]));
	module.functions.defs.push(FunctionDef {
		typ: IndexedFunctionType { index: 0 },
		non_parameter_local_types: vec![],
		branch_tables: vec![],
		code: vec![
			Operator::I32Const(0),
			Operator::Loop(block_type(IndexedBlockType::FunctionType(1))),
			Operator::I32Const(7),
			Operator::Br(BranchImm { target_depth: 0 }),
			Operator::End,
			Operator::End,
		],
	});
	module_validate(&module).unwrap();
}

#[test]
fn br_if_falls_through_with_operands() {
	let module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::Block(block_type(IndexedBlockType::OneResult(ValueType::I32))),
			Operator::I32Const(1),
			Operator::I32Const(0),
			Operator::BrIf(BranchImm { target_depth: 0 }),
			Operator::End,
			Operator::Drop,
			Operator::End,
		],
	);
	module_validate(&module).unwrap();
}

#[test]
fn branch_depth_is_bounds_checked() {
	let module =
		module_with_func(FunctionType::default(), vec![Operator::Br(BranchImm { target_depth: 5 }), Operator::End]);
	expect_invalid(&module, "invalid index");
}

#[test]
fn locals_cover_params_and_declared_locals() {
	let mut module = Module::default();
	module.types.push(ft(&[ValueType::I32], &[ValueType::I32]));
	module.functions.defs.push(FunctionDef {
		typ: IndexedFunctionType { index: 0 },
		non_parameter_local_types: vec![ValueType::I64],
		branch_tables: vec![],
		code: vec![
			Operator::LocalGet(VariableImm { variable_index: 1 }),
			Operator::LocalSet(VariableImm { variable_index: 1 }),
			Operator::LocalGet(VariableImm { variable_index: 0 }),
			Operator::End,
		],
	});
	module_validate(&module).unwrap();

	module.functions.defs[0].code[0] = Operator::LocalGet(VariableImm { variable_index: 2 });
	expect_invalid(&module, "invalid index");
}

#[test]
fn global_set_requires_a_mutable_global() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(1), Operator::GlobalSet(VariableImm { variable_index: 0 }), Operator::End],
	);
	module.globals.defs.push(GlobalDef {
		typ: GlobalType { is_mutable: false, value_type: ValueType::I32 },
		initializer: InitializerExpression::I32Const(0),
	});
	expect_invalid(&module, "attempting to mutate immutable global");

	module.globals.defs[0].typ.is_mutable = true;
	module_validate(&module).unwrap();
}

#[test]
fn simd_is_feature_gated() {
	let module = module_with_func(
		FunctionType::default(),
		vec![Operator::V128Const([0; 16]), Operator::Drop, Operator::End],
	);
	expect_invalid(&module, "requires simd feature");
}

#[test]
fn reference_operators_work_under_their_feature() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::RefNull, Operator::RefIsNull, Operator::Drop, Operator::End],
	);
	expect_invalid(&module, "requires reference types feature");

	module.feature_spec.reference_types = true;
	module_validate(&module).unwrap();
}

#[test]
fn table_get_is_feature_gated_and_typed() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(0), Operator::TableGet(TableImm { table_index: 0 }), Operator::Drop, Operator::End],
	);
	module.tables.defs.push(table(ReferenceType::FuncRef));
	expect_invalid(&module, "requires reference types feature");

	module.feature_spec.reference_types = true;
	module_validate(&module).unwrap();
}

#[test]
fn memory_copy_and_init_check_their_indices() {
	let mut module = module_with_func(
		FunctionType::default(),
		vec![
			Operator::I32Const(0),
			Operator::I32Const(0),
			Operator::I32Const(0),
			Operator::MemoryCopy(MemoryCopyImm { source_memory_index: 0, dest_memory_index: 0 }),
			Operator::End,
		],
	);
	module.memories.defs.push(memory());
	module_validate(&module).unwrap();

	module.functions.defs[0].code[3] =
		Operator::MemoryCopy(MemoryCopyImm { source_memory_index: 0, dest_memory_index: 1 });
	expect_invalid(&module, "invalid index");

	module.functions.defs[0].code[3] =
		Operator::MemoryInit(DataSegmentAndMemImm { data_segment_index: 0, memory_index: 0 });
	expect_invalid(&module, "invalid index");
}

#[test]
fn memory_grow_returns_the_old_size() {
	let mut module = module_with_func(
		ft(&[], &[ValueType::I32]),
		vec![
			Operator::I32Const(1),
			Operator::MemoryGrow(MemoryImm { memory_index: 0 }),
			Operator::End,
		],
	);
	module.memories.defs.push(memory());
	module_validate(&module).unwrap();
}

#[test]
fn extra_values_left_in_a_frame_are_rejected() {
	let module = module_with_func(
		FunctionType::default(),
		vec![Operator::I32Const(1), Operator::End],
	);
	expect_invalid(&module, "stack was not empty at end of control structure");
}

#[test]
fn validation_is_idempotent() {
	let module = module_with_func(ft(&[], &[ValueType::I32]), vec![Operator::Unreachable, Operator::End]);
	module_validate(&module).unwrap();
	module_validate(&module).unwrap();

	let bad = module_with_func(
		ft(&[], &[ValueType::I32]),
		vec![Operator::I64Const(1), Operator::End],
	);
	let first = module_validate(&bad).expect_err("invalid");
	let second = module_validate(&bad).expect_err("invalid");
	assert_eq!(first, second);
}
