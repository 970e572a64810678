use crate::{
	structure::{
		modules::{
			Feature,
			Feature::{Atomics, ExceptionHandling, Mvp, ReferenceTypes, Simd},
			FunctionDef, Module,
		},
		operators::{
			BranchImm, BranchTableImm, CallIndirectImm, ControlStructureImm, DataSegmentAndMemImm,
			DataSegmentImm, ElemSegmentAndTableImm, ElemSegmentImm, ExceptionTypeImm, FunctionImm,
			LaneIndexImm, LoadOrStoreImm, MemoryCopyImm, MemoryImm, Operator, RethrowImm, SelectImm,
			ShuffleImm, TableCopyImm, TableImm, VariableImm,
		},
		types::{
			is_subtype, FunctionType, ReferenceType, TypeTuple,
			ValueType,
			ValueType::{Any, AnyRef, F32, F64, FuncRef, I32, I64, NullRef, V128},
		},
	},
	valid::{
		types::{
			validate_block_type, validate_function_index, validate_function_type, validate_global_index,
			validate_value_type,
		},
		validate_index, Result, ValidationError,
	},
};
use alloc::{string::String, vec::Vec};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ControlContextType {
	Function,
	Block,
	IfThen,
	IfElse,
	Loop,
	Try,
	Catch,
}

#[derive(Clone, Debug)]
struct ControlContext {
	typ: ControlContextType,
	/// Operand stack height at frame entry; pops are clamped here.
	outer_stack_size: usize,
	/// The operands a branch to this frame delivers: entry params for a
	/// loop, results for every other frame.
	params: TypeTuple,
	results: TypeTuple,
	is_reachable: bool,
	/// Operands the else arm starts with; populated only for if frames.
	else_params: TypeTuple,
}

/// Type-checks one function body, one operator at a time. Feed every decoded
/// operator in order through `op`, then call `finish`.
pub struct CodeValidationStream<'m> {
	module: &'m Module,
	function_def: &'m FunctionDef,
	function_type: &'m FunctionType,
	locals: Vec<ValueType>,
	control_stack: Vec<ControlContext>,
	stack: Vec<ValueType>,
}

impl<'m> CodeValidationStream<'m> {
	pub fn new(module: &'m Module, function_def: &'m FunctionDef) -> Result<Self> {
		let function_type = validate_function_type(module, &function_def.typ)?;

		for local_type in &function_def.non_parameter_local_types {
			validate_value_type(&module.feature_spec, *local_type)?;
		}

		let mut locals =
			Vec::with_capacity(function_type.params.len() + function_def.non_parameter_local_types.len());
		locals.extend_from_slice(&function_type.params);
		locals.extend_from_slice(&function_def.non_parameter_local_types);

		let mut stream = CodeValidationStream {
			module,
			function_def,
			function_type,
			locals,
			control_stack: Vec::new(),
			stack: Vec::new(),
		};
		let results = stream.function_type.results.clone();
		stream.push_control_stack(ControlContextType::Function, results.clone(), results, TypeTuple::new());
		Ok(stream)
	}

	/// Fails if a structured block never closed.
	pub fn finish(&self) -> Result<()> {
		if !self.control_stack.is_empty() {
			return Err(ValidationError::new("end of code reached before end of function"));
		}
		Ok(())
	}

	pub fn op(&mut self, operator: &Operator) -> Result<()> {
		if self.control_stack.is_empty() {
			return Err(ValidationError::new("operators may not occur after the function's final end"));
		}

		match operator {
			// Control.
			Operator::Unreachable => {
				self.enter_unreachable();
				Ok(())
			}
			Operator::Nop => Ok(()),
			Operator::Block(imm) => self.block(imm),
			Operator::Loop(imm) => self.loop_(imm),
			Operator::If(imm) => self.if_(imm),
			Operator::Else => self.else_(),
			Operator::End => self.end(),
			Operator::Try(imm) => self.try_(imm),
			Operator::Catch(imm) => self.catch_(imm),
			Operator::CatchAll => self.catch_all(),
			Operator::Throw(imm) => self.throw(imm),
			Operator::Rethrow(imm) => self.rethrow(imm),
			Operator::Br(imm) => self.br(imm),
			Operator::BrIf(imm) => self.br_if(imm),
			Operator::BrTable(imm) => self.br_table(imm),
			Operator::Return => self.return_(),
			Operator::Call(imm) => self.call(imm),
			Operator::CallIndirect(imm) => self.call_indirect(imm),

			// Parametric.
			Operator::Drop => self.pop_and_validate_operand("drop", Any).map(|_| ()),
			Operator::Select(imm) => self.select(imm),

			// Variables.
			Operator::LocalGet(imm) => self.local_get(imm),
			Operator::LocalSet(imm) => self.local_set(imm),
			Operator::LocalTee(imm) => self.local_tee(imm),
			Operator::GlobalGet(imm) => self.global_get(imm),
			Operator::GlobalSet(imm) => self.global_set(imm),

			// References.
			Operator::RefNull => {
				self.feature("ref.null", ReferenceTypes)?;
				self.push_operand(NullRef);
				Ok(())
			}
			Operator::RefIsNull => {
				self.feature("ref.is_null", ReferenceTypes)?;
				self.pop_and_validate_operand("ref.is_null", AnyRef)?;
				self.push_operand(I32);
				Ok(())
			}
			Operator::RefFunc(imm) => {
				self.feature("ref.func", ReferenceTypes)?;
				validate_function_index(self.module, imm.function_index)?;
				self.push_operand(FuncRef);
				Ok(())
			}

			// Tables.
			Operator::TableGet(imm) => self.table_get(imm),
			Operator::TableSet(imm) => self.table_set(imm),
			Operator::TableGrow(imm) => self.table_grow(imm),
			Operator::TableFill(imm) => self.table_fill(imm),
			Operator::TableSize(imm) => self.table_size(imm),
			Operator::TableCopy(imm) => self.table_copy(imm),
			Operator::TableInit(imm) => self.table_init(imm),
			Operator::ElemDrop(imm) => self.elem_drop(imm),

			// Memory.
			Operator::I32Load(imm) => self.load("i32.load", Mvp, imm, 2, I32),
			Operator::I64Load(imm) => self.load("i64.load", Mvp, imm, 3, I64),
			Operator::F32Load(imm) => self.load("f32.load", Mvp, imm, 2, F32),
			Operator::F64Load(imm) => self.load("f64.load", Mvp, imm, 3, F64),
			Operator::I32Load8S(imm) => self.load("i32.load8_s", Mvp, imm, 0, I32),
			Operator::I32Load8U(imm) => self.load("i32.load8_u", Mvp, imm, 0, I32),
			Operator::I32Load16S(imm) => self.load("i32.load16_s", Mvp, imm, 1, I32),
			Operator::I32Load16U(imm) => self.load("i32.load16_u", Mvp, imm, 1, I32),
			Operator::I64Load8S(imm) => self.load("i64.load8_s", Mvp, imm, 0, I64),
			Operator::I64Load8U(imm) => self.load("i64.load8_u", Mvp, imm, 0, I64),
			Operator::I64Load16S(imm) => self.load("i64.load16_s", Mvp, imm, 1, I64),
			Operator::I64Load16U(imm) => self.load("i64.load16_u", Mvp, imm, 1, I64),
			Operator::I64Load32S(imm) => self.load("i64.load32_s", Mvp, imm, 2, I64),
			Operator::I64Load32U(imm) => self.load("i64.load32_u", Mvp, imm, 2, I64),
			Operator::I32Store(imm) => self.store("i32.store", Mvp, imm, 2, I32),
			Operator::I64Store(imm) => self.store("i64.store", Mvp, imm, 3, I64),
			Operator::F32Store(imm) => self.store("f32.store", Mvp, imm, 2, F32),
			Operator::F64Store(imm) => self.store("f64.store", Mvp, imm, 3, F64),
			Operator::I32Store8(imm) => self.store("i32.store8", Mvp, imm, 0, I32),
			Operator::I32Store16(imm) => self.store("i32.store16", Mvp, imm, 1, I32),
			Operator::I64Store8(imm) => self.store("i64.store8", Mvp, imm, 0, I64),
			Operator::I64Store16(imm) => self.store("i64.store16", Mvp, imm, 1, I64),
			Operator::I64Store32(imm) => self.store("i64.store32", Mvp, imm, 2, I64),
			Operator::MemorySize(imm) => self.memory_size(imm),
			Operator::MemoryGrow(imm) => self.memory_grow(imm),
			Operator::MemoryCopy(imm) => self.memory_copy(imm),
			Operator::MemoryFill(imm) => self.memory_fill(imm),
			Operator::MemoryInit(imm) => self.memory_init(imm),
			Operator::DataDrop(imm) => self.data_drop(imm),

			// Numeric constants.
			Operator::I32Const(_) => self.const_op("i32.const", Mvp, I32),
			Operator::I64Const(_) => self.const_op("i64.const", Mvp, I64),
			Operator::F32Const(_) => self.const_op("f32.const", Mvp, F32),
			Operator::F64Const(_) => self.const_op("f64.const", Mvp, F64),

			// i32 comparisons.
			Operator::I32Eqz => self.testop("i32.eqz", Mvp, I32),
			Operator::I32Eq => self.relop("i32.eq", Mvp, I32),
			Operator::I32Ne => self.relop("i32.ne", Mvp, I32),
			Operator::I32LtS => self.relop("i32.lt_s", Mvp, I32),
			Operator::I32LtU => self.relop("i32.lt_u", Mvp, I32),
			Operator::I32GtS => self.relop("i32.gt_s", Mvp, I32),
			Operator::I32GtU => self.relop("i32.gt_u", Mvp, I32),
			Operator::I32LeS => self.relop("i32.le_s", Mvp, I32),
			Operator::I32LeU => self.relop("i32.le_u", Mvp, I32),
			Operator::I32GeS => self.relop("i32.ge_s", Mvp, I32),
			Operator::I32GeU => self.relop("i32.ge_u", Mvp, I32),

			// i64 comparisons.
			Operator::I64Eqz => self.testop("i64.eqz", Mvp, I64),
			Operator::I64Eq => self.relop("i64.eq", Mvp, I64),
			Operator::I64Ne => self.relop("i64.ne", Mvp, I64),
			Operator::I64LtS => self.relop("i64.lt_s", Mvp, I64),
			Operator::I64LtU => self.relop("i64.lt_u", Mvp, I64),
			Operator::I64GtS => self.relop("i64.gt_s", Mvp, I64),
			Operator::I64GtU => self.relop("i64.gt_u", Mvp, I64),
			Operator::I64LeS => self.relop("i64.le_s", Mvp, I64),
			Operator::I64LeU => self.relop("i64.le_u", Mvp, I64),
			Operator::I64GeS => self.relop("i64.ge_s", Mvp, I64),
			Operator::I64GeU => self.relop("i64.ge_u", Mvp, I64),

			// f32 comparisons.
			Operator::F32Eq => self.relop("f32.eq", Mvp, F32),
			Operator::F32Ne => self.relop("f32.ne", Mvp, F32),
			Operator::F32Lt => self.relop("f32.lt", Mvp, F32),
			Operator::F32Gt => self.relop("f32.gt", Mvp, F32),
			Operator::F32Le => self.relop("f32.le", Mvp, F32),
			Operator::F32Ge => self.relop("f32.ge", Mvp, F32),

			// f64 comparisons.
			Operator::F64Eq => self.relop("f64.eq", Mvp, F64),
			Operator::F64Ne => self.relop("f64.ne", Mvp, F64),
			Operator::F64Lt => self.relop("f64.lt", Mvp, F64),
			Operator::F64Gt => self.relop("f64.gt", Mvp, F64),
			Operator::F64Le => self.relop("f64.le", Mvp, F64),
			Operator::F64Ge => self.relop("f64.ge", Mvp, F64),

			// i32 arithmetic.
			Operator::I32Clz => self.unop("i32.clz", Mvp, I32),
			Operator::I32Ctz => self.unop("i32.ctz", Mvp, I32),
			Operator::I32Popcnt => self.unop("i32.popcnt", Mvp, I32),
			Operator::I32Add => self.binop("i32.add", Mvp, I32),
			Operator::I32Sub => self.binop("i32.sub", Mvp, I32),
			Operator::I32Mul => self.binop("i32.mul", Mvp, I32),
			Operator::I32DivS => self.binop("i32.div_s", Mvp, I32),
			Operator::I32DivU => self.binop("i32.div_u", Mvp, I32),
			Operator::I32RemS => self.binop("i32.rem_s", Mvp, I32),
			Operator::I32RemU => self.binop("i32.rem_u", Mvp, I32),
			Operator::I32And => self.binop("i32.and", Mvp, I32),
			Operator::I32Or => self.binop("i32.or", Mvp, I32),
			Operator::I32Xor => self.binop("i32.xor", Mvp, I32),
			Operator::I32Shl => self.binop("i32.shl", Mvp, I32),
			Operator::I32ShrS => self.binop("i32.shr_s", Mvp, I32),
			Operator::I32ShrU => self.binop("i32.shr_u", Mvp, I32),
			Operator::I32Rotl => self.binop("i32.rotl", Mvp, I32),
			Operator::I32Rotr => self.binop("i32.rotr", Mvp, I32),

			// i64 arithmetic.
			Operator::I64Clz => self.unop("i64.clz", Mvp, I64),
			Operator::I64Ctz => self.unop("i64.ctz", Mvp, I64),
			Operator::I64Popcnt => self.unop("i64.popcnt", Mvp, I64),
			Operator::I64Add => self.binop("i64.add", Mvp, I64),
			Operator::I64Sub => self.binop("i64.sub", Mvp, I64),
			Operator::I64Mul => self.binop("i64.mul", Mvp, I64),
			Operator::I64DivS => self.binop("i64.div_s", Mvp, I64),
			Operator::I64DivU => self.binop("i64.div_u", Mvp, I64),
			Operator::I64RemS => self.binop("i64.rem_s", Mvp, I64),
			Operator::I64RemU => self.binop("i64.rem_u", Mvp, I64),
			Operator::I64And => self.binop("i64.and", Mvp, I64),
			Operator::I64Or => self.binop("i64.or", Mvp, I64),
			Operator::I64Xor => self.binop("i64.xor", Mvp, I64),
			Operator::I64Shl => self.binop("i64.shl", Mvp, I64),
			Operator::I64ShrS => self.binop("i64.shr_s", Mvp, I64),
			Operator::I64ShrU => self.binop("i64.shr_u", Mvp, I64),
			Operator::I64Rotl => self.binop("i64.rotl", Mvp, I64),
			Operator::I64Rotr => self.binop("i64.rotr", Mvp, I64),

			// f32 arithmetic.
			Operator::F32Abs => self.unop("f32.abs", Mvp, F32),
			Operator::F32Neg => self.unop("f32.neg", Mvp, F32),
			Operator::F32Ceil => self.unop("f32.ceil", Mvp, F32),
			Operator::F32Floor => self.unop("f32.floor", Mvp, F32),
			Operator::F32Trunc => self.unop("f32.trunc", Mvp, F32),
			Operator::F32Nearest => self.unop("f32.nearest", Mvp, F32),
			Operator::F32Sqrt => self.unop("f32.sqrt", Mvp, F32),
			Operator::F32Add => self.binop("f32.add", Mvp, F32),
			Operator::F32Sub => self.binop("f32.sub", Mvp, F32),
			Operator::F32Mul => self.binop("f32.mul", Mvp, F32),
			Operator::F32Div => self.binop("f32.div", Mvp, F32),
			Operator::F32Min => self.binop("f32.min", Mvp, F32),
			Operator::F32Max => self.binop("f32.max", Mvp, F32),
			Operator::F32Copysign => self.binop("f32.copysign", Mvp, F32),

			// f64 arithmetic.
			Operator::F64Abs => self.unop("f64.abs", Mvp, F64),
			Operator::F64Neg => self.unop("f64.neg", Mvp, F64),
			Operator::F64Ceil => self.unop("f64.ceil", Mvp, F64),
			Operator::F64Floor => self.unop("f64.floor", Mvp, F64),
			Operator::F64Trunc => self.unop("f64.trunc", Mvp, F64),
			Operator::F64Nearest => self.unop("f64.nearest", Mvp, F64),
			Operator::F64Sqrt => self.unop("f64.sqrt", Mvp, F64),
			Operator::F64Add => self.binop("f64.add", Mvp, F64),
			Operator::F64Sub => self.binop("f64.sub", Mvp, F64),
			Operator::F64Mul => self.binop("f64.mul", Mvp, F64),
			Operator::F64Div => self.binop("f64.div", Mvp, F64),
			Operator::F64Min => self.binop("f64.min", Mvp, F64),
			Operator::F64Max => self.binop("f64.max", Mvp, F64),
			Operator::F64Copysign => self.binop("f64.copysign", Mvp, F64),

			// Conversions.
			Operator::I32WrapI64 => self.cvtop("i32.wrap_i64", Mvp, I64, I32),
			Operator::I32TruncF32S => self.cvtop("i32.trunc_f32_s", Mvp, F32, I32),
			Operator::I32TruncF32U => self.cvtop("i32.trunc_f32_u", Mvp, F32, I32),
			Operator::I32TruncF64S => self.cvtop("i32.trunc_f64_s", Mvp, F64, I32),
			Operator::I32TruncF64U => self.cvtop("i32.trunc_f64_u", Mvp, F64, I32),
			Operator::I64ExtendI32S => self.cvtop("i64.extend_i32_s", Mvp, I32, I64),
			Operator::I64ExtendI32U => self.cvtop("i64.extend_i32_u", Mvp, I32, I64),
			Operator::I64TruncF32S => self.cvtop("i64.trunc_f32_s", Mvp, F32, I64),
			Operator::I64TruncF32U => self.cvtop("i64.trunc_f32_u", Mvp, F32, I64),
			Operator::I64TruncF64S => self.cvtop("i64.trunc_f64_s", Mvp, F64, I64),
			Operator::I64TruncF64U => self.cvtop("i64.trunc_f64_u", Mvp, F64, I64),
			Operator::F32ConvertI32S => self.cvtop("f32.convert_i32_s", Mvp, I32, F32),
			Operator::F32ConvertI32U => self.cvtop("f32.convert_i32_u", Mvp, I32, F32),
			Operator::F32ConvertI64S => self.cvtop("f32.convert_i64_s", Mvp, I64, F32),
			Operator::F32ConvertI64U => self.cvtop("f32.convert_i64_u", Mvp, I64, F32),
			Operator::F32DemoteF64 => self.cvtop("f32.demote_f64", Mvp, F64, F32),
			Operator::F64ConvertI32S => self.cvtop("f64.convert_i32_s", Mvp, I32, F64),
			Operator::F64ConvertI32U => self.cvtop("f64.convert_i32_u", Mvp, I32, F64),
			Operator::F64ConvertI64S => self.cvtop("f64.convert_i64_s", Mvp, I64, F64),
			Operator::F64ConvertI64U => self.cvtop("f64.convert_i64_u", Mvp, I64, F64),
			Operator::F64PromoteF32 => self.cvtop("f64.promote_f32", Mvp, F32, F64),
			Operator::I32ReinterpretF32 => self.cvtop("i32.reinterpret_f32", Mvp, F32, I32),
			Operator::I64ReinterpretF64 => self.cvtop("i64.reinterpret_f64", Mvp, F64, I64),
			Operator::F32ReinterpretI32 => self.cvtop("f32.reinterpret_i32", Mvp, I32, F32),
			Operator::F64ReinterpretI64 => self.cvtop("f64.reinterpret_i64", Mvp, I64, F64),

			// Sign extension.
			Operator::I32Extend8S => self.unop("i32.extend8_s", Mvp, I32),
			Operator::I32Extend16S => self.unop("i32.extend16_s", Mvp, I32),
			Operator::I64Extend8S => self.unop("i64.extend8_s", Mvp, I64),
			Operator::I64Extend16S => self.unop("i64.extend16_s", Mvp, I64),
			Operator::I64Extend32S => self.unop("i64.extend32_s", Mvp, I64),

			// Saturating truncation.
			Operator::I32TruncSatF32S => self.cvtop("i32.trunc_sat_f32_s", Mvp, F32, I32),
			Operator::I32TruncSatF32U => self.cvtop("i32.trunc_sat_f32_u", Mvp, F32, I32),
			Operator::I32TruncSatF64S => self.cvtop("i32.trunc_sat_f64_s", Mvp, F64, I32),
			Operator::I32TruncSatF64U => self.cvtop("i32.trunc_sat_f64_u", Mvp, F64, I32),
			Operator::I64TruncSatF32S => self.cvtop("i64.trunc_sat_f32_s", Mvp, F32, I64),
			Operator::I64TruncSatF32U => self.cvtop("i64.trunc_sat_f32_u", Mvp, F32, I64),
			Operator::I64TruncSatF64S => self.cvtop("i64.trunc_sat_f64_s", Mvp, F64, I64),
			Operator::I64TruncSatF64U => self.cvtop("i64.trunc_sat_f64_u", Mvp, F64, I64),

			// Atomics.
			Operator::AtomicNotify(imm) => self.atomic_op("atomic.notify", imm, 2, &[I32, I32], &[I32]),
			Operator::AtomicWait32(imm) => {
				self.atomic_op("i32.atomic.wait", imm, 2, &[I32, I32, I64], &[I32])
			}
			Operator::AtomicWait64(imm) => {
				self.atomic_op("i64.atomic.wait", imm, 3, &[I32, I64, I64], &[I32])
			}
			Operator::I32AtomicLoad(imm) => self.atomic_op("i32.atomic.load", imm, 2, &[I32], &[I32]),
			Operator::I64AtomicLoad(imm) => self.atomic_op("i64.atomic.load", imm, 3, &[I32], &[I64]),
			Operator::I32AtomicLoad8U(imm) => self.atomic_op("i32.atomic.load8_u", imm, 0, &[I32], &[I32]),
			Operator::I32AtomicLoad16U(imm) => self.atomic_op("i32.atomic.load16_u", imm, 1, &[I32], &[I32]),
			Operator::I64AtomicLoad8U(imm) => self.atomic_op("i64.atomic.load8_u", imm, 0, &[I32], &[I64]),
			Operator::I64AtomicLoad16U(imm) => self.atomic_op("i64.atomic.load16_u", imm, 1, &[I32], &[I64]),
			Operator::I64AtomicLoad32U(imm) => self.atomic_op("i64.atomic.load32_u", imm, 2, &[I32], &[I64]),
			Operator::I32AtomicStore(imm) => self.atomic_op("i32.atomic.store", imm, 2, &[I32, I32], &[]),
			Operator::I64AtomicStore(imm) => self.atomic_op("i64.atomic.store", imm, 3, &[I32, I64], &[]),
			Operator::I32AtomicStore8(imm) => self.atomic_op("i32.atomic.store8", imm, 0, &[I32, I32], &[]),
			Operator::I32AtomicStore16(imm) => {
				self.atomic_op("i32.atomic.store16", imm, 1, &[I32, I32], &[])
			}
			Operator::I64AtomicStore8(imm) => self.atomic_op("i64.atomic.store8", imm, 0, &[I32, I64], &[]),
			Operator::I64AtomicStore16(imm) => {
				self.atomic_op("i64.atomic.store16", imm, 1, &[I32, I64], &[])
			}
			Operator::I64AtomicStore32(imm) => {
				self.atomic_op("i64.atomic.store32", imm, 2, &[I32, I64], &[])
			}
			Operator::I32AtomicRmwAdd(imm) => self.atomic_rmw("i32.atomic.rmw.add", imm, 2, I32),
			Operator::I64AtomicRmwAdd(imm) => self.atomic_rmw("i64.atomic.rmw.add", imm, 3, I64),
			Operator::I32AtomicRmw8AddU(imm) => self.atomic_rmw("i32.atomic.rmw8.add_u", imm, 0, I32),
			Operator::I32AtomicRmw16AddU(imm) => self.atomic_rmw("i32.atomic.rmw16.add_u", imm, 1, I32),
			Operator::I64AtomicRmw8AddU(imm) => self.atomic_rmw("i64.atomic.rmw8.add_u", imm, 0, I64),
			Operator::I64AtomicRmw16AddU(imm) => self.atomic_rmw("i64.atomic.rmw16.add_u", imm, 1, I64),
			Operator::I64AtomicRmw32AddU(imm) => self.atomic_rmw("i64.atomic.rmw32.add_u", imm, 2, I64),
			Operator::I32AtomicRmwSub(imm) => self.atomic_rmw("i32.atomic.rmw.sub", imm, 2, I32),
			Operator::I64AtomicRmwSub(imm) => self.atomic_rmw("i64.atomic.rmw.sub", imm, 3, I64),
			Operator::I32AtomicRmw8SubU(imm) => self.atomic_rmw("i32.atomic.rmw8.sub_u", imm, 0, I32),
			Operator::I32AtomicRmw16SubU(imm) => self.atomic_rmw("i32.atomic.rmw16.sub_u", imm, 1, I32),
			Operator::I64AtomicRmw8SubU(imm) => self.atomic_rmw("i64.atomic.rmw8.sub_u", imm, 0, I64),
			Operator::I64AtomicRmw16SubU(imm) => self.atomic_rmw("i64.atomic.rmw16.sub_u", imm, 1, I64),
			Operator::I64AtomicRmw32SubU(imm) => self.atomic_rmw("i64.atomic.rmw32.sub_u", imm, 2, I64),
			Operator::I32AtomicRmwAnd(imm) => self.atomic_rmw("i32.atomic.rmw.and", imm, 2, I32),
			Operator::I64AtomicRmwAnd(imm) => self.atomic_rmw("i64.atomic.rmw.and", imm, 3, I64),
			Operator::I32AtomicRmw8AndU(imm) => self.atomic_rmw("i32.atomic.rmw8.and_u", imm, 0, I32),
			Operator::I32AtomicRmw16AndU(imm) => self.atomic_rmw("i32.atomic.rmw16.and_u", imm, 1, I32),
			Operator::I64AtomicRmw8AndU(imm) => self.atomic_rmw("i64.atomic.rmw8.and_u", imm, 0, I64),
			Operator::I64AtomicRmw16AndU(imm) => self.atomic_rmw("i64.atomic.rmw16.and_u", imm, 1, I64),
			Operator::I64AtomicRmw32AndU(imm) => self.atomic_rmw("i64.atomic.rmw32.and_u", imm, 2, I64),
			Operator::I32AtomicRmwOr(imm) => self.atomic_rmw("i32.atomic.rmw.or", imm, 2, I32),
			Operator::I64AtomicRmwOr(imm) => self.atomic_rmw("i64.atomic.rmw.or", imm, 3, I64),
			Operator::I32AtomicRmw8OrU(imm) => self.atomic_rmw("i32.atomic.rmw8.or_u", imm, 0, I32),
			Operator::I32AtomicRmw16OrU(imm) => self.atomic_rmw("i32.atomic.rmw16.or_u", imm, 1, I32),
			Operator::I64AtomicRmw8OrU(imm) => self.atomic_rmw("i64.atomic.rmw8.or_u", imm, 0, I64),
			Operator::I64AtomicRmw16OrU(imm) => self.atomic_rmw("i64.atomic.rmw16.or_u", imm, 1, I64),
			Operator::I64AtomicRmw32OrU(imm) => self.atomic_rmw("i64.atomic.rmw32.or_u", imm, 2, I64),
			Operator::I32AtomicRmwXor(imm) => self.atomic_rmw("i32.atomic.rmw.xor", imm, 2, I32),
			Operator::I64AtomicRmwXor(imm) => self.atomic_rmw("i64.atomic.rmw.xor", imm, 3, I64),
			Operator::I32AtomicRmw8XorU(imm) => self.atomic_rmw("i32.atomic.rmw8.xor_u", imm, 0, I32),
			Operator::I32AtomicRmw16XorU(imm) => self.atomic_rmw("i32.atomic.rmw16.xor_u", imm, 1, I32),
			Operator::I64AtomicRmw8XorU(imm) => self.atomic_rmw("i64.atomic.rmw8.xor_u", imm, 0, I64),
			Operator::I64AtomicRmw16XorU(imm) => self.atomic_rmw("i64.atomic.rmw16.xor_u", imm, 1, I64),
			Operator::I64AtomicRmw32XorU(imm) => self.atomic_rmw("i64.atomic.rmw32.xor_u", imm, 2, I64),
			Operator::I32AtomicRmwXchg(imm) => self.atomic_rmw("i32.atomic.rmw.xchg", imm, 2, I32),
			Operator::I64AtomicRmwXchg(imm) => self.atomic_rmw("i64.atomic.rmw.xchg", imm, 3, I64),
			Operator::I32AtomicRmw8XchgU(imm) => self.atomic_rmw("i32.atomic.rmw8.xchg_u", imm, 0, I32),
			Operator::I32AtomicRmw16XchgU(imm) => self.atomic_rmw("i32.atomic.rmw16.xchg_u", imm, 1, I32),
			Operator::I64AtomicRmw8XchgU(imm) => self.atomic_rmw("i64.atomic.rmw8.xchg_u", imm, 0, I64),
			Operator::I64AtomicRmw16XchgU(imm) => self.atomic_rmw("i64.atomic.rmw16.xchg_u", imm, 1, I64),
			Operator::I64AtomicRmw32XchgU(imm) => self.atomic_rmw("i64.atomic.rmw32.xchg_u", imm, 2, I64),
			Operator::I32AtomicRmwCmpxchg(imm) => self.atomic_cmpxchg("i32.atomic.rmw.cmpxchg", imm, 2, I32),
			Operator::I64AtomicRmwCmpxchg(imm) => self.atomic_cmpxchg("i64.atomic.rmw.cmpxchg", imm, 3, I64),
			Operator::I32AtomicRmw8CmpxchgU(imm) => {
				self.atomic_cmpxchg("i32.atomic.rmw8.cmpxchg_u", imm, 0, I32)
			}
			Operator::I32AtomicRmw16CmpxchgU(imm) => {
				self.atomic_cmpxchg("i32.atomic.rmw16.cmpxchg_u", imm, 1, I32)
			}
			Operator::I64AtomicRmw8CmpxchgU(imm) => {
				self.atomic_cmpxchg("i64.atomic.rmw8.cmpxchg_u", imm, 0, I64)
			}
			Operator::I64AtomicRmw16CmpxchgU(imm) => {
				self.atomic_cmpxchg("i64.atomic.rmw16.cmpxchg_u", imm, 1, I64)
			}
			Operator::I64AtomicRmw32CmpxchgU(imm) => {
				self.atomic_cmpxchg("i64.atomic.rmw32.cmpxchg_u", imm, 2, I64)
			}

			// SIMD.
			Operator::V128Load(imm) => self.load("v128.load", Simd, imm, 4, V128),
			Operator::V128Store(imm) => self.store("v128.store", Simd, imm, 4, V128),
			Operator::V128Const(_) => self.const_op("v128.const", Simd, V128),
			Operator::V8x16Shuffle(imm) => self.shuffle(imm),
			Operator::V8x16Swizzle => self.binop("v8x16.swizzle", Simd, V128),
			Operator::I8x16Splat => self.splat("i8x16.splat", I32),
			Operator::I16x8Splat => self.splat("i16x8.splat", I32),
			Operator::I32x4Splat => self.splat("i32x4.splat", I32),
			Operator::I64x2Splat => self.splat("i64x2.splat", I64),
			Operator::F32x4Splat => self.splat("f32x4.splat", F32),
			Operator::F64x2Splat => self.splat("f64x2.splat", F64),
			Operator::I8x16ExtractLaneS(imm) => self.extract_lane("i8x16.extract_lane_s", imm, 16, I32),
			Operator::I8x16ExtractLaneU(imm) => self.extract_lane("i8x16.extract_lane_u", imm, 16, I32),
			Operator::I8x16ReplaceLane(imm) => self.replace_lane("i8x16.replace_lane", imm, 16, I32),
			Operator::I16x8ExtractLaneS(imm) => self.extract_lane("i16x8.extract_lane_s", imm, 8, I32),
			Operator::I16x8ExtractLaneU(imm) => self.extract_lane("i16x8.extract_lane_u", imm, 8, I32),
			Operator::I16x8ReplaceLane(imm) => self.replace_lane("i16x8.replace_lane", imm, 8, I32),
			Operator::I32x4ExtractLane(imm) => self.extract_lane("i32x4.extract_lane", imm, 4, I32),
			Operator::I32x4ReplaceLane(imm) => self.replace_lane("i32x4.replace_lane", imm, 4, I32),
			Operator::I64x2ExtractLane(imm) => self.extract_lane("i64x2.extract_lane", imm, 2, I64),
			Operator::I64x2ReplaceLane(imm) => self.replace_lane("i64x2.replace_lane", imm, 2, I64),
			Operator::F32x4ExtractLane(imm) => self.extract_lane("f32x4.extract_lane", imm, 4, F32),
			Operator::F32x4ReplaceLane(imm) => self.replace_lane("f32x4.replace_lane", imm, 4, F32),
			Operator::F64x2ExtractLane(imm) => self.extract_lane("f64x2.extract_lane", imm, 2, F64),
			Operator::F64x2ReplaceLane(imm) => self.replace_lane("f64x2.replace_lane", imm, 2, F64),
			Operator::I8x16Eq => self.binop("i8x16.eq", Simd, V128),
			Operator::I8x16Ne => self.binop("i8x16.ne", Simd, V128),
			Operator::I8x16LtS => self.binop("i8x16.lt_s", Simd, V128),
			Operator::I8x16LtU => self.binop("i8x16.lt_u", Simd, V128),
			Operator::I8x16GtS => self.binop("i8x16.gt_s", Simd, V128),
			Operator::I8x16GtU => self.binop("i8x16.gt_u", Simd, V128),
			Operator::I8x16LeS => self.binop("i8x16.le_s", Simd, V128),
			Operator::I8x16LeU => self.binop("i8x16.le_u", Simd, V128),
			Operator::I8x16GeS => self.binop("i8x16.ge_s", Simd, V128),
			Operator::I8x16GeU => self.binop("i8x16.ge_u", Simd, V128),
			Operator::I16x8Eq => self.binop("i16x8.eq", Simd, V128),
			Operator::I16x8Ne => self.binop("i16x8.ne", Simd, V128),
			Operator::I16x8LtS => self.binop("i16x8.lt_s", Simd, V128),
			Operator::I16x8LtU => self.binop("i16x8.lt_u", Simd, V128),
			Operator::I16x8GtS => self.binop("i16x8.gt_s", Simd, V128),
			Operator::I16x8GtU => self.binop("i16x8.gt_u", Simd, V128),
			Operator::I16x8LeS => self.binop("i16x8.le_s", Simd, V128),
			Operator::I16x8LeU => self.binop("i16x8.le_u", Simd, V128),
			Operator::I16x8GeS => self.binop("i16x8.ge_s", Simd, V128),
			Operator::I16x8GeU => self.binop("i16x8.ge_u", Simd, V128),
			Operator::I32x4Eq => self.binop("i32x4.eq", Simd, V128),
			Operator::I32x4Ne => self.binop("i32x4.ne", Simd, V128),
			Operator::I32x4LtS => self.binop("i32x4.lt_s", Simd, V128),
			Operator::I32x4LtU => self.binop("i32x4.lt_u", Simd, V128),
			Operator::I32x4GtS => self.binop("i32x4.gt_s", Simd, V128),
			Operator::I32x4GtU => self.binop("i32x4.gt_u", Simd, V128),
			Operator::I32x4LeS => self.binop("i32x4.le_s", Simd, V128),
			Operator::I32x4LeU => self.binop("i32x4.le_u", Simd, V128),
			Operator::I32x4GeS => self.binop("i32x4.ge_s", Simd, V128),
			Operator::I32x4GeU => self.binop("i32x4.ge_u", Simd, V128),
			Operator::F32x4Eq => self.binop("f32x4.eq", Simd, V128),
			Operator::F32x4Ne => self.binop("f32x4.ne", Simd, V128),
			Operator::F32x4Lt => self.binop("f32x4.lt", Simd, V128),
			Operator::F32x4Gt => self.binop("f32x4.gt", Simd, V128),
			Operator::F32x4Le => self.binop("f32x4.le", Simd, V128),
			Operator::F32x4Ge => self.binop("f32x4.ge", Simd, V128),
			Operator::F64x2Eq => self.binop("f64x2.eq", Simd, V128),
			Operator::F64x2Ne => self.binop("f64x2.ne", Simd, V128),
			Operator::F64x2Lt => self.binop("f64x2.lt", Simd, V128),
			Operator::F64x2Gt => self.binop("f64x2.gt", Simd, V128),
			Operator::F64x2Le => self.binop("f64x2.le", Simd, V128),
			Operator::F64x2Ge => self.binop("f64x2.ge", Simd, V128),
			Operator::V128Not => self.unop("v128.not", Simd, V128),
			Operator::V128And => self.binop("v128.and", Simd, V128),
			Operator::V128AndNot => self.binop("v128.andnot", Simd, V128),
			Operator::V128Or => self.binop("v128.or", Simd, V128),
			Operator::V128Xor => self.binop("v128.xor", Simd, V128),
			Operator::V128Bitselect => {
				self.op_sig("v128.bitselect", Simd, &[V128, V128, V128], &[V128])
			}
			Operator::I8x16Neg => self.unop("i8x16.neg", Simd, V128),
			Operator::I8x16AnyTrue => self.testop("i8x16.any_true", Simd, V128),
			Operator::I8x16AllTrue => self.testop("i8x16.all_true", Simd, V128),
			Operator::I8x16Shl => self.vshiftop("i8x16.shl"),
			Operator::I8x16ShrS => self.vshiftop("i8x16.shr_s"),
			Operator::I8x16ShrU => self.vshiftop("i8x16.shr_u"),
			Operator::I8x16Add => self.binop("i8x16.add", Simd, V128),
			Operator::I8x16AddSaturateS => self.binop("i8x16.add_saturate_s", Simd, V128),
			Operator::I8x16AddSaturateU => self.binop("i8x16.add_saturate_u", Simd, V128),
			Operator::I8x16Sub => self.binop("i8x16.sub", Simd, V128),
			Operator::I8x16SubSaturateS => self.binop("i8x16.sub_saturate_s", Simd, V128),
			Operator::I8x16SubSaturateU => self.binop("i8x16.sub_saturate_u", Simd, V128),
			Operator::I16x8Neg => self.unop("i16x8.neg", Simd, V128),
			Operator::I16x8AnyTrue => self.testop("i16x8.any_true", Simd, V128),
			Operator::I16x8AllTrue => self.testop("i16x8.all_true", Simd, V128),
			Operator::I16x8Shl => self.vshiftop("i16x8.shl"),
			Operator::I16x8ShrS => self.vshiftop("i16x8.shr_s"),
			Operator::I16x8ShrU => self.vshiftop("i16x8.shr_u"),
			Operator::I16x8Add => self.binop("i16x8.add", Simd, V128),
			Operator::I16x8AddSaturateS => self.binop("i16x8.add_saturate_s", Simd, V128),
			Operator::I16x8AddSaturateU => self.binop("i16x8.add_saturate_u", Simd, V128),
			Operator::I16x8Sub => self.binop("i16x8.sub", Simd, V128),
			Operator::I16x8SubSaturateS => self.binop("i16x8.sub_saturate_s", Simd, V128),
			Operator::I16x8SubSaturateU => self.binop("i16x8.sub_saturate_u", Simd, V128),
			Operator::I16x8Mul => self.binop("i16x8.mul", Simd, V128),
			Operator::I32x4Neg => self.unop("i32x4.neg", Simd, V128),
			Operator::I32x4AnyTrue => self.testop("i32x4.any_true", Simd, V128),
			Operator::I32x4AllTrue => self.testop("i32x4.all_true", Simd, V128),
			Operator::I32x4Shl => self.vshiftop("i32x4.shl"),
			Operator::I32x4ShrS => self.vshiftop("i32x4.shr_s"),
			Operator::I32x4ShrU => self.vshiftop("i32x4.shr_u"),
			Operator::I32x4Add => self.binop("i32x4.add", Simd, V128),
			Operator::I32x4Sub => self.binop("i32x4.sub", Simd, V128),
			Operator::I32x4Mul => self.binop("i32x4.mul", Simd, V128),
			Operator::I64x2Neg => self.unop("i64x2.neg", Simd, V128),
			Operator::I64x2Shl => self.vshiftop("i64x2.shl"),
			Operator::I64x2ShrS => self.vshiftop("i64x2.shr_s"),
			Operator::I64x2ShrU => self.vshiftop("i64x2.shr_u"),
			Operator::I64x2Add => self.binop("i64x2.add", Simd, V128),
			Operator::I64x2Sub => self.binop("i64x2.sub", Simd, V128),
			Operator::I64x2Mul => self.binop("i64x2.mul", Simd, V128),
			Operator::F32x4Abs => self.unop("f32x4.abs", Simd, V128),
			Operator::F32x4Neg => self.unop("f32x4.neg", Simd, V128),
			Operator::F32x4Sqrt => self.unop("f32x4.sqrt", Simd, V128),
			Operator::F32x4Add => self.binop("f32x4.add", Simd, V128),
			Operator::F32x4Sub => self.binop("f32x4.sub", Simd, V128),
			Operator::F32x4Mul => self.binop("f32x4.mul", Simd, V128),
			Operator::F32x4Div => self.binop("f32x4.div", Simd, V128),
			Operator::F32x4Min => self.binop("f32x4.min", Simd, V128),
			Operator::F32x4Max => self.binop("f32x4.max", Simd, V128),
			Operator::F64x2Abs => self.unop("f64x2.abs", Simd, V128),
			Operator::F64x2Neg => self.unop("f64x2.neg", Simd, V128),
			Operator::F64x2Sqrt => self.unop("f64x2.sqrt", Simd, V128),
			Operator::F64x2Add => self.binop("f64x2.add", Simd, V128),
			Operator::F64x2Sub => self.binop("f64x2.sub", Simd, V128),
			Operator::F64x2Mul => self.binop("f64x2.mul", Simd, V128),
			Operator::F64x2Div => self.binop("f64x2.div", Simd, V128),
			Operator::F64x2Min => self.binop("f64x2.min", Simd, V128),
			Operator::F64x2Max => self.binop("f64x2.max", Simd, V128),
			Operator::I32x4TruncSatF32x4S => self.unop("i32x4.trunc_sat_f32x4_s", Simd, V128),
			Operator::I32x4TruncSatF32x4U => self.unop("i32x4.trunc_sat_f32x4_u", Simd, V128),
			Operator::F32x4ConvertI32x4S => self.unop("f32x4.convert_i32x4_s", Simd, V128),
			Operator::F32x4ConvertI32x4U => self.unop("f32x4.convert_i32x4_u", Simd, V128),
		}
	}

	// Structured control.

	fn block(&mut self, imm: &ControlStructureImm) -> Result<()> {
		let typ = validate_block_type(self.module, &imm.typ)?;
		self.pop_and_validate_type_tuple("block arguments", &typ.params)?;
		self.push_control_stack(
			ControlContextType::Block,
			typ.results.clone(),
			typ.results,
			TypeTuple::new(),
		);
		self.push_operand_tuple(&typ.params);
		Ok(())
	}

	fn loop_(&mut self, imm: &ControlStructureImm) -> Result<()> {
		let typ = validate_block_type(self.module, &imm.typ)?;
		self.pop_and_validate_type_tuple("loop arguments", &typ.params)?;
		self.push_control_stack(ControlContextType::Loop, typ.params.clone(), typ.results, TypeTuple::new());
		self.push_operand_tuple(&typ.params);
		Ok(())
	}

	fn if_(&mut self, imm: &ControlStructureImm) -> Result<()> {
		let typ = validate_block_type(self.module, &imm.typ)?;
		self.pop_and_validate_operand("if condition", I32)?;
		self.pop_and_validate_type_tuple("if arguments", &typ.params)?;
		self.push_control_stack(
			ControlContextType::IfThen,
			typ.results.clone(),
			typ.results,
			typ.params.clone(),
		);
		self.push_operand_tuple(&typ.params);
		Ok(())
	}

	fn else_(&mut self) -> Result<()> {
		if self.frame().typ != ControlContextType::IfThen {
			return Err(ValidationError::new("else only allowed in if context"));
		}

		let results = self.frame().results.clone();
		self.pop_and_validate_type_tuple("if result", &results)?;
		self.validate_stack_empty_at_end_of_control_structure()?;

		let frame = self.frame_mut();
		frame.typ = ControlContextType::IfElse;
		frame.is_reachable = true;
		let else_params = frame.else_params.clone();

		self.push_operand_tuple(&else_params);
		Ok(())
	}

	fn end(&mut self) -> Result<()> {
		if self.frame().typ == ControlContextType::Try {
			return Err(ValidationError::new("end may not occur in try context"));
		}

		let results = self.frame().results.clone();
		if self.frame().typ == ControlContextType::IfThen && results != self.frame().else_params {
			return Err(ValidationError::new("else-less if must have identity signature"));
		}

		self.pop_and_validate_type_tuple("end result", &results)?;
		self.validate_stack_empty_at_end_of_control_structure()?;

		self.control_stack.pop();
		if !self.control_stack.is_empty() {
			self.push_operand_tuple(&results);
		}
		Ok(())
	}

	fn try_(&mut self, imm: &ControlStructureImm) -> Result<()> {
		self.feature("try", ExceptionHandling)?;
		let typ = validate_block_type(self.module, &imm.typ)?;
		self.pop_and_validate_type_tuple("try arguments", &typ.params)?;
		self.push_control_stack(ControlContextType::Try, typ.results.clone(), typ.results, TypeTuple::new());
		self.push_operand_tuple(&typ.params);
		Ok(())
	}

	fn validate_catch(&mut self) -> Result<()> {
		let results = self.frame().results.clone();
		self.pop_and_validate_type_tuple("try result", &results)?;
		self.validate_stack_empty_at_end_of_control_structure()?;

		let frame = self.frame_mut();
		match frame.typ {
			ControlContextType::Try | ControlContextType::Catch => {
				frame.typ = ControlContextType::Catch;
				frame.is_reachable = true;
				Ok(())
			}
			_ => Err(ValidationError::new("catch only allowed in try/catch context")),
		}
	}

	fn catch_(&mut self, imm: &ExceptionTypeImm) -> Result<()> {
		self.feature("catch", ExceptionHandling)?;
		validate_index(
			"exception type index",
			imm.exception_type_index,
			self.module.exception_types.size(),
		)?;
		let params = self.module.exception_types.get_type(imm.exception_type_index).params.clone();
		self.validate_catch()?;
		self.push_operand_tuple(&params);
		Ok(())
	}

	fn catch_all(&mut self) -> Result<()> {
		self.feature("catch_all", ExceptionHandling)?;
		self.validate_catch()
	}

	fn throw(&mut self, imm: &ExceptionTypeImm) -> Result<()> {
		self.feature("throw", ExceptionHandling)?;
		validate_index(
			"exception type index",
			imm.exception_type_index,
			self.module.exception_types.size(),
		)?;
		let params = self.module.exception_types.get_type(imm.exception_type_index).params.clone();
		self.pop_and_validate_type_tuple("exception arguments", &params)?;
		self.enter_unreachable();
		Ok(())
	}

	fn rethrow(&mut self, imm: &RethrowImm) -> Result<()> {
		self.feature("rethrow", ExceptionHandling)?;
		if self.branch_target_by_depth(imm.catch_depth)?.typ != ControlContextType::Catch {
			return Err(ValidationError::new("rethrow must target a catch"));
		}
		self.enter_unreachable();
		Ok(())
	}

	// Branches.

	fn br(&mut self, imm: &BranchImm) -> Result<()> {
		let params = self.branch_target_by_depth(imm.target_depth)?.params.clone();
		self.pop_and_validate_type_tuple("br argument", &params)?;
		self.enter_unreachable();
		Ok(())
	}

	fn br_if(&mut self, imm: &BranchImm) -> Result<()> {
		let params = self.branch_target_by_depth(imm.target_depth)?.params.clone();
		self.pop_and_validate_operand("br_if condition", I32)?;
		self.pop_and_validate_type_tuple("br_if argument", &params)?;
		self.push_operand_tuple(&params);
		Ok(())
	}

	fn br_table(&mut self, imm: &BranchTableImm) -> Result<()> {
		self.pop_and_validate_operand("br_table index", I32)?;

		let default_params = self.branch_target_by_depth(imm.default_target_depth)?.params.clone();

		let function_def = self.function_def;
		validate_index("branch table index", imm.branch_table_index, function_def.branch_tables.len())?;
		for target_depth in &function_def.branch_tables[imm.branch_table_index] {
			let target_params = self.branch_target_by_depth(*target_depth)?.params.clone();
			if target_params.len() != default_params.len() {
				return Err(ValidationError::new(
					"br_table targets must all take the same number of parameters",
				));
			}
			self.peek_and_validate_type_tuple("br_table argument", &target_params)?;
		}

		self.pop_and_validate_type_tuple("br_table argument", &default_params)?;
		self.enter_unreachable();
		Ok(())
	}

	fn return_(&mut self) -> Result<()> {
		let results = self.function_type.results.clone();
		self.pop_and_validate_type_tuple("ret", &results)?;
		self.enter_unreachable();
		Ok(())
	}

	// Calls.

	fn call(&mut self, imm: &FunctionImm) -> Result<()> {
		let module = self.module;
		let callee_type = validate_function_index(module, imm.function_index)?;
		self.pop_and_validate_type_tuple("call arguments", &callee_type.params)?;
		self.push_operand_tuple(&callee_type.results);
		Ok(())
	}

	fn call_indirect(&mut self, imm: &CallIndirectImm) -> Result<()> {
		let module = self.module;
		validate_index("table index", imm.table_index, module.tables.size())?;
		if module.tables.get_type(imm.table_index).element_type != ReferenceType::FuncRef {
			return Err(ValidationError::new("call_indirect requires a table element type of funcref"));
		}
		let callee_type = validate_function_type(module, &imm.typ)?;
		self.pop_and_validate_operand("call_indirect function index", I32)?;
		self.pop_and_validate_type_tuple("call_indirect arguments", &callee_type.params)?;
		self.push_operand_tuple(&callee_type.results);
		Ok(())
	}

	// Parametric.

	fn select(&mut self, imm: &SelectImm) -> Result<()> {
		self.pop_and_validate_operand("select condition", I32)?;

		if imm.typ == Any {
			let false_type = self.pop_and_validate_operand("select false value", Any)?;
			let true_type = self.pop_and_validate_operand("select true value", Any)?;
			if (false_type != Any && !false_type.is_numeric())
				|| (true_type != Any && !true_type.is_numeric())
			{
				return Err(ValidationError::new("non-typed select operands must be numeric types"));
			}
			if false_type == Any {
				self.push_operand(true_type);
			} else if true_type == Any {
				self.push_operand(false_type);
			} else {
				if false_type != true_type {
					return Err(ValidationError::new(
						"non-typed select operands must have the same numeric type",
					));
				}
				self.push_operand(false_type);
			}
		} else {
			self.feature("typed select instruction", ReferenceTypes)?;
			validate_value_type(&self.module.feature_spec, imm.typ)?;
			self.pop_and_validate_operand("select false value", imm.typ)?;
			self.pop_and_validate_operand("select true value", imm.typ)?;
			self.push_operand(imm.typ);
		}
		Ok(())
	}

	// Variables.

	fn local_get(&mut self, imm: &VariableImm) -> Result<()> {
		let local_type = self.local_type(imm.variable_index)?;
		self.push_operand(local_type);
		Ok(())
	}

	fn local_set(&mut self, imm: &VariableImm) -> Result<()> {
		let local_type = self.local_type(imm.variable_index)?;
		self.pop_and_validate_operand("local.set", local_type)?;
		Ok(())
	}

	fn local_tee(&mut self, imm: &VariableImm) -> Result<()> {
		let local_type = self.local_type(imm.variable_index)?;
		let operand_type = self.pop_and_validate_operand("local.tee", local_type)?;
		self.push_operand(operand_type);
		Ok(())
	}

	fn global_get(&mut self, imm: &VariableImm) -> Result<()> {
		let value_type =
			validate_global_index(self.module, imm.variable_index, false, false, false, "global.get")?;
		self.push_operand(value_type);
		Ok(())
	}

	fn global_set(&mut self, imm: &VariableImm) -> Result<()> {
		let value_type =
			validate_global_index(self.module, imm.variable_index, true, false, false, "global.set")?;
		self.pop_and_validate_operand("global.set", value_type)?;
		Ok(())
	}

	// Tables.

	fn table_get(&mut self, imm: &TableImm) -> Result<()> {
		self.feature("table.get", ReferenceTypes)?;
		let element_type = self.table_element_type(imm.table_index)?;
		self.pop_and_validate_operand("table.get", I32)?;
		self.push_operand(element_type);
		Ok(())
	}

	fn table_set(&mut self, imm: &TableImm) -> Result<()> {
		self.feature("table.set", ReferenceTypes)?;
		let element_type = self.table_element_type(imm.table_index)?;
		self.pop_and_validate_type_tuple("table.set", &[I32, element_type])?;
		Ok(())
	}

	fn table_grow(&mut self, imm: &TableImm) -> Result<()> {
		self.feature("table.grow", ReferenceTypes)?;
		let element_type = self.table_element_type(imm.table_index)?;
		self.pop_and_validate_type_tuple("table.grow", &[element_type, I32])?;
		self.push_operand(I32);
		Ok(())
	}

	fn table_fill(&mut self, imm: &TableImm) -> Result<()> {
		self.feature("table.fill", ReferenceTypes)?;
		let element_type = self.table_element_type(imm.table_index)?;
		self.pop_and_validate_type_tuple("table.fill", &[I32, element_type, I32])?;
		Ok(())
	}

	fn table_size(&mut self, imm: &TableImm) -> Result<()> {
		self.feature("table.size", ReferenceTypes)?;
		validate_index("table index", imm.table_index, self.module.tables.size())?;
		self.push_operand(I32);
		Ok(())
	}

	fn table_copy(&mut self, imm: &TableCopyImm) -> Result<()> {
		self.feature("table.copy", Mvp)?;
		let module = self.module;
		validate_index("source table index", imm.source_table_index, module.tables.size())?;
		validate_index("dest table index", imm.dest_table_index, module.tables.size())?;
		let source_type = module.tables.get_type(imm.source_table_index).element_type.as_value_type();
		let dest_type = module.tables.get_type(imm.dest_table_index).element_type.as_value_type();
		if !is_subtype(source_type, dest_type) {
			return Err(ValidationError::new(
				"source table element type must be a subtype of the destination table element type",
			));
		}
		self.pop_and_validate_type_tuple("table.copy", &[I32, I32, I32])?;
		Ok(())
	}

	fn table_init(&mut self, imm: &ElemSegmentAndTableImm) -> Result<()> {
		self.feature("table.init", Mvp)?;
		validate_index("elem segment index", imm.elem_segment_index, self.module.elem_segments.len())?;
		validate_index("table index", imm.table_index, self.module.tables.size())?;
		self.pop_and_validate_type_tuple("table.init", &[I32, I32, I32])?;
		Ok(())
	}

	fn elem_drop(&mut self, imm: &ElemSegmentImm) -> Result<()> {
		self.feature("elem.drop", Mvp)?;
		validate_index("elem segment index", imm.elem_segment_index, self.module.elem_segments.len())?;
		Ok(())
	}

	// Memory.

	fn memory_size(&mut self, imm: &MemoryImm) -> Result<()> {
		self.feature("memory.size", Mvp)?;
		validate_index("memory index", imm.memory_index, self.module.memories.size())?;
		self.push_operand(I32);
		Ok(())
	}

	fn memory_grow(&mut self, imm: &MemoryImm) -> Result<()> {
		self.feature("memory.grow", Mvp)?;
		validate_index("memory index", imm.memory_index, self.module.memories.size())?;
		self.pop_and_validate_operand("memory.grow", I32)?;
		self.push_operand(I32);
		Ok(())
	}

	fn memory_copy(&mut self, imm: &MemoryCopyImm) -> Result<()> {
		self.feature("memory.copy", Mvp)?;
		validate_index("source memory index", imm.source_memory_index, self.module.memories.size())?;
		validate_index("dest memory index", imm.dest_memory_index, self.module.memories.size())?;
		self.pop_and_validate_type_tuple("memory.copy", &[I32, I32, I32])?;
		Ok(())
	}

	fn memory_fill(&mut self, imm: &MemoryImm) -> Result<()> {
		self.feature("memory.fill", Mvp)?;
		validate_index("memory index", imm.memory_index, self.module.memories.size())?;
		self.pop_and_validate_type_tuple("memory.fill", &[I32, I32, I32])?;
		Ok(())
	}

	fn memory_init(&mut self, imm: &DataSegmentAndMemImm) -> Result<()> {
		self.feature("memory.init", Mvp)?;
		validate_index("data segment index", imm.data_segment_index, self.module.data_segments.len())?;
		validate_index("memory index", imm.memory_index, self.module.memories.size())?;
		self.pop_and_validate_type_tuple("memory.init", &[I32, I32, I32])?;
		Ok(())
	}

	fn data_drop(&mut self, imm: &DataSegmentImm) -> Result<()> {
		self.feature("data.drop", Mvp)?;
		validate_index("data segment index", imm.data_segment_index, self.module.data_segments.len())?;
		Ok(())
	}

	// Operator families with fixed signatures.

	fn const_op(&mut self, context: &'static str, feature: Feature, typ: ValueType) -> Result<()> {
		self.feature(context, feature)?;
		self.push_operand(typ);
		Ok(())
	}

	fn unop(&mut self, context: &'static str, feature: Feature, typ: ValueType) -> Result<()> {
		self.op_sig(context, feature, &[typ], &[typ])
	}

	fn binop(&mut self, context: &'static str, feature: Feature, typ: ValueType) -> Result<()> {
		self.op_sig(context, feature, &[typ, typ], &[typ])
	}

	fn testop(&mut self, context: &'static str, feature: Feature, typ: ValueType) -> Result<()> {
		self.op_sig(context, feature, &[typ], &[I32])
	}

	fn relop(&mut self, context: &'static str, feature: Feature, typ: ValueType) -> Result<()> {
		self.op_sig(context, feature, &[typ, typ], &[I32])
	}

	fn cvtop(&mut self, context: &'static str, feature: Feature, from: ValueType, to: ValueType) -> Result<()> {
		self.op_sig(context, feature, &[from], &[to])
	}

	fn vshiftop(&mut self, context: &'static str) -> Result<()> {
		self.op_sig(context, Simd, &[V128, I32], &[V128])
	}

	fn op_sig(
		&mut self,
		context: &'static str,
		feature: Feature,
		params: &[ValueType],
		results: &[ValueType],
	) -> Result<()> {
		self.feature(context, feature)?;
		self.pop_and_validate_type_tuple(context, params)?;
		self.push_operand_tuple(results);
		Ok(())
	}

	fn load(
		&mut self,
		context: &'static str,
		feature: Feature,
		imm: &LoadOrStoreImm,
		natural_alignment_log2: u32,
		result: ValueType,
	) -> Result<()> {
		self.feature(context, feature)?;
		self.validate_load_or_store_imm(imm, natural_alignment_log2)?;
		self.pop_and_validate_operand(context, I32)?;
		self.push_operand(result);
		Ok(())
	}

	fn store(
		&mut self,
		context: &'static str,
		feature: Feature,
		imm: &LoadOrStoreImm,
		natural_alignment_log2: u32,
		operand: ValueType,
	) -> Result<()> {
		self.feature(context, feature)?;
		self.validate_load_or_store_imm(imm, natural_alignment_log2)?;
		self.pop_and_validate_type_tuple(context, &[I32, operand])?;
		Ok(())
	}

	fn atomic_rmw(
		&mut self,
		context: &'static str,
		imm: &LoadOrStoreImm,
		natural_alignment_log2: u32,
		typ: ValueType,
	) -> Result<()> {
		self.atomic_op(context, imm, natural_alignment_log2, &[I32, typ], &[typ])
	}

	fn atomic_cmpxchg(
		&mut self,
		context: &'static str,
		imm: &LoadOrStoreImm,
		natural_alignment_log2: u32,
		typ: ValueType,
	) -> Result<()> {
		self.atomic_op(context, imm, natural_alignment_log2, &[I32, typ, typ], &[typ])
	}

	fn atomic_op(
		&mut self,
		context: &'static str,
		imm: &LoadOrStoreImm,
		natural_alignment_log2: u32,
		params: &[ValueType],
		results: &[ValueType],
	) -> Result<()> {
		self.feature(context, Atomics)?;
		self.validate_atomic_imm(imm, natural_alignment_log2)?;
		self.pop_and_validate_type_tuple(context, params)?;
		self.push_operand_tuple(results);
		Ok(())
	}

	fn splat(&mut self, context: &'static str, from: ValueType) -> Result<()> {
		self.op_sig(context, Simd, &[from], &[V128])
	}

	fn extract_lane(
		&mut self,
		context: &'static str,
		imm: &LaneIndexImm,
		num_lanes: u32,
		to: ValueType,
	) -> Result<()> {
		self.feature(context, Simd)?;
		validate_lane_index(imm.lane_index, num_lanes)?;
		self.pop_and_validate_operand(context, V128)?;
		self.push_operand(to);
		Ok(())
	}

	fn replace_lane(
		&mut self,
		context: &'static str,
		imm: &LaneIndexImm,
		num_lanes: u32,
		from: ValueType,
	) -> Result<()> {
		self.feature(context, Simd)?;
		validate_lane_index(imm.lane_index, num_lanes)?;
		self.pop_and_validate_type_tuple(context, &[V128, from])?;
		self.push_operand(V128);
		Ok(())
	}

	fn shuffle(&mut self, imm: &ShuffleImm) -> Result<()> {
		self.feature("v8x16.shuffle", Simd)?;
		for lane_index in imm.lane_indices.iter() {
			validate_lane_index(u32::from(*lane_index), 32)?;
		}
		self.pop_and_validate_type_tuple("v8x16.shuffle", &[V128, V128])?;
		self.push_operand(V128);
		Ok(())
	}

	// Immediate checks shared by families.

	fn validate_load_or_store_imm(&self, imm: &LoadOrStoreImm, natural_alignment_log2: u32) -> Result<()> {
		if imm.alignment_log2 > natural_alignment_log2 {
			return Err(ValidationError::new("load or store alignment greater than natural alignment"));
		}
		if self.module.memories.size() == 0 {
			return Err(ValidationError::new("load or store in module without default memory"));
		}
		Ok(())
	}

	fn validate_atomic_imm(&self, imm: &LoadOrStoreImm, natural_alignment_log2: u32) -> Result<()> {
		if self.module.memories.size() == 0 {
			return Err(ValidationError::new("atomic memory operator in module without default memory"));
		}
		if self.module.feature_spec.require_shared_flag_for_atomic_operators
			&& !self.module.memories.get_type(0).is_shared
		{
			return Err(ValidationError::new(
				"atomic memory operators require a memory with the shared flag",
			));
		}
		if imm.alignment_log2 != natural_alignment_log2 {
			return Err(ValidationError::new("atomic memory operators must have natural alignment"));
		}
		Ok(())
	}

	fn table_element_type(&self, table_index: usize) -> Result<ValueType> {
		validate_index("table index", table_index, self.module.tables.size())?;
		Ok(self.module.tables.get_type(table_index).element_type.as_value_type())
	}

	fn local_type(&self, local_index: usize) -> Result<ValueType> {
		validate_index("local index", local_index, self.locals.len())?;
		Ok(self.locals[local_index])
	}

	fn feature(&self, context: &'static str, feature: Feature) -> Result<()> {
		if self.module.feature_spec.has(feature) {
			Ok(())
		} else {
			Err(ValidationError::new(format!("{} requires {} feature", context, feature.name())))
		}
	}

	// The dual-stack machine.

	fn frame(&self) -> &ControlContext {
		// op() rejects operators once the final end has popped the
		// outermost frame, so the control stack is never empty here.
		match self.control_stack.last() {
			Some(frame) => frame,
			None => unreachable!(),
		}
	}

	fn frame_mut(&mut self) -> &mut ControlContext {
		match self.control_stack.last_mut() {
			Some(frame) => frame,
			None => unreachable!(),
		}
	}

	fn push_control_stack(
		&mut self,
		typ: ControlContextType,
		params: TypeTuple,
		results: TypeTuple,
		else_params: TypeTuple,
	) {
		self.control_stack.push(ControlContext {
			typ,
			outer_stack_size: self.stack.len(),
			params,
			results,
			is_reachable: true,
			else_params,
		});
	}

	fn validate_stack_empty_at_end_of_control_structure(&self) -> Result<()> {
		let outer_stack_size = self.frame().outer_stack_size;
		if self.stack.len() != outer_stack_size {
			let mut message = String::from("stack was not empty at end of control structure: ");
			for (index, typ) in self.stack[outer_stack_size..].iter().enumerate() {
				if index != 0 {
					message.push_str(", ");
				}
				message.push_str(&format!("{}", typ));
			}
			return Err(ValidationError::new(message));
		}
		Ok(())
	}

	/// Truncates the operand stack to the current frame's floor and marks the
	/// rest of the frame unreachable, so reads bottom out at `Any`.
	fn enter_unreachable(&mut self) {
		let outer_stack_size = self.frame().outer_stack_size;
		self.stack.truncate(outer_stack_size);
		self.frame_mut().is_reachable = false;
	}

	fn branch_target_by_depth(&self, depth: usize) -> Result<&ControlContext> {
		validate_index("branch target depth", depth, self.control_stack.len())?;
		Ok(&self.control_stack[self.control_stack.len() - depth - 1])
	}

	fn peek_and_validate_operand(
		&self,
		context: &str,
		operand_depth: usize,
		expected_type: ValueType,
	) -> Result<ValueType> {
		let frame = self.frame();
		let actual_type = if self.stack.len() > frame.outer_stack_size + operand_depth {
			self.stack[self.stack.len() - operand_depth - 1]
		} else if !frame.is_reachable {
			// Unreachable code reads the bottom type, which satisfies any
			// expectation.
			Any
		} else {
			return Err(ValidationError::new(format!(
				"type mismatch: expected {} but stack was empty in {} operand",
				expected_type, context
			)));
		};

		if !is_subtype(actual_type, expected_type) {
			return Err(ValidationError::new(format!(
				"type mismatch: expected {} but got {} in {} operand",
				expected_type, actual_type, context
			)));
		}
		Ok(actual_type)
	}

	fn pop_and_validate_operand(&mut self, context: &str, expected_type: ValueType) -> Result<ValueType> {
		let actual_type = self.peek_and_validate_operand(context, 0, expected_type)?;
		// Pops never shrink the stack below the frame's floor: once at the
		// floor in unreachable mode, pops are idempotent.
		if self.stack.len() > self.frame().outer_stack_size {
			self.stack.pop();
		}
		Ok(actual_type)
	}

	/// Pops right-to-left: the tuple's last entry is expected topmost.
	fn pop_and_validate_type_tuple(&mut self, context: &str, expected_types: &[ValueType]) -> Result<()> {
		for expected_type in expected_types.iter().rev() {
			self.pop_and_validate_operand(context, *expected_type)?;
		}
		Ok(())
	}

	/// Non-destructive tuple check: entry `i` is validated at operand depth
	/// `len - i - 1`, so the deepest operand lines up with the first entry.
	fn peek_and_validate_type_tuple(&self, context: &str, expected_types: &[ValueType]) -> Result<()> {
		for (index, expected_type) in expected_types.iter().enumerate() {
			self.peek_and_validate_operand(context, expected_types.len() - index - 1, *expected_type)?;
		}
		Ok(())
	}

	fn push_operand(&mut self, typ: ValueType) {
		self.stack.push(typ);
	}

	fn push_operand_tuple(&mut self, types: &[ValueType]) {
		for typ in types {
			self.push_operand(*typ);
		}
	}
}

fn validate_lane_index(lane_index: u32, num_lanes: u32) -> Result<()> {
	if lane_index >= num_lanes {
		Err(ValidationError::new(format!("invalid lane index: {} must be less than {}", lane_index, num_lanes)))
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::structure::modules::{FunctionDef, IndexedFunctionType, Module};

	fn module_with_nullary_type() -> Module {
		let mut module = Module::default();
		module.types.push(FunctionType::default());
		module
	}

	fn nullary_def() -> FunctionDef {
		FunctionDef { typ: IndexedFunctionType { index: 0 }, ..FunctionDef::default() }
	}

	#[test]
	fn peek_depth_order() {
		let module = module_with_nullary_type();
		let def = nullary_def();
		let mut stream = CodeValidationStream::new(&module, &def).unwrap();
		stream.op(&Operator::I32Const(1)).unwrap();
		stream.op(&Operator::I64Const(2)).unwrap();

		// The deepest operand is checked against the first tuple entry.
		stream.peek_and_validate_type_tuple("test", &[I32, I64]).unwrap();
		stream.peek_and_validate_type_tuple("test", &[I64, I32]).unwrap_err();
	}

	#[test]
	fn pops_are_clamped_at_frame_floor_when_unreachable() {
		let module = module_with_nullary_type();
		let def = nullary_def();
		let mut stream = CodeValidationStream::new(&module, &def).unwrap();
		stream.op(&Operator::Unreachable).unwrap();

		// Reads bottom out at `Any` and never report an empty stack.
		for _ in 0..3 {
			stream.op(&Operator::Drop).unwrap();
		}
		assert!(stream.stack.is_empty());
		stream.op(&Operator::End).unwrap();
		stream.finish().unwrap();
	}

	#[test]
	fn operators_after_final_end_are_rejected() {
		let module = module_with_nullary_type();
		let def = nullary_def();
		let mut stream = CodeValidationStream::new(&module, &def).unwrap();
		stream.op(&Operator::End).unwrap();
		stream.op(&Operator::Nop).unwrap_err();
	}
}
