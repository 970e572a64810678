use crate::structure::{modules::IndexedFunctionType, types::ValueType};

/// A block/loop/if/try signature as encoded: empty, a single result, or a
/// reference into the module's type section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexedBlockType {
	NoParametersOrResult,
	OneResult(ValueType),
	FunctionType(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlStructureImm {
	pub typ: IndexedBlockType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchImm {
	pub target_depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchTableImm {
	pub default_target_depth: usize,
	/// Index into the function def's `branch_tables`.
	pub branch_table_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FunctionImm {
	pub function_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallIndirectImm {
	pub typ: IndexedFunctionType,
	pub table_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariableImm {
	pub variable_index: usize,
}

/// Untyped `select` carries `Any`; the typed form carries its value type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectImm {
	pub typ: ValueType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOrStoreImm {
	pub alignment_log2: u32,
	pub offset: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryImm {
	pub memory_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryCopyImm {
	pub source_memory_index: usize,
	pub dest_memory_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableImm {
	pub table_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableCopyImm {
	pub source_table_index: usize,
	pub dest_table_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaneIndexImm {
	pub lane_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShuffleImm {
	pub lane_indices: [u8; 16],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExceptionTypeImm {
	pub exception_type_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RethrowImm {
	pub catch_depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataSegmentAndMemImm {
	pub data_segment_index: usize,
	pub memory_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataSegmentImm {
	pub data_segment_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElemSegmentAndTableImm {
	pub elem_segment_index: usize,
	pub table_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElemSegmentImm {
	pub elem_segment_index: usize,
}

/// One decoded operator. Variants are grouped the way the validator's
/// dispatch is grouped: control, parametric, variables, references, tables,
/// memory, numeric, atomics, SIMD.
#[derive(Clone, Debug, PartialEq)]
pub enum Operator {
	// Control.
	Unreachable,
	Nop,
	Block(ControlStructureImm),
	Loop(ControlStructureImm),
	If(ControlStructureImm),
	Else,
	End,
	Try(ControlStructureImm),
	Catch(ExceptionTypeImm),
	CatchAll,
	Throw(ExceptionTypeImm),
	Rethrow(RethrowImm),
	Br(BranchImm),
	BrIf(BranchImm),
	BrTable(BranchTableImm),
	Return,
	Call(FunctionImm),
	CallIndirect(CallIndirectImm),

	// Parametric.
	Drop,
	Select(SelectImm),

	// Variables.
	LocalGet(VariableImm),
	LocalSet(VariableImm),
	LocalTee(VariableImm),
	GlobalGet(VariableImm),
	GlobalSet(VariableImm),

	// References.
	RefNull,
	RefIsNull,
	RefFunc(FunctionImm),

	// Tables.
	TableGet(TableImm),
	TableSet(TableImm),
	TableGrow(TableImm),
	TableFill(TableImm),
	TableSize(TableImm),
	TableCopy(TableCopyImm),
	TableInit(ElemSegmentAndTableImm),
	ElemDrop(ElemSegmentImm),

	// Memory.
	I32Load(LoadOrStoreImm),
	I64Load(LoadOrStoreImm),
	F32Load(LoadOrStoreImm),
	F64Load(LoadOrStoreImm),
	I32Load8S(LoadOrStoreImm),
	I32Load8U(LoadOrStoreImm),
	I32Load16S(LoadOrStoreImm),
	I32Load16U(LoadOrStoreImm),
	I64Load8S(LoadOrStoreImm),
	I64Load8U(LoadOrStoreImm),
	I64Load16S(LoadOrStoreImm),
	I64Load16U(LoadOrStoreImm),
	I64Load32S(LoadOrStoreImm),
	I64Load32U(LoadOrStoreImm),
	I32Store(LoadOrStoreImm),
	I64Store(LoadOrStoreImm),
	F32Store(LoadOrStoreImm),
	F64Store(LoadOrStoreImm),
	I32Store8(LoadOrStoreImm),
	I32Store16(LoadOrStoreImm),
	I64Store8(LoadOrStoreImm),
	I64Store16(LoadOrStoreImm),
	I64Store32(LoadOrStoreImm),
	MemorySize(MemoryImm),
	MemoryGrow(MemoryImm),
	MemoryCopy(MemoryCopyImm),
	MemoryFill(MemoryImm),
	MemoryInit(DataSegmentAndMemImm),
	DataDrop(DataSegmentImm),

	// Numeric constants.
	I32Const(i32),
	I64Const(i64),
	F32Const(f32),
	F64Const(f64),

	// i32 comparisons.
	I32Eqz,
	I32Eq,
	I32Ne,
	I32LtS,
	I32LtU,
	I32GtS,
	I32GtU,
	I32LeS,
	I32LeU,
	I32GeS,
	I32GeU,

	// i64 comparisons.
	I64Eqz,
	I64Eq,
	I64Ne,
	I64LtS,
	I64LtU,
	I64GtS,
	I64GtU,
	I64LeS,
	I64LeU,
	I64GeS,
	I64GeU,

	// f32 comparisons.
	F32Eq,
	F32Ne,
	F32Lt,
	F32Gt,
	F32Le,
	F32Ge,

	// f64 comparisons.
	F64Eq,
	F64Ne,
	F64Lt,
	F64Gt,
	F64Le,
	F64Ge,

	// i32 arithmetic.
	I32Clz,
	I32Ctz,
	I32Popcnt,
	I32Add,
	I32Sub,
	I32Mul,
	I32DivS,
	I32DivU,
	I32RemS,
	I32RemU,
	I32And,
	I32Or,
	I32Xor,
	I32Shl,
	I32ShrS,
	I32ShrU,
	I32Rotl,
	I32Rotr,

	// i64 arithmetic.
	I64Clz,
	I64Ctz,
	I64Popcnt,
	I64Add,
	I64Sub,
	I64Mul,
	I64DivS,
	I64DivU,
	I64RemS,
	I64RemU,
	I64And,
	I64Or,
	I64Xor,
	I64Shl,
	I64ShrS,
	I64ShrU,
	I64Rotl,
	I64Rotr,

	// f32 arithmetic.
	F32Abs,
	F32Neg,
	F32Ceil,
	F32Floor,
	F32Trunc,
	F32Nearest,
	F32Sqrt,
	F32Add,
	F32Sub,
	F32Mul,
	F32Div,
	F32Min,
	F32Max,
	F32Copysign,

	// f64 arithmetic.
	F64Abs,
	F64Neg,
	F64Ceil,
	F64Floor,
	F64Trunc,
	F64Nearest,
	F64Sqrt,
	F64Add,
	F64Sub,
	F64Mul,
	F64Div,
	F64Min,
	F64Max,
	F64Copysign,

	// Conversions.
	I32WrapI64,
	I32TruncF32S,
	I32TruncF32U,
	I32TruncF64S,
	I32TruncF64U,
	I64ExtendI32S,
	I64ExtendI32U,
	I64TruncF32S,
	I64TruncF32U,
	I64TruncF64S,
	I64TruncF64U,
	F32ConvertI32S,
	F32ConvertI32U,
	F32ConvertI64S,
	F32ConvertI64U,
	F32DemoteF64,
	F64ConvertI32S,
	F64ConvertI32U,
	F64ConvertI64S,
	F64ConvertI64U,
	F64PromoteF32,
	I32ReinterpretF32,
	I64ReinterpretF64,
	F32ReinterpretI32,
	F64ReinterpretI64,

	// Sign extension.
	I32Extend8S,
	I32Extend16S,
	I64Extend8S,
	I64Extend16S,
	I64Extend32S,

	// Saturating truncation.
	I32TruncSatF32S,
	I32TruncSatF32U,
	I32TruncSatF64S,
	I32TruncSatF64U,
	I64TruncSatF32S,
	I64TruncSatF32U,
	I64TruncSatF64S,
	I64TruncSatF64U,

	// Atomics.
	AtomicNotify(LoadOrStoreImm),
	AtomicWait32(LoadOrStoreImm),
	AtomicWait64(LoadOrStoreImm),
	I32AtomicLoad(LoadOrStoreImm),
	I64AtomicLoad(LoadOrStoreImm),
	I32AtomicLoad8U(LoadOrStoreImm),
	I32AtomicLoad16U(LoadOrStoreImm),
	I64AtomicLoad8U(LoadOrStoreImm),
	I64AtomicLoad16U(LoadOrStoreImm),
	I64AtomicLoad32U(LoadOrStoreImm),
	I32AtomicStore(LoadOrStoreImm),
	I64AtomicStore(LoadOrStoreImm),
	I32AtomicStore8(LoadOrStoreImm),
	I32AtomicStore16(LoadOrStoreImm),
	I64AtomicStore8(LoadOrStoreImm),
	I64AtomicStore16(LoadOrStoreImm),
	I64AtomicStore32(LoadOrStoreImm),
	I32AtomicRmwAdd(LoadOrStoreImm),
	I64AtomicRmwAdd(LoadOrStoreImm),
	I32AtomicRmw8AddU(LoadOrStoreImm),
	I32AtomicRmw16AddU(LoadOrStoreImm),
	I64AtomicRmw8AddU(LoadOrStoreImm),
	I64AtomicRmw16AddU(LoadOrStoreImm),
	I64AtomicRmw32AddU(LoadOrStoreImm),
	I32AtomicRmwSub(LoadOrStoreImm),
	I64AtomicRmwSub(LoadOrStoreImm),
	I32AtomicRmw8SubU(LoadOrStoreImm),
	I32AtomicRmw16SubU(LoadOrStoreImm),
	I64AtomicRmw8SubU(LoadOrStoreImm),
	I64AtomicRmw16SubU(LoadOrStoreImm),
	I64AtomicRmw32SubU(LoadOrStoreImm),
	I32AtomicRmwAnd(LoadOrStoreImm),
	I64AtomicRmwAnd(LoadOrStoreImm),
	I32AtomicRmw8AndU(LoadOrStoreImm),
	I32AtomicRmw16AndU(LoadOrStoreImm),
	I64AtomicRmw8AndU(LoadOrStoreImm),
	I64AtomicRmw16AndU(LoadOrStoreImm),
	I64AtomicRmw32AndU(LoadOrStoreImm),
	I32AtomicRmwOr(LoadOrStoreImm),
	I64AtomicRmwOr(LoadOrStoreImm),
	I32AtomicRmw8OrU(LoadOrStoreImm),
	I32AtomicRmw16OrU(LoadOrStoreImm),
	I64AtomicRmw8OrU(LoadOrStoreImm),
	I64AtomicRmw16OrU(LoadOrStoreImm),
	I64AtomicRmw32OrU(LoadOrStoreImm),
	I32AtomicRmwXor(LoadOrStoreImm),
	I64AtomicRmwXor(LoadOrStoreImm),
	I32AtomicRmw8XorU(LoadOrStoreImm),
	I32AtomicRmw16XorU(LoadOrStoreImm),
	I64AtomicRmw8XorU(LoadOrStoreImm),
	I64AtomicRmw16XorU(LoadOrStoreImm),
	I64AtomicRmw32XorU(LoadOrStoreImm),
	I32AtomicRmwXchg(LoadOrStoreImm),
	I64AtomicRmwXchg(LoadOrStoreImm),
	I32AtomicRmw8XchgU(LoadOrStoreImm),
	I32AtomicRmw16XchgU(LoadOrStoreImm),
	I64AtomicRmw8XchgU(LoadOrStoreImm),
	I64AtomicRmw16XchgU(LoadOrStoreImm),
	I64AtomicRmw32XchgU(LoadOrStoreImm),
	I32AtomicRmwCmpxchg(LoadOrStoreImm),
	I64AtomicRmwCmpxchg(LoadOrStoreImm),
	I32AtomicRmw8CmpxchgU(LoadOrStoreImm),
	I32AtomicRmw16CmpxchgU(LoadOrStoreImm),
	I64AtomicRmw8CmpxchgU(LoadOrStoreImm),
	I64AtomicRmw16CmpxchgU(LoadOrStoreImm),
	I64AtomicRmw32CmpxchgU(LoadOrStoreImm),

	// SIMD.
	V128Load(LoadOrStoreImm),
	V128Store(LoadOrStoreImm),
	V128Const([u8; 16]),
	V8x16Shuffle(ShuffleImm),
	V8x16Swizzle,
	I8x16Splat,
	I16x8Splat,
	I32x4Splat,
	I64x2Splat,
	F32x4Splat,
	F64x2Splat,
	I8x16ExtractLaneS(LaneIndexImm),
	I8x16ExtractLaneU(LaneIndexImm),
	I8x16ReplaceLane(LaneIndexImm),
	I16x8ExtractLaneS(LaneIndexImm),
	I16x8ExtractLaneU(LaneIndexImm),
	I16x8ReplaceLane(LaneIndexImm),
	I32x4ExtractLane(LaneIndexImm),
	I32x4ReplaceLane(LaneIndexImm),
	I64x2ExtractLane(LaneIndexImm),
	I64x2ReplaceLane(LaneIndexImm),
	F32x4ExtractLane(LaneIndexImm),
	F32x4ReplaceLane(LaneIndexImm),
	F64x2ExtractLane(LaneIndexImm),
	F64x2ReplaceLane(LaneIndexImm),
	I8x16Eq,
	I8x16Ne,
	I8x16LtS,
	I8x16LtU,
	I8x16GtS,
	I8x16GtU,
	I8x16LeS,
	I8x16LeU,
	I8x16GeS,
	I8x16GeU,
	I16x8Eq,
	I16x8Ne,
	I16x8LtS,
	I16x8LtU,
	I16x8GtS,
	I16x8GtU,
	I16x8LeS,
	I16x8LeU,
	I16x8GeS,
	I16x8GeU,
	I32x4Eq,
	I32x4Ne,
	I32x4LtS,
	I32x4LtU,
	I32x4GtS,
	I32x4GtU,
	I32x4LeS,
	I32x4LeU,
	I32x4GeS,
	I32x4GeU,
	F32x4Eq,
	F32x4Ne,
	F32x4Lt,
	F32x4Gt,
	F32x4Le,
	F32x4Ge,
	F64x2Eq,
	F64x2Ne,
	F64x2Lt,
	F64x2Gt,
	F64x2Le,
	F64x2Ge,
	V128Not,
	V128And,
	V128AndNot,
	V128Or,
	V128Xor,
	V128Bitselect,
	I8x16Neg,
	I8x16AnyTrue,
	I8x16AllTrue,
	I8x16Shl,
	I8x16ShrS,
	I8x16ShrU,
	I8x16Add,
	I8x16AddSaturateS,
	I8x16AddSaturateU,
	I8x16Sub,
	I8x16SubSaturateS,
	I8x16SubSaturateU,
	I16x8Neg,
	I16x8AnyTrue,
	I16x8AllTrue,
	I16x8Shl,
	I16x8ShrS,
	I16x8ShrU,
	I16x8Add,
	I16x8AddSaturateS,
	I16x8AddSaturateU,
	I16x8Sub,
	I16x8SubSaturateS,
	I16x8SubSaturateU,
	I16x8Mul,
	I32x4Neg,
	I32x4AnyTrue,
	I32x4AllTrue,
	I32x4Shl,
	I32x4ShrS,
	I32x4ShrU,
	I32x4Add,
	I32x4Sub,
	I32x4Mul,
	I64x2Neg,
	I64x2Shl,
	I64x2ShrS,
	I64x2ShrU,
	I64x2Add,
	I64x2Sub,
	I64x2Mul,
	F32x4Abs,
	F32x4Neg,
	F32x4Sqrt,
	F32x4Add,
	F32x4Sub,
	F32x4Mul,
	F32x4Div,
	F32x4Min,
	F32x4Max,
	F64x2Abs,
	F64x2Neg,
	F64x2Sqrt,
	F64x2Add,
	F64x2Sub,
	F64x2Mul,
	F64x2Div,
	F64x2Min,
	F64x2Max,
	I32x4TruncSatF32x4S,
	I32x4TruncSatF32x4U,
	F32x4ConvertI32x4S,
	F32x4ConvertI32x4U,
}
