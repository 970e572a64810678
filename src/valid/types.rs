use crate::{
	structure::{
		modules::{
			FeatureSpec, IndexedFunctionType, InitializerExpression, Module, MAX_MEMORY_PAGES,
			MAX_RETURN_VALUES, MAX_TABLE_ELEMS,
		},
		operators::IndexedBlockType,
		types::{
			is_subtype, FunctionType, GlobalType, MemoryType, ReferenceType, SizeConstraints, TableType,
			ValueType, UNBOUNDED,
		},
	},
	valid::{validate_index, Result, ValidationError},
};

pub fn validate_value_type(features: &FeatureSpec, typ: ValueType) -> Result<()> {
	let is_valid = match typ {
		ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64 => features.mvp,
		ValueType::V128 => features.simd,
		ValueType::AnyRef | ValueType::FuncRef => features.reference_types,
		ValueType::None | ValueType::Any | ValueType::NullRef => false,
	};
	if is_valid {
		Ok(())
	} else {
		Err(ValidationError::new(format!("invalid value type ({})", typ)))
	}
}

pub fn validate_reference_type(features: &FeatureSpec, typ: ReferenceType) -> Result<()> {
	let is_valid = match typ {
		ReferenceType::FuncRef => features.mvp,
		ReferenceType::AnyRef => features.reference_types,
		ReferenceType::None => false,
	};
	if is_valid {
		Ok(())
	} else {
		Err(ValidationError::new(format!("invalid reference type ({})", typ)))
	}
}

pub fn validate_type_tuple(features: &FeatureSpec, tuple: &[ValueType]) -> Result<()> {
	for typ in tuple {
		validate_value_type(features, *typ)?;
	}
	Ok(())
}

pub fn validate_size_constraints(size: &SizeConstraints, max_max: u64) -> Result<()> {
	let max = if size.max == UNBOUNDED { max_max } else { size.max };
	if size.min > max {
		return Err(ValidationError::new(format!("disjoint size bounds: {} > {}", size.min, max)));
	}
	if max > max_max {
		return Err(ValidationError::new(format!("maximum size exceeds limit: {} > {}", max, max_max)));
	}
	Ok(())
}

pub fn validate_table_type(features: &FeatureSpec, typ: &TableType) -> Result<()> {
	validate_reference_type(features, typ.element_type)?;
	validate_size_constraints(&typ.size, MAX_TABLE_ELEMS)?;
	if typ.is_shared {
		if !features.shared_tables {
			return Err(ValidationError::new("shared table requires shared tables feature"));
		}
		if typ.size.max == UNBOUNDED {
			return Err(ValidationError::new("shared tables must have a maximum size"));
		}
	}
	Ok(())
}

pub fn validate_memory_type(features: &FeatureSpec, typ: &MemoryType) -> Result<()> {
	validate_size_constraints(&typ.size, MAX_MEMORY_PAGES)?;
	if typ.is_shared {
		if !features.atomics {
			return Err(ValidationError::new("shared memory requires atomics feature"));
		}
		if typ.size.max == UNBOUNDED {
			return Err(ValidationError::new("shared memories must have a maximum size"));
		}
	}
	Ok(())
}

pub fn validate_global_type(features: &FeatureSpec, typ: &GlobalType) -> Result<()> {
	validate_value_type(features, typ.value_type)
}

/// Fails unless `actual` may be used where `expected` is demanded.
pub fn validate_subtype(actual: ValueType, expected: ValueType, context: &str) -> Result<()> {
	if is_subtype(actual, expected) {
		Ok(())
	} else {
		Err(ValidationError::new(format!(
			"type mismatch: expected {} but got {} in {}",
			expected, actual, context
		)))
	}
}

/// Bounds-checks a global index and enforces the mutability/origin rules the
/// referencing context demands. Returns the global's value type.
pub fn validate_global_index(
	module: &Module,
	global_index: usize,
	must_be_mutable: bool,
	must_be_immutable: bool,
	must_be_import: bool,
	context: &str,
) -> Result<ValueType> {
	validate_index(context, global_index, module.globals.size())?;
	let global_type = module.globals.get_type(global_index);
	if must_be_mutable && !global_type.is_mutable {
		return Err(ValidationError::new("attempting to mutate immutable global"));
	}
	if must_be_import && global_index >= module.globals.imports.len() {
		return Err(ValidationError::new(
			"global variable initializer expression may only access imported globals",
		));
	}
	if must_be_immutable && global_type.is_mutable {
		return Err(ValidationError::new(
			"global variable initializer expression may only access immutable globals",
		));
	}
	Ok(global_type.value_type)
}

/// Bounds-checks a function index and returns the function's signature.
pub fn validate_function_index(module: &Module, function_index: usize) -> Result<&FunctionType> {
	validate_index("function index", function_index, module.functions.size())?;
	let indexed = module.functions.get_type(function_index);
	validate_index("function type index", indexed.index, module.types.len())?;
	Ok(&module.types[indexed.index])
}

/// Resolves a type-section reference used as a function signature, enforcing
/// the return value limit that does not apply to block-type uses.
pub fn validate_function_type<'m>(module: &'m Module, typ: &IndexedFunctionType) -> Result<&'m FunctionType> {
	validate_index("function type index", typ.index, module.types.len())?;
	let function_type = &module.types[typ.index];
	if function_type.results.len() > MAX_RETURN_VALUES {
		return Err(ValidationError::new(format!(
			"function type has {} return values, but the limit is {}",
			function_type.results.len(),
			MAX_RETURN_VALUES
		)));
	}
	Ok(function_type)
}

/// Resolves a block signature to a function type.
pub fn validate_block_type(module: &Module, typ: &IndexedBlockType) -> Result<FunctionType> {
	match typ {
		IndexedBlockType::NoParametersOrResult => Ok(FunctionType::default()),
		IndexedBlockType::OneResult(result_type) => {
			validate_value_type(&module.feature_spec, *result_type)?;
			Ok(FunctionType::new(vec![], vec![*result_type]))
		}
		IndexedBlockType::FunctionType(index) => {
			validate_index("block type index", *index, module.types.len())?;
			let function_type = &module.types[*index];
			if !function_type.params.is_empty() && !module.feature_spec.multiple_results_and_block_params {
				return Err(ValidationError::new(
					"block has params, but \"multivalue\" extension is disabled",
				));
			}
			if function_type.results.len() > 1 && !module.feature_spec.multiple_results_and_block_params {
				return Err(ValidationError::new(
					"block has multiple results, but \"multivalue\" extension is disabled",
				));
			}
			Ok(function_type.clone())
		}
	}
}

/// Checks a constant expression against the type its context demands.
/// Initializers may read only imported, immutable globals.
pub fn validate_initializer(
	module: &Module,
	expression: &InitializerExpression,
	expected_type: ValueType,
	context: &str,
) -> Result<()> {
	match expression {
		InitializerExpression::I32Const(_) => validate_subtype(ValueType::I32, expected_type, context),
		InitializerExpression::I64Const(_) => validate_subtype(ValueType::I64, expected_type, context),
		InitializerExpression::F32Const(_) => validate_subtype(ValueType::F32, expected_type, context),
		InitializerExpression::F64Const(_) => validate_subtype(ValueType::F64, expected_type, context),
		InitializerExpression::V128Const(_) => validate_subtype(ValueType::V128, expected_type, context),
		InitializerExpression::GlobalGet(global_index) => {
			let global_value_type = validate_global_index(
				module,
				*global_index,
				false,
				true,
				true,
				"initializer expression global index",
			)?;
			validate_subtype(global_value_type, expected_type, context)
		}
		InitializerExpression::RefNull => validate_subtype(ValueType::NullRef, expected_type, context),
		InitializerExpression::RefFunc(function_index) => {
			validate_function_index(module, *function_index)?;
			validate_subtype(ValueType::FuncRef, expected_type, context)
		}
		InitializerExpression::Invalid => Err(ValidationError::new("invalid initializer expression")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::structure::types::ReferenceType;

	#[test]
	fn size_constraint_bounds() {
		validate_size_constraints(&SizeConstraints { min: 4, max: 4 }, 100).unwrap();
		validate_size_constraints(&SizeConstraints { min: 5, max: 4 }, 100).unwrap_err();
		validate_size_constraints(&SizeConstraints { min: 0, max: UNBOUNDED }, 100).unwrap();
		let err = validate_size_constraints(&SizeConstraints { min: 0, max: 101 }, 100).unwrap_err();
		assert!(err.reason.contains("maximum size exceeds limit"));
	}

	#[test]
	fn value_types_gated_by_features() {
		let mvp = FeatureSpec::default();
		validate_value_type(&mvp, ValueType::I32).unwrap();
		validate_value_type(&mvp, ValueType::V128).unwrap_err();
		validate_value_type(&mvp, ValueType::FuncRef).unwrap_err();

		let all = FeatureSpec::all();
		validate_value_type(&all, ValueType::V128).unwrap();
		validate_value_type(&all, ValueType::AnyRef).unwrap();

		// The validation-time synthetics are never interface types.
		validate_value_type(&all, ValueType::Any).unwrap_err();
		validate_value_type(&all, ValueType::None).unwrap_err();
		validate_value_type(&all, ValueType::NullRef).unwrap_err();
	}

	#[test]
	fn shared_memory_needs_finite_max() {
		let all = FeatureSpec::all();
		let unbounded = MemoryType { is_shared: true, size: SizeConstraints { min: 1, max: UNBOUNDED } };
		let err = validate_memory_type(&all, &unbounded).unwrap_err();
		assert!(err.reason.contains("must have a maximum size"));

		let bounded = MemoryType { is_shared: true, size: SizeConstraints { min: 1, max: 4 } };
		validate_memory_type(&all, &bounded).unwrap();

		let err = validate_memory_type(&FeatureSpec::default(), &bounded).unwrap_err();
		assert!(err.reason.contains("requires atomics feature"));
	}

	#[test]
	fn shared_table_needs_feature_and_max() {
		let mut features = FeatureSpec::all();
		let table = TableType {
			element_type: ReferenceType::FuncRef,
			is_shared: true,
			size: SizeConstraints { min: 0, max: UNBOUNDED },
		};
		let err = validate_table_type(&features, &table).unwrap_err();
		assert!(err.reason.contains("must have a maximum size"));

		features.shared_tables = false;
		let err = validate_table_type(&features, &table).unwrap_err();
		assert!(err.reason.contains("requires shared tables feature"));
	}
}
