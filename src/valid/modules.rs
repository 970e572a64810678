use crate::{
	structure::{
		modules::{Elem, ExternKind, Module},
		types::{is_subtype, FunctionType, ValueType},
	},
	valid::{
		instructions::CodeValidationStream,
		types::{
			validate_function_type, validate_global_index, validate_global_type, validate_initializer,
			validate_memory_type, validate_table_type, validate_type_tuple,
		},
		validate_index, Result, ValidationError,
	},
};
use hashbrown::HashSet;

/// Validates the params and results of every entry in the type section. The
/// return value limit is not enforced here: entries double as block types,
/// and the limit applies only where an entry is used as a function signature.
pub fn validate_types(module: &Module) -> Result<()> {
	for function_type in &module.types {
		validate_type_tuple(&module.feature_spec, &function_type.params)?;
		validate_type_tuple(&module.feature_spec, &function_type.results)?;

		if function_type.results.len() > 1 && !module.feature_spec.multiple_results_and_block_params {
			return Err(ValidationError::new(
				"function/block has multiple return values, but \"multivalue\" extension is disabled",
			));
		}
	}
	Ok(())
}

pub fn validate_imports(module: &Module) -> Result<()> {
	for function_import in &module.functions.imports {
		validate_function_type(module, &function_import.typ)?;
	}
	for table_import in &module.tables.imports {
		validate_table_type(&module.feature_spec, &table_import.typ)?;
	}
	for memory_import in &module.memories.imports {
		validate_memory_type(&module.feature_spec, &memory_import.typ)?;
	}
	for global_import in &module.globals.imports {
		validate_global_type(&module.feature_spec, &global_import.typ)?;
		if global_import.typ.is_mutable && !module.feature_spec.import_export_mutable_globals {
			return Err(ValidationError::new("mutable globals cannot be imported"));
		}
	}
	for exception_type_import in &module.exception_types.imports {
		validate_type_tuple(&module.feature_spec, &exception_type_import.typ.params)?;
	}

	validate_table_count(module)?;
	validate_memory_count(module)
}

pub fn validate_function_declarations(module: &Module) -> Result<()> {
	for function_def in &module.functions.defs {
		validate_function_type(module, &function_def.typ)?;
	}
	Ok(())
}

pub fn validate_table_defs(module: &Module) -> Result<()> {
	for table_def in &module.tables.defs {
		validate_table_type(&module.feature_spec, &table_def.typ)?;
	}
	validate_table_count(module)
}

pub fn validate_memory_defs(module: &Module) -> Result<()> {
	for memory_def in &module.memories.defs {
		validate_memory_type(&module.feature_spec, &memory_def.typ)?;
	}
	validate_memory_count(module)
}

pub fn validate_global_defs(module: &Module) -> Result<()> {
	for global_def in &module.globals.defs {
		validate_global_type(&module.feature_spec, &global_def.typ)?;
		validate_initializer(
			module,
			&global_def.initializer,
			global_def.typ.value_type,
			"global initializer expression",
		)?;
	}
	Ok(())
}

pub fn validate_exception_type_defs(module: &Module) -> Result<()> {
	for exception_type_def in &module.exception_types.defs {
		validate_type_tuple(&module.feature_spec, &exception_type_def.typ.params)?;
	}
	Ok(())
}

pub fn validate_exports(module: &Module) -> Result<()> {
	let mut export_names = HashSet::new();
	for export in &module.exports {
		match export.kind {
			ExternKind::Function => {
				validate_index("exported function index", export.index, module.functions.size())?
			}
			ExternKind::Table => validate_index("exported table index", export.index, module.tables.size())?,
			ExternKind::Memory => {
				validate_index("exported memory index", export.index, module.memories.size())?
			}
			ExternKind::Global => {
				validate_global_index(
					module,
					export.index,
					false,
					!module.feature_spec.import_export_mutable_globals,
					false,
					"exported global index",
				)?;
			}
			ExternKind::ExceptionType => {
				validate_index("exported exception type index", export.index, module.exception_types.size())?
			}
			ExternKind::Invalid => return Err(ValidationError::new("unknown export kind")),
		}

		if !export_names.insert(export.name.as_str()) {
			return Err(ValidationError::new(format!("duplicate export: {}", export.name)));
		}
	}
	Ok(())
}

pub fn validate_start_function(module: &Module) -> Result<()> {
	if let Some(start_function_index) = module.start_function_index {
		validate_index("start function index", start_function_index, module.functions.size())?;
		let indexed = module.functions.get_type(start_function_index);
		validate_index("function type index", indexed.index, module.types.len())?;
		if module.types[indexed.index] != FunctionType::default() {
			return Err(ValidationError::new("start function must not have any parameters or results"));
		}
	}
	Ok(())
}

pub fn validate_elem_segments(module: &Module) -> Result<()> {
	for elem_segment in &module.elem_segments {
		if elem_segment.is_active {
			validate_index("elem segment table index", elem_segment.table_index, module.tables.size())?;
			let table_type = module.tables.get_type(elem_segment.table_index);
			if !is_subtype(ValueType::FuncRef, table_type.element_type.as_value_type()) {
				return Err(ValidationError::new("active elem segments must be in funcref tables"));
			}
			validate_initializer(
				module,
				&elem_segment.base_offset,
				ValueType::I32,
				"elem segment base initializer",
			)?;
		}
		for elem in &elem_segment.elems {
			match elem {
				Elem::RefNull => {
					if elem_segment.is_active {
						return Err(ValidationError::new("ref.null is only allowed in passive segments"));
					}
				}
				Elem::RefFunc(function_index) => {
					validate_index("elem function index", *function_index, module.functions.size())?
				}
			}
		}
	}
	Ok(())
}

pub fn validate_data_segments(module: &Module) -> Result<()> {
	for data_segment in &module.data_segments {
		if data_segment.is_active {
			validate_index("data segment memory index", data_segment.memory_index, module.memories.size())?;
			validate_initializer(
				module,
				&data_segment.base_offset,
				ValueType::I32,
				"data segment base initializer",
			)?;
		}
	}
	Ok(())
}

/// Type-checks every function body against its declared signature.
pub fn validate_function_defs(module: &Module) -> Result<()> {
	for (index, function_def) in module.functions.defs.iter().enumerate() {
		trace!("validating function body {}", index);
		let mut stream = CodeValidationStream::new(module, function_def)?;
		for operator in &function_def.code {
			stream.op(operator)?;
		}
		stream.finish()?;
	}
	Ok(())
}

// The counts are capped regardless of which section grew them, so both the
// import pass and the def passes re-check.

fn validate_table_count(module: &Module) -> Result<()> {
	if !module.feature_spec.reference_types && module.tables.size() > 1 {
		return Err(ValidationError::new("too many tables"));
	}
	Ok(())
}

fn validate_memory_count(module: &Module) -> Result<()> {
	if module.memories.size() > 1 {
		return Err(ValidationError::new("too many memories"));
	}
	Ok(())
}
