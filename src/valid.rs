pub mod instructions;
pub mod modules;
pub mod types;

use crate::structure::modules::Module;
use alloc::string::String;
use core::fmt::{self, Display, Formatter};

pub use instructions::CodeValidationStream;
pub use modules::{
	validate_data_segments, validate_elem_segments, validate_exception_type_defs, validate_exports,
	validate_function_declarations, validate_function_defs, validate_global_defs, validate_imports,
	validate_memory_defs, validate_start_function, validate_table_defs, validate_types,
};

/// Why a module was rejected. The reason is human-readable; its leading
/// phrase is stable enough to match against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
	pub reason: String,
}

impl ValidationError {
	pub fn new<S: Into<String>>(reason: S) -> Self {
		ValidationError { reason: reason.into() }
	}
}

impl Display for ValidationError {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.write_str(&self.reason)
	}
}

pub type Result<T> = core::result::Result<T, ValidationError>;

pub(crate) fn validate_index(name: &str, index: usize, bound: usize) -> Result<()> {
	if index >= bound {
		Err(ValidationError::new(format!(
			"invalid index: {} must be less than {} ({} = {})",
			name, bound, name, index
		)))
	} else {
		Ok(())
	}
}

/// Validates every section of `module`, then every function body. Stops at
/// the first offending item.
pub fn module_validate(module: &Module) -> Result<()> {
	info!("validating wasm module...");
	validate_types(module)?;
	validate_imports(module)?;
	validate_function_declarations(module)?;
	validate_table_defs(module)?;
	validate_memory_defs(module)?;
	validate_global_defs(module)?;
	validate_exception_type_defs(module)?;
	validate_exports(module)?;
	validate_start_function(module)?;
	validate_elem_segments(module)?;
	validate_data_segments(module)?;
	validate_function_defs(module)?;
	Ok(())
}
