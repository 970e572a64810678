#![no_std]

#[macro_use]
extern crate alloc;
#[macro_use]
extern crate log;

pub mod structure;
pub mod valid;

pub use valid::{module_validate, CodeValidationStream, Result, ValidationError};
