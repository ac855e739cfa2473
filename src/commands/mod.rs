//! CLI command implementations for mapcons.
//!
//! - [`consensus`] - Call consensus sequences from reads mapped against references

#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod consensus;
