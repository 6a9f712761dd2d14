//! CLI command implementations for flowkit.
//!
//! This module contains all the command implementations for the flowkit CLI
//! tool. Each submodule implements a specific command.
//!
//! - [`sort`] - Sort flow files with the external merge-sort engine
//! - [`view`] - Dump a flow file as text

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod command;
pub mod sort;
pub mod view;
