// Parser module for wait_for conditionals and task files

pub mod ast;
pub mod conditional;
pub mod task_file;

pub use ast::*;
pub use conditional::{parse_conditional, parse_conditionals};
pub use task_file::{parse_task_file, parse_task_str, ConnectionSettings, TaskFile, TaskParams};
