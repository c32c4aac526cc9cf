pub mod prompt;
pub mod shell;
