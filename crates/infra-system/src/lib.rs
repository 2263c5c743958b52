// tierd Infrastructure - System Adapters
// Implements: CommandExecutor

pub mod shell_executor;

pub use shell_executor::ShellExecutor;
