//! Terminal output for the command-line front end.
//!
//! - [`UserInterface`] trait so commands can be tested without a terminal
//! - [`TerminalUI`] writing styled lines to stdout
//! - [`MockUI`] capturing output for assertions
//!
//! # Example
//!
//! ```
//! use stagehand::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.show_header("Runs");
//! ui.success("Cleared 3 records");
//! assert!(ui.has_success("Cleared"));
//! ```

pub mod mock;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use terminal::TerminalUI;
pub use theme::{should_use_colors, StagehandTheme};

/// Output surface used by commands.
pub trait UserInterface {
    /// Plain line.
    fn message(&mut self, msg: &str);

    fn success(&mut self, msg: &str);

    fn warning(&mut self, msg: &str);

    fn error(&mut self, msg: &str);

    /// Section header.
    fn show_header(&mut self, title: &str);

    /// Aligned `key: value` line.
    fn show_field(&mut self, key: &str, value: &str);
}
