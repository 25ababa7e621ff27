//! Visual theme and styling.

use console::Style;

/// Styles used for command output.
#[derive(Debug, Clone)]
pub struct StagehandTheme {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub dim: Style,
    pub highlight: Style,
    pub header: Style,
    /// Labels in key-value displays.
    pub key: Style,
}

impl Default for StagehandTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl StagehandTheme {
    /// Create the colored theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            key: Style::new().bold(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            key: Style::new(),
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{}", self.header.apply_to(format!("▸ {}", title)))
    }

    /// Format a `key: value` pair with the key padded to a fixed width.
    pub fn format_field(&self, key: &str, value: &str) -> String {
        format!(
            "  {} {}",
            self.key.apply_to(format!("{:<14}", format!("{}:", key))),
            value
        )
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
