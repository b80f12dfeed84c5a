//! Icons and glyph constants used throughout the UI.

// Spinner animation frames (braille characters)
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// Pull request state display strings (icon + text)
pub const STATE_OPEN_DISPLAY: &str = "● Open";
pub const STATE_MERGED_DISPLAY: &str = "✓ Merged";
pub const STATE_DECLINED_DISPLAY: &str = "✗ Declined";

// Approvals
pub const APPROVED: &str = "✓";
pub const NOT_APPROVED: &str = "○";

// Branch arrow
pub const BRANCH_ARROW: &str = "→";

// Selection indicator
pub const SELECTOR: &str = "▶ ";

// Cursor
pub const CURSOR: &str = "█";

// List/UI elements
pub const BULLET: &str = "•";
pub const SEPARATOR_CHAR: &str = "─";
