pub mod conversation;
pub mod header;
pub mod popups;
pub mod search;

pub use conversation::{conversation_lines, render_conversation};
pub use header::render_header;
pub use popups::{
    centered_rect, render_approvals_popup, render_comment_popup, render_confirm_popup,
    render_error_popup, render_help_popup, render_legend, render_menu_popup, truncate_string,
    wrap_text,
};
pub use search::render_search_bar;
