//! Text rendering utilities: markdown replies, wrapping and display width.

mod markdown;
pub mod width;
mod wrap;

pub use markdown::{render_markdown, MarkdownStyles};
pub use width::{truncate_to_width, visual_width};
pub use wrap::{wrap_lines, wrap_text};
