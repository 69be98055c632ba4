pub mod edit;
pub mod markup;
pub mod model;
pub mod sanitize;

pub use markup::{parse_fragment, parse_html, render_html};
pub use model::{Block, BlockKind, BlockPath, ContentTree, Marks, Projection, Segment, Span};

#[cfg(test)]
mod tests;
