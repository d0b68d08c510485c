pub mod snippet;
pub mod stack;
pub mod traits;

pub use snippet::{FsSnippetReader, StaticSnippetReader};
pub use stack::{TextTraceExtractor, frames_from_panic, parse_stack_trace};
pub use traits::{FrameExtractor, SnippetReader};
