//! Inline style toggling for rich-text markup regions.
//!
//! A selection inside an editable [`markup`] region is wrapped in, or
//! unwrapped from, formatting elements by the [`toggle::ToggleEngine`]. The
//! [`editor::Editor`] hosts one region with a caret and selection, and the
//! terminal front end in `main.rs` drives it through a context [`menu`].

pub mod editor;
pub mod error;
pub mod markup;
pub mod menu;
pub mod option;
pub mod persist;
pub mod render;
pub mod selection;
pub mod theme;
pub mod toggle;

pub use editor::{Editor, EditorOptions};
pub use error::{PersistError, ToggleError};
pub use markup::{Markup, MarkupError, NodeId};
pub use option::{OptionChain, StyleOption, StyleRequest};
pub use selection::SelectionRange;
pub use toggle::{NoPrompt, TargetResolver, ToggleConfig, ToggleEngine, ToggleOutcome};
