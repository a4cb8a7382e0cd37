//! Copy and paste of diagram selections.
//!
//! Copying runs in two steps. The [`TreeBuilder`] normalizes a selection into
//! descriptors grouped by containment depth, refusing the whole copy when
//! a rule denies one of the selected elements. [`ClipboardContents`] then
//! snapshots the descriptors together with every semantic object a paste
//! will need, so the clipboard stays valid whatever happens to the originals.
//!
//! Pasting is the `elements.paste` command. It clones the business objects
//! through the [`ModelCloner`](crate::clone::ModelCloner), recreates shapes,
//! connections and labels around the drop point and finally rewires the
//! references that only make sense between copies. Everything happens in one
//! transaction, so a paste is undone and redone as a whole.

mod clipboard;
mod paste;
mod rewrite;
mod tree;

pub use clipboard::ClipboardContents;
pub(crate) use paste::PasteHandler;
pub use rewrite::register_resolvers;
pub use tree::{Descriptor, TreeBuilder};
