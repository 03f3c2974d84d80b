// Database models - Re-exports all domain-specific models
//
// - notebook.rs: Notebooks and their theme colours
// - recording.rs: Captured recordings and their analysis

mod notebook;
mod recording;

pub use notebook::{Notebook, NOTEBOOK_COLORS};
pub use recording::Recording;
