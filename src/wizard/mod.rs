//! Interactive selection and confirmation

pub mod prompter;
pub mod render;

pub use prompter::{InquirePrompter, Prompter, SELECTION_PAGE_SIZE, Selection};
pub use render::{counted, outcome_mark, print_step_banner, prompt_render_config, step_banner};
