//! Operator prompts: pick the resources to edit, then confirm the batch.

use crate::error::{KubeEditError, Result};
use crate::wizard::render::prompt_render_config;
use inquire::list_option::ListOption;
use inquire::validator::Validation;
use inquire::{Confirm, CustomUserError, InquireError, MultiSelect};

/// Number of candidates visible at once in the selection list
pub const SELECTION_PAGE_SIZE: usize = 15;

/// Result of the selection step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Indices into the candidate list, in list order; never empty
    Chosen(Vec<usize>),
    Cancelled,
}

/// Interactive collaborator consulted once for selection and once for
/// confirmation per run
pub trait Prompter {
    fn select(&self, message: &str, candidates: &[String]) -> Result<Selection>;

    /// `false` when the operator declines or aborts
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Terminal prompts backed by `inquire`
#[derive(Debug, Clone, Copy, Default)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn select(&self, message: &str, candidates: &[String]) -> Result<Selection> {
        let chosen = MultiSelect::new(message, candidates.to_vec())
            .with_render_config(prompt_render_config())
            .with_all_selected_by_default()
            .with_page_size(SELECTION_PAGE_SIZE)
            .with_help_message("Space to toggle, → all, ← none, Enter to confirm")
            .with_validator(|selected: &[ListOption<&String>]| -> std::result::Result<Validation, CustomUserError> {
                Ok(if selected.is_empty() {
                    Validation::Invalid("Select at least one resource".into())
                } else {
                    Validation::Valid
                })
            })
            .raw_prompt();

        match chosen {
            Ok(options) if !options.is_empty() => {
                Ok(Selection::Chosen(options.into_iter().map(|o| o.index).collect()))
            }
            Ok(_) => Ok(Selection::Cancelled),
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
                Ok(Selection::Cancelled)
            }
            Err(e) => Err(KubeEditError::Prompt(e.to_string())),
        }
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        match Confirm::new(message)
            .with_render_config(prompt_render_config())
            .with_default(true)
            .prompt()
        {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => Ok(false),
            Err(e) => Err(KubeEditError::Prompt(e.to_string())),
        }
    }
}
