//! Line-editor prompt

use std::borrow::Cow;

use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};
use stepwise_core::{Address, ProcessId};

/// Prompt showing the target pid and where it is stopped
///
/// Renders as `stepwise[4242 @ 0x0000000000401000]> `, or without the
/// location once the target is no longer stopped somewhere.
#[derive(Debug, Clone, Copy)]
pub struct StepwisePrompt
{
    pid: ProcessId,
    location: Option<Address>,
}

impl StepwisePrompt
{
    /// Prompt for the given target.
    #[must_use]
    pub fn new(pid: ProcessId) -> Self
    {
        Self { pid, location: None }
    }

    /// Update the stop location shown in the prompt.
    pub fn set_location(&mut self, location: Option<Address>)
    {
        self.location = location;
    }
}

impl Prompt for StepwisePrompt
{
    fn render_prompt_left(&self) -> Cow<'_, str>
    {
        match self.location {
            Some(at) => Cow::Owned(format!("stepwise[{} @ {at}]", self.pid.0)),
            None => Cow::Owned(format!("stepwise[{}]", self.pid.0)),
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str>
    {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str>
    {
        Cow::Borrowed("> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str>
    {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(&self, history_search: PromptHistorySearch) -> Cow<'_, str>
    {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "(failed) ",
        };
        Cow::Owned(format!("(search: {prefix}{}) ", history_search.term))
    }
}
