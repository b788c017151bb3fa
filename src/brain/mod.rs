//! Decision making: trigger routing, prompt assembly, and response
//! presentation.

mod executor;
mod prompt;
mod router;

pub use executor::{classify_response, Presenter, Response, ResponseKind};
pub use prompt::{build_creative_prompt, build_prompt, build_question_prompt, build_reminder_prompt, optimize_prompt_length};
pub use router::{priority, should_interrupt, IntentKind, Priority, Router, Trigger};
