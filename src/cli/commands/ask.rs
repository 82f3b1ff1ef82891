//! Ask command implementation.

use crate::app::App;
use crate::chat::SubmitOutcome;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::identity::user_name_from_env;
use crate::session::Session;
use anyhow::Result;

/// Answer one question in a fresh session. The exchange is saved to history.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let app = App::new(settings).await?;
    let mut session = Session::new(user_name_from_env(&app.settings().identity));

    let spinner = Output::spinner("Searching knowledge base...");
    let result = app.controller().submit(&mut session, question).await;
    spinner.finish_and_clear();

    match result {
        Ok(SubmitOutcome::Answered(turn)) => {
            println!("\n{}\n", turn.answer);
        }
        Ok(SubmitOutcome::Skipped) => {
            Output::warning("The question is empty.");
        }
        Err(e) => {
            Output::submit_error(&e);
            return Err(e.into());
        }
    }

    Ok(())
}
