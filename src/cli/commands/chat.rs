//! Interactive chat command.

use crate::app::App;
use crate::chat::{SubmitError, SubmitOutcome};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::identity::user_name_from_env;
use crate::render;
use crate::session::Session;
use console::{style, Term};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Question(&'a str),
    NewChat,
    History,
    Exit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "/new" => Input::NewChat,
        "/history" => Input::History,
        "/exit" | "/quit" => Input::Exit,
        cmd if cmd.starts_with('/') => Input::Unknown(cmd),
        question => Input::Question(question),
    }
}

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let app = App::new(settings).await?;
    let controller = app.controller();
    let mut session = Session::new(user_name_from_env(&app.settings().identity));
    let term = Term::stdout();

    println!("\n{}", render::banner(&app.settings().presentation));
    println!(
        "{}\n",
        style("Ask about your policy documents. /new starts a new chat, /history shows past chats, /exit quits.").dim()
    );
    debug!("Session {} for {}", session.session_id(), session.user_name());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        match parse_input(&line) {
            Input::Exit => {
                Output::info("Goodbye!");
                break;
            }
            Input::NewChat => {
                controller.new_chat(&mut session);
                if term.is_term() {
                    term.clear_screen()?;
                    println!("{}\n", render::banner(&app.settings().presentation));
                }
                Output::info("Started a new chat.");
            }
            Input::History => match controller.view_history(session.user_name()).await {
                Ok(view) => println!("\n{}\n", render::history_table(&view)),
                Err(e) => Output::error(&format!("Could not read history: {}", e)),
            },
            Input::Unknown(cmd) => {
                Output::warning(&format!("Unknown command {}. Try /new, /history or /exit.", cmd));
            }
            Input::Question(question) => {
                let spinner = Output::spinner("Thinking...");
                let result = controller.submit(&mut session, question).await;
                spinner.finish_and_clear();

                match result {
                    Ok(SubmitOutcome::Skipped) => {}
                    Ok(SubmitOutcome::Answered(_)) => {
                        show_transcript(&term, &app, &session)?;
                    }
                    Err(SubmitError::NotSaved { source, .. }) => {
                        show_transcript(&term, &app, &session)?;
                        Output::warning(&format!("This answer was not saved to history: {}", source));
                    }
                    Err(e) => Output::submit_error(&e),
                }
            }
        }
    }

    Ok(())
}

/// Redraw the banner and transcript on a terminal, or print the latest turn otherwise.
fn show_transcript(term: &Term, app: &App, session: &Session) -> io::Result<()> {
    if term.is_term() {
        term.clear_screen()?;
        println!("{}\n", render::banner(&app.settings().presentation));
        println!(
            "{}\n",
            render::transcript(session.turns(), app.settings().chat.transcript_limit)
        );
    } else if let Some(turn) = session.turns().last() {
        println!("\n{}\n", render::turn(turn));
    }
    Ok(())
}
