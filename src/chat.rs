//! Chat controller.
//!
//! Drives one submitted question through completion, the session transcript
//! and the history store, and serves the "new chat" and "view history"
//! commands. The controller holds no per-session state; callers pass the
//! [`Session`] they own.

use crate::completion::Answerer;
use crate::error::{PeonError, Result};
use crate::history::{HistoryRecord, HistoryRow, HistoryScope, HistoryStore};
use crate::identity::{resolve_identity, Identity, RoleResolver};
use crate::session::{Session, Turn};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};

/// What happened to a submitted question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The question was blank. Nothing was sent or stored.
    Skipped,
    /// The question was answered, added to the transcript and saved.
    Answered(Turn),
}

/// A submitted question that did not complete normally.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Retrieval or completion failed. The turn was discarded and nothing was saved.
    #[error("Could not answer the question: {0}")]
    Completion(#[source] PeonError),

    /// The answer is in the transcript but could not be written to history.
    #[error("The answer was not saved to history: {source}")]
    NotSaved {
        turn: Turn,
        #[source]
        source: PeonError,
    },
}

/// Result of a history view, already filtered for the caller's role.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub identity: Identity,
    pub rows: Vec<HistoryRow>,
}

/// Read the history rows a user may see.
pub async fn view_history(
    history: &dyn HistoryStore,
    roles: &dyn RoleResolver,
    user_name: &str,
) -> Result<HistoryView> {
    let identity = resolve_identity(roles, user_name).await;
    let scope = HistoryScope::for_identity(&identity);
    let rows = history.query(&scope).await?;

    Ok(HistoryView { identity, rows })
}

/// Orchestrates submit, new chat and history views.
#[derive(Clone)]
pub struct ChatController {
    answerer: Arc<dyn Answerer>,
    history: Arc<dyn HistoryStore>,
    roles: Arc<dyn RoleResolver>,
}

impl ChatController {
    pub fn new(
        answerer: Arc<dyn Answerer>,
        history: Arc<dyn HistoryStore>,
        roles: Arc<dyn RoleResolver>,
    ) -> Self {
        Self {
            answerer,
            history,
            roles,
        }
    }

    /// Answer a question within a session.
    ///
    /// A blank question is a no-op. On success exactly one turn is appended to
    /// the session and exactly one record to the history store.
    #[instrument(skip(self, session, question), fields(session_id = %session.session_id()))]
    pub async fn submit(
        &self,
        session: &mut Session,
        question: &str,
    ) -> std::result::Result<SubmitOutcome, SubmitError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(SubmitOutcome::Skipped);
        }

        let answer = self.answerer.answer(question).await.map_err(|e| {
            error!("Completion failed: {}", e);
            SubmitError::Completion(e)
        })?;

        let turn = Turn {
            question: question.to_string(),
            answer: answer.text,
            timestamp: Utc::now(),
        };
        session.push(turn.clone());

        let record = HistoryRecord {
            session_id: session.session_id().to_string(),
            user_name: session.user_name().to_string(),
            question: turn.question.clone(),
            answer: turn.answer.clone(),
            timestamp: turn.timestamp,
        };

        if let Err(e) = self.history.append(&record).await {
            error!("History write failed: {}", e);
            return Err(SubmitError::NotSaved { turn, source: e });
        }

        info!("Answered turn {} of session", session.turns().len());
        Ok(SubmitOutcome::Answered(turn))
    }

    /// Clear the session transcript. History is untouched.
    pub fn new_chat(&self, session: &mut Session) {
        session.clear();
        info!("Started a new chat in session {}", session.session_id());
    }

    /// Read history for a user. The role is resolved on every call.
    #[instrument(skip(self))]
    pub async fn view_history(&self, user_name: &str) -> Result<HistoryView> {
        view_history(self.history.as_ref(), self.roles.as_ref(), user_name).await
    }

    /// Number of stored history records.
    pub async fn history_count(&self) -> Result<usize> {
        self.history.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::{client_with, Behavior, FakeCompletion};
    use crate::history::testing::ReadOnlyHistory;
    use crate::history::MemoryHistoryStore;
    use crate::identity::{ConfigRoleResolver, Role};

    const ANSWER: &str = "Private car cover includes own damage, theft and third party liability.";

    async fn controller(behavior: Behavior) -> (ChatController, Arc<MemoryHistoryStore>, Arc<FakeCompletion>) {
        let service = Arc::new(FakeCompletion::new(behavior));
        let history = Arc::new(MemoryHistoryStore::new());
        let controller = ChatController::new(
            Arc::new(client_with(service.clone()).await),
            history.clone(),
            Arc::new(ConfigRoleResolver::new(["admin"])),
        );
        (controller, history, service)
    }

    #[tokio::test]
    async fn test_submit_records_one_turn_and_one_row() {
        let (controller, history, service) = controller(Behavior::Reply(ANSWER.to_string())).await;
        let mut session = Session::new("alice");

        let outcome = controller
            .submit(&mut session, "What is covered under private car insurance?")
            .await
            .unwrap();

        let turn = match outcome {
            SubmitOutcome::Answered(turn) => turn,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(turn.answer, ANSWER);
        assert_eq!(session.turns(), &[turn.clone()]);
        assert_eq!(service.calls(), 1);
        assert!(service.prompts.lock().unwrap()[0].contains("Private car cover includes"));

        assert_eq!(history.count().await.unwrap(), 1);
        let rows = history.query(&HistoryScope::All).await.unwrap();
        assert_eq!(rows[0].session_id.as_deref(), Some(session.session_id()));
        assert_eq!(rows[0].user_name, "alice");
        assert_eq!(rows[0].question, "What is covered under private car insurance?");
        assert_eq!(rows[0].answer, turn.answer);
        assert_eq!(rows[0].timestamp, turn.timestamp);
    }

    #[tokio::test]
    async fn test_empty_question_is_a_no_op() {
        let (controller, history, service) = controller(Behavior::Reply(ANSWER.to_string())).await;
        let mut session = Session::new("alice");

        assert_eq!(controller.submit(&mut session, "").await.unwrap(), SubmitOutcome::Skipped);
        assert_eq!(controller.submit(&mut session, " \t\n").await.unwrap(), SubmitOutcome::Skipped);

        assert!(session.is_empty());
        assert_eq!(history.count().await.unwrap(), 0);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_completion_failure_discards_turn() {
        let (controller, history, _) = controller(Behavior::Fail).await;
        let mut session = Session::new("alice");

        let err = controller.submit(&mut session, "How do I claim?").await.unwrap_err();
        assert!(matches!(err, SubmitError::Completion(PeonError::Completion(_))));
        assert!(session.is_empty());
        assert_eq!(history.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_failure_is_reported_separately() {
        let service = Arc::new(FakeCompletion::new(Behavior::Reply(ANSWER.to_string())));
        let controller = ChatController::new(
            Arc::new(client_with(service).await),
            Arc::new(ReadOnlyHistory(MemoryHistoryStore::new())),
            Arc::new(ConfigRoleResolver::new(Vec::<String>::new())),
        );
        let mut session = Session::new("alice");

        match controller.submit(&mut session, "What is covered?").await {
            Err(SubmitError::NotSaved { turn, source }) => {
                assert_eq!(turn.answer, ANSWER);
                assert!(matches!(source, PeonError::History(_)));
            }
            other => panic!("expected NotSaved, got {:?}", other),
        }
        assert_eq!(session.turns().len(), 1);
    }

    #[tokio::test]
    async fn test_new_chat_keeps_history() {
        let (controller, history, _) = controller(Behavior::Reply(ANSWER.to_string())).await;
        let mut session = Session::new("alice");

        controller.submit(&mut session, "What is covered?").await.unwrap();
        controller.submit(&mut session, "Is theft covered?").await.unwrap();
        assert_eq!(session.turns().len(), 2);

        controller.new_chat(&mut session);
        controller.new_chat(&mut session);

        assert!(session.is_empty());
        assert_eq!(history.count().await.unwrap(), 2);
        assert_eq!(controller.history_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_view_history_by_role() {
        let (controller, _, _) = controller(Behavior::Reply(ANSWER.to_string())).await;

        let mut alice = Session::new("alice");
        let mut bob = Session::new("bob");
        controller.submit(&mut alice, "What is covered?").await.unwrap();
        controller.submit(&mut bob, "How do I claim?").await.unwrap();
        controller.submit(&mut alice, "Is theft covered?").await.unwrap();

        let own = controller.view_history("alice").await.unwrap();
        assert_eq!(own.identity.role, Role::Standard);
        assert_eq!(own.rows.len(), 2);
        assert!(own.rows.iter().all(|r| r.user_name == "alice" && r.session_id.is_none()));
        assert_eq!(own.rows[1].question, "Is theft covered?");

        let admin = controller.view_history("admin").await.unwrap();
        assert_eq!(admin.identity.role, Role::Admin);
        assert_eq!(admin.rows.len(), 3);
        assert_eq!(admin.rows[1].session_id.as_deref(), Some(bob.session_id()));

        let stranger = controller.view_history("carol").await.unwrap();
        assert!(stranger.rows.is_empty());
    }
}
