//! Application wiring.
//!
//! Builds the knowledge base, embedder, completion client, history store and
//! chat controller from the settings, in one place for every front end.

use crate::chat::ChatController;
use crate::completion::{CompletionClient, CompletionService, OpenAICompletion};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::history::{self, HistoryStore};
use crate::identity::{ConfigRoleResolver, RoleResolver};
use crate::knowledge::{self, KnowledgeBase};
use std::sync::Arc;
use tracing::info;

/// Fully wired application.
pub struct App {
    settings: Settings,
    controller: ChatController,
}

impl App {
    /// Build the application from settings, opening the configured stores.
    pub async fn new(settings: Settings) -> Result<Self> {
        let knowledge_base = knowledge::open(&settings)?;
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let completion: Arc<dyn CompletionService> =
            Arc::new(OpenAICompletion::from_settings(&settings.completion)?);
        let history = history::open(&settings).await?;
        let roles: Arc<dyn RoleResolver> = Arc::new(ConfigRoleResolver::from_settings(&settings.identity));

        info!(
            "Using {} for completions, {} knowledge base, {} history",
            settings.completion.model, settings.knowledge_base.provider, settings.history.provider
        );

        Self::with_components(settings, knowledge_base, embedder, completion, history, roles)
    }

    /// Build the application around custom components.
    pub fn with_components(
        settings: Settings,
        knowledge_base: Arc<dyn KnowledgeBase>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionService>,
        history: Arc<dyn HistoryStore>,
        roles: Arc<dyn RoleResolver>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let client = CompletionClient::new(knowledge_base, embedder, completion)
            .with_prompts(prompts)
            .with_timeout(settings.completion_timeout());

        let controller = ChatController::new(Arc::new(client), history, roles);

        Ok(Self {
            settings,
            controller,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::SubmitOutcome;
    use crate::completion::testing::{insurance_kb, Behavior, FakeCompletion, KeywordEmbedder};
    use crate::history::MemoryHistoryStore;
    use crate::session::Session;

    #[tokio::test]
    async fn test_with_components_applies_prompt_variables() {
        let mut settings = Settings::default();
        settings
            .prompts
            .variables
            .insert("assistant_name".to_string(), "PolicyPal".to_string());

        let service = Arc::new(FakeCompletion::new(Behavior::Reply("Theft is covered.".to_string())));
        let app = App::with_components(
            settings,
            insurance_kb().await,
            Arc::new(KeywordEmbedder),
            service.clone(),
            Arc::new(MemoryHistoryStore::new()),
            Arc::new(ConfigRoleResolver::new(["admin"])),
        )
        .unwrap();

        let mut session = Session::new("alice");
        let outcome = app.controller().submit(&mut session, "Is theft covered?").await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Answered(_)));
        assert!(service.prompts.lock().unwrap()[0].contains("named PolicyPal"));
        assert_eq!(app.controller().history_count().await.unwrap(), 1);
    }
}
