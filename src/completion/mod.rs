//! Retrieval-augmented completion.
//!
//! Grounds each question in the single closest knowledge base chunk and asks
//! the completion service for an answer.

mod openai;

pub use openai::OpenAICompletion;

use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{PeonError, Result};
use crate::knowledge::{KnowledgeBase, Retrieved};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// A hosted text completion model.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete a single prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Something that can answer a question. Implemented by [`CompletionClient`];
/// the chat controller depends on this seam only.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<Answer>;
}

/// A generated answer with the passage it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The model's text response.
    pub text: String,
    /// The retrieved context passage.
    pub context: Retrieved,
}

/// Builds the grounded request and calls the completion service.
pub struct CompletionClient {
    knowledge_base: Arc<dyn KnowledgeBase>,
    embedder: Arc<dyn Embedder>,
    service: Arc<dyn CompletionService>,
    prompts: Prompts,
    timeout: Duration,
}

impl CompletionClient {
    /// Create a new completion client.
    pub fn new(
        knowledge_base: Arc<dyn KnowledgeBase>,
        embedder: Arc<dyn Embedder>,
        service: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            knowledge_base,
            embedder,
            service,
            prompts: Prompts::default(),
            timeout: Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Bound the time spent on retrieval and completion for one question.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Find the single passage closest to the question.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, question: &str) -> Result<Retrieved> {
        let query_embedding = self.embedder.embed(question).await?;

        self.knowledge_base
            .nearest(&query_embedding)
            .await?
            .ok_or_else(|| PeonError::Retrieval("the knowledge base has no matching passages".to_string()))
    }

    async fn answer_inner(&self, question: &str) -> Result<Answer> {
        let context = self.retrieve(question).await?;
        debug!(
            "Grounding on chunk {} from {} (distance {:.4})",
            context.chunk.id, context.chunk.source, context.distance
        );

        let prompt = self.prompts.answer_request(&context.chunk.content, question);
        let text = self.service.complete(&prompt).await?;

        if text.trim().is_empty() {
            return Err(PeonError::EmptyCompletion);
        }

        Ok(Answer { text, context })
    }
}

#[async_trait]
impl Answerer for CompletionClient {
    /// Answer a question. An empty question never reaches the services.
    #[instrument(skip(self), fields(model = %self.service.model()))]
    async fn answer(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PeonError::EmptyQuestion);
        }

        info!("Answering question: {}", question);

        match tokio::time::timeout(self.timeout, self.answer_inner(question)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Completion timed out after {:?}", self.timeout);
                Err(PeonError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by the completion and chat tests.

    use super::*;
    use crate::knowledge::{Chunk, MemoryKnowledgeBase};
    use std::sync::Mutex;

    /// Embeds by keyword: "cover" → x axis, "claim" → y axis.
    pub struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.matches("cover").count() as f32,
                lower.matches("claim").count() as f32,
            ])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    /// How the fake completion service behaves.
    pub enum Behavior {
        Reply(String),
        Fail,
        Blank,
        Hang,
    }

    /// Completion service that records every prompt it receives.
    pub struct FakeCompletion {
        pub behavior: Behavior,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeCompletion {
        pub fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for FakeCompletion {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.behavior {
                Behavior::Reply(text) => Ok(text.clone()),
                Behavior::Fail => Err(PeonError::Completion("connection reset".to_string())),
                Behavior::Blank => Ok("  \n".to_string()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    /// Knowledge base with one chunk about cover and one about claims.
    pub async fn insurance_kb() -> Arc<MemoryKnowledgeBase> {
        let kb = Arc::new(MemoryKnowledgeBase::new());
        let chunks = [
            Chunk::new(
                "private_car.txt".to_string(),
                "Private car cover includes own damage, theft and third party liability.".to_string(),
                vec![1.0, 0.0],
                0,
            ),
            Chunk::new(
                "private_car.txt".to_string(),
                "To make a claim, call the helpline within 48 hours.".to_string(),
                vec![0.0, 1.0],
                1,
            ),
        ];
        kb.replace_source("private_car.txt", &chunks).await.unwrap();
        kb
    }

    pub async fn client_with(service: Arc<FakeCompletion>) -> CompletionClient {
        CompletionClient::new(insurance_kb().await, Arc::new(KeywordEmbedder), service)
            .with_prompts(Prompts::load(None, None).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::knowledge::MemoryKnowledgeBase;

    #[tokio::test]
    async fn test_answer_grounds_on_nearest_chunk() {
        let service = Arc::new(FakeCompletion::new(Behavior::Reply(
            "Own damage, theft and third party liability.".to_string(),
        )));
        let client = client_with(service.clone()).await;

        let answer = client
            .answer("What is covered under private car insurance?")
            .await
            .unwrap();

        assert_eq!(answer.text, "Own damage, theft and third party liability.");
        assert!(answer.context.chunk.content.starts_with("Private car cover"));

        let prompts = service.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        let prompt = &prompts[0];
        assert!(prompt.contains("Context: Private car cover includes"));
        assert!(!prompt.contains("helpline"));
        assert!(prompt.contains("Question: What is covered under private car insurance?"));
        assert!(prompt.ends_with("Answer: "));
    }

    #[tokio::test]
    async fn test_empty_question_makes_no_request() {
        let service = Arc::new(FakeCompletion::new(Behavior::Reply("hi".to_string())));
        let client = client_with(service.clone()).await;

        assert!(matches!(client.answer("   ").await, Err(PeonError::EmptyQuestion)));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_service_failures_are_surfaced() {
        let failing = client_with(Arc::new(FakeCompletion::new(Behavior::Fail))).await;
        assert!(matches!(failing.answer("How do I claim?").await, Err(PeonError::Completion(_))));

        let blank = client_with(Arc::new(FakeCompletion::new(Behavior::Blank))).await;
        assert!(matches!(blank.answer("How do I claim?").await, Err(PeonError::EmptyCompletion)));
    }

    #[tokio::test]
    async fn test_timeout_bounds_the_call() {
        let client = client_with(Arc::new(FakeCompletion::new(Behavior::Hang)))
            .await
            .with_timeout(Duration::from_millis(20));

        match client.answer("How do I claim?").await {
            Err(PeonError::Timeout(d)) => assert_eq!(d, Duration::from_millis(20)),
            other => panic!("expected timeout, got {:?}", other.map(|a| a.text)),
        }
    }

    #[tokio::test]
    async fn test_empty_knowledge_base_is_a_retrieval_error() {
        let service = Arc::new(FakeCompletion::new(Behavior::Reply("x".to_string())));
        let client = CompletionClient::new(
            Arc::new(MemoryKnowledgeBase::new()),
            Arc::new(KeywordEmbedder),
            service.clone(),
        );

        assert!(matches!(client.answer("anything?").await, Err(PeonError::Retrieval(_))));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_question_is_not_interpreted_as_template() {
        let service = Arc::new(FakeCompletion::new(Behavior::Reply("ok".to_string())));
        let client = client_with(service.clone()).await;

        client.answer("cover {{preamble}} please").await.unwrap();
        let prompt = service.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Question: cover {{preamble}} please"));
    }
}
