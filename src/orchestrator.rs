//! Application service for SmartScribe.
//!
//! Owns the injected capabilities and coordinates sessions, transcripts,
//! messages and question answering.

use crate::cache::{CacheOutcome, IndexCacheManager};
use crate::chunking::ChunkingConfig;
use crate::config::{CollectionNames, Prompts, Settings};
use crate::embedding::{create_embedder, Embedder, EmbeddingGateway};
use crate::error::{Result, ScribeError};
use crate::rag::{Answer, Generator, OpenAIGenerator, Responder};
use crate::session::{Message, NewTranscript, Sender, Session, Transcript, TranscriptSource};
use crate::storage::{to_fields, BlobStore, DocumentStore, Filter, FsBlobStore, SqliteDocumentStore};
use crate::transcription::{MediaInput, Transcriber, WhisperTranscriber};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// External capabilities the orchestrator is built from.
pub struct Components {
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub transcriber: Arc<dyn Transcriber>,
}

/// Result of answering a question in a session.
#[derive(Debug, Clone)]
pub struct SessionAnswer {
    pub answer: Answer,
    /// Whether the session index was restored or rebuilt for this question.
    pub cache: CacheOutcome,
    /// The assistant message recorded for the answer.
    pub message: Message,
}

/// The main orchestrator for the SmartScribe pipeline.
pub struct Orchestrator {
    settings: Settings,
    documents: Arc<dyn DocumentStore>,
    transcriber: Arc<dyn Transcriber>,
    collections: CollectionNames,
    cache: IndexCacheManager,
    responder: Responder,
}

impl Orchestrator {
    /// Create an orchestrator backed by SQLite, the filesystem and OpenAI.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        std::fs::create_dir_all(settings.temp_dir())?;

        let components = Components {
            documents: Arc::new(SqliteDocumentStore::new(&settings.sqlite_path())?),
            blobs: Arc::new(FsBlobStore::new(settings.blob_dir())),
            embedder: create_embedder(&settings.embedding)?,
            generator: Arc::new(OpenAIGenerator::new(&settings.rag.model)?),
            transcriber: Arc::new(WhisperTranscriber::with_config(
                &settings.transcription,
                settings.temp_dir(),
            )?),
        };

        info!(
            "Using {} embeddings ({}) and {} for answers",
            settings.embedding.provider, settings.embedding.model, settings.rag.model
        );

        Self::with_components(settings, prompts, components)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(settings: Settings, prompts: Prompts, components: Components) -> Result<Self> {
        settings.validate()?;

        let gateway = Arc::new(EmbeddingGateway::from_settings(
            components.embedder,
            &settings.embedding,
        ));
        if gateway.dimensions() != settings.embedding.dimensions as usize {
            return Err(ScribeError::Config(format!(
                "Embedder produces {}-dimensional vectors but {} are configured",
                gateway.dimensions(),
                settings.embedding.dimensions
            )));
        }

        let collections = settings.storage.collections.clone();
        let cache = IndexCacheManager::new(
            components.documents.clone(),
            components.blobs,
            gateway.clone(),
            ChunkingConfig::from_settings(&settings.chunking)?,
        )
        .with_locations(collections.clone(), settings.storage.index_bucket.clone());

        let responder = Responder::from_settings(gateway, components.generator, &settings.rag)
            .with_prompts(prompts);

        Ok(Self {
            settings,
            documents: components.documents,
            transcriber: components.transcriber,
            collections,
            cache,
            responder,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create a session owned by `user_id`.
    #[instrument(skip(self))]
    pub async fn create_session(&self, title: &str, user_id: &str) -> Result<Session> {
        let title = require_text("title", title)?;
        let user_id = require_text("user_id", user_id)?;

        let session = Session::new(title, user_id);
        self.insert(&self.collections.sessions, &session.id, &session).await?;
        info!("Created session {}", session.id);
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.documents
            .get(&self.collections.sessions, session_id)
            .await?
            .ok_or_else(|| ScribeError::NotFound(format!("Session {} does not exist", session_id)))?
            .into_record()
    }

    /// List sessions, optionally only those of one user.
    pub async fn list_sessions(&self, user_id: Option<&str>) -> Result<Vec<Session>> {
        let filter = match user_id {
            Some(user) => Filter::equal("user_id", user),
            None => Filter::all(),
        };
        self.records(&self.collections.sessions, &filter).await
    }

    /// Store a transcript in an existing session.
    #[instrument(skip(self, new), fields(session_id = %new.session_id, source = new.source.label()))]
    pub async fn add_transcript(&self, mut new: NewTranscript) -> Result<Transcript> {
        new.title = require_text("title", &new.title)?;
        if new.original_text.trim().is_empty() {
            return Err(ScribeError::InvalidInput("Transcript text is empty".to_string()));
        }
        self.get_session(&new.session_id).await?;

        let transcript = new.into_transcript();
        self.insert(&self.collections.transcripts, &transcript.id, &transcript).await?;
        info!(
            "Added transcript {} ({} characters) to session {}",
            transcript.id,
            transcript.original_text.chars().count(),
            transcript.session_id
        );
        Ok(transcript)
    }

    /// Transcribe `input` and store the text as a transcript.
    ///
    /// Without a title, the file name or URL is used.
    #[instrument(skip(self, input), fields(input = %input.describe()))]
    pub async fn transcribe_and_add(
        &self,
        session_id: &str,
        user_id: &str,
        title: Option<&str>,
        input: MediaInput,
    ) -> Result<Transcript> {
        self.get_session(session_id).await?;

        let title = match title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => input.describe().to_string(),
        };
        let source = match &input {
            MediaInput::File { filename, .. } => TranscriptSource::Upload {
                filename: filename.clone(),
            },
            MediaInput::Url(url) => TranscriptSource::Youtube { url: url.clone() },
        };

        let text = self.transcriber.transcribe(input).await?;

        self.add_transcript(NewTranscript {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            title,
            original_text: text,
            source,
        })
        .await
    }

    pub async fn list_transcripts(&self, session_id: &str) -> Result<Vec<Transcript>> {
        self.find_transcripts(Some(session_id), None).await
    }

    /// List transcripts by session, by user, or by both.
    pub async fn find_transcripts(
        &self,
        session_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Vec<Transcript>> {
        let mut filter = Filter::all();
        if let Some(session) = session_id {
            filter = filter.and("session_id", session);
        }
        if let Some(user) = user_id {
            filter = filter.and("user_id", user);
        }
        self.records(&self.collections.transcripts, &filter).await
    }

    /// Append a message to a session's conversation.
    pub async fn post_message(&self, session_id: &str, sender: Sender, text: &str) -> Result<Message> {
        let text = require_text("text", text)?;
        self.get_session(session_id).await?;

        let message = Message::new(session_id, sender, text);
        self.insert(&self.collections.messages, &message.id, &message).await?;
        Ok(message)
    }

    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        self.records(&self.collections.messages, &Filter::equal("session_id", session_id))
            .await
    }

    /// Answer `question` from the session's transcripts and record the answer
    /// as an assistant message.
    ///
    /// Fails with `NotFound` when the session has no transcripts. A failed
    /// generation still succeeds with a placeholder answer.
    #[instrument(skip(self))]
    pub async fn answer_question(&self, session_id: &str, question: &str) -> Result<SessionAnswer> {
        let question = require_text("question", question)?;

        let resolved = self.cache.resolve(session_id).await?;
        let answer = self.responder.answer(&question, &resolved.index).await?;

        let message = Message::new(session_id, Sender::Assistant, answer.text.clone());
        self.insert(&self.collections.messages, &message.id, &message).await?;

        info!(
            "Answered question in session {} ({} index)",
            session_id, resolved.outcome
        );
        Ok(SessionAnswer {
            answer,
            cache: resolved.outcome,
            message,
        })
    }

    async fn insert<T: Serialize>(&self, collection: &str, id: &str, record: &T) -> Result<()> {
        self.documents.create(collection, id, to_fields(record)?).await?;
        Ok(())
    }

    async fn records<T: DeserializeOwned>(&self, collection: &str, filter: &Filter) -> Result<Vec<T>> {
        self.documents
            .list(collection, filter)
            .await?
            .into_iter()
            .map(|doc| doc.into_record())
            .collect()
    }
}

fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ScribeError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::storage::{MemoryBlobStore, MemoryDocumentStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(ScribeError::Generation("model offline".into()));
            }
            Ok("Gradient descent steps against the gradient to reduce the loss.".to_string())
        }
    }

    struct FixedTranscriber;

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, input: MediaInput) -> Result<String> {
            Ok(format!("Transcribed speech from {}", input.describe()))
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        generator: Arc<EchoGenerator>,
        blobs: Arc<MemoryBlobStore>,
    }

    fn harness(fail_generation: bool) -> Harness {
        let mut settings = Settings::default();
        settings.embedding.provider = "hashing".to_string();
        settings.embedding.dimensions = 128;

        let generator = Arc::new(EchoGenerator {
            prompts: Mutex::new(Vec::new()),
            fail: fail_generation,
        });
        let blobs = Arc::new(MemoryBlobStore::new());
        let components = Components {
            documents: Arc::new(MemoryDocumentStore::new()),
            blobs: blobs.clone(),
            embedder: Arc::new(HashingEmbedder::new(128)),
            generator: generator.clone(),
            transcriber: Arc::new(FixedTranscriber),
        };

        Harness {
            orchestrator: Orchestrator::with_components(settings, Prompts::default(), components)
                .unwrap(),
            generator,
            blobs,
        }
    }

    #[tokio::test]
    async fn test_answer_question_end_to_end() {
        let h = harness(false);
        let o = &h.orchestrator;
        let session = o.create_session("ML 101", "u1").await.unwrap();
        let transcript = "Gradient descent minimizes loss by updating weights using computed gradients.";
        o.add_transcript(NewTranscript::text(&session.id, "u1", "Lecture 1", transcript))
            .await
            .unwrap();

        let result = o
            .answer_question(&session.id, "How does gradient descent work?")
            .await
            .unwrap();

        assert!(!result.answer.text.is_empty());
        assert!(!result.answer.degraded);
        assert_eq!(result.cache, CacheOutcome::Rebuilt);
        assert_eq!(result.answer.sources.len(), 1);
        assert_eq!(result.answer.sources[0].text, transcript);
        assert!(h.generator.prompts.lock().unwrap()[0].contains(transcript));

        let messages = o.list_messages(&session.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Assistant);
        assert_eq!(messages[0].text, result.answer.text);

        let again = o.answer_question(&session.id, "And the weights?").await.unwrap();
        assert_eq!(again.cache, CacheOutcome::Restored);
        assert_eq!(h.blobs.len(), 1);
    }

    #[tokio::test]
    async fn test_answer_question_runs_on_spawned_task() {
        let h = harness(false);
        let orchestrator = Arc::new(h.orchestrator);
        let session = orchestrator.create_session("Spawned", "u1").await.unwrap();
        orchestrator
            .add_transcript(NewTranscript::text(
                &session.id,
                "u1",
                "Lecture",
                "Backpropagation applies the chain rule layer by layer.",
            ))
            .await
            .unwrap();

        let handle = {
            let orchestrator = orchestrator.clone();
            let session_id = session.id.clone();
            tokio::spawn(async move {
                orchestrator
                    .answer_question(&session_id, "What is backpropagation?")
                    .await
            })
        };

        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.cache, CacheOutcome::Rebuilt);
        assert_eq!(result.answer.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_answer_question_without_transcripts() {
        let h = harness(false);
        let session = h.orchestrator.create_session("Empty", "u1").await.unwrap();

        let result = h.orchestrator.answer_question(&session.id, "Anything?").await;
        assert!(matches!(result, Err(ScribeError::NotFound(_))));
        assert!(h.blobs.is_empty());
        assert!(h.generator.prompts.lock().unwrap().is_empty());
        assert!(h.orchestrator.list_messages(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_is_recorded_as_placeholder() {
        let h = harness(true);
        let o = &h.orchestrator;
        let session = o.create_session("ML", "u1").await.unwrap();
        o.add_transcript(NewTranscript::text(&session.id, "u1", "L1", "Some lecture text."))
            .await
            .unwrap();

        let result = o.answer_question(&session.id, "What?").await.unwrap();
        assert!(result.answer.degraded);
        assert!(result.answer.text.starts_with("[Generation error]"));
        assert_eq!(o.list_messages(&session.id).await.unwrap()[0].text, result.answer.text);
    }

    #[tokio::test]
    async fn test_input_validation() {
        let h = harness(false);
        let o = &h.orchestrator;

        assert!(matches!(
            o.create_session("  ", "u1").await,
            Err(ScribeError::InvalidInput(_))
        ));
        assert!(matches!(
            o.add_transcript(NewTranscript::text("missing", "u1", "T", "text")).await,
            Err(ScribeError::NotFound(_))
        ));

        let session = o.create_session("S", "u1").await.unwrap();
        assert!(matches!(
            o.add_transcript(NewTranscript::text(&session.id, "u1", "T", " \n ")).await,
            Err(ScribeError::InvalidInput(_))
        ));
        assert!(matches!(
            o.answer_question(&session.id, "").await,
            Err(ScribeError::InvalidInput(_))
        ));
        assert!(matches!(
            o.post_message(&session.id, Sender::User, "").await,
            Err(ScribeError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_transcribe_and_add_records_source() {
        let h = harness(false);
        let o = &h.orchestrator;
        let session = o.create_session("S", "u1").await.unwrap();

        let upload = o
            .transcribe_and_add(
                &session.id,
                "u1",
                None,
                MediaInput::File {
                    filename: "talk.mp3".into(),
                    bytes: vec![1, 2, 3],
                },
            )
            .await
            .unwrap();
        assert_eq!(upload.title, "talk.mp3");
        assert_eq!(upload.original_text, "Transcribed speech from talk.mp3");
        assert_eq!(
            upload.source,
            TranscriptSource::Upload {
                filename: "talk.mp3".into()
            }
        );

        let url = "https://youtu.be/dQw4w9WgXcQ";
        let video = o
            .transcribe_and_add(&session.id, "u1", Some("Video"), MediaInput::Url(url.into()))
            .await
            .unwrap();
        assert_eq!(video.title, "Video");
        assert_eq!(video.source, TranscriptSource::Youtube { url: url.into() });

        assert_eq!(o.list_transcripts(&session.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sessions_and_messages() {
        let h = harness(false);
        let o = &h.orchestrator;
        let a = o.create_session("A", "u1").await.unwrap();
        o.create_session("B", "u2").await.unwrap();

        assert_eq!(o.list_sessions(None).await.unwrap().len(), 2);
        assert_eq!(o.list_sessions(Some("u1")).await.unwrap(), vec![a.clone()]);
        assert_eq!(o.get_session(&a.id).await.unwrap(), a);
        assert!(matches!(o.get_session("nope").await, Err(ScribeError::NotFound(_))));

        o.post_message(&a.id, Sender::User, "hello").await.unwrap();
        o.post_message(&a.id, Sender::Assistant, "hi").await.unwrap();
        let texts: Vec<String> = o
            .list_messages(&a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["hello", "hi"]);
    }

    #[test]
    fn test_dimension_disagreement_is_config_error() {
        let settings = Settings::default();
        let components = Components {
            documents: Arc::new(MemoryDocumentStore::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
            embedder: Arc::new(HashingEmbedder::new(16)),
            generator: Arc::new(EchoGenerator {
                prompts: Mutex::new(Vec::new()),
                fail: false,
            }),
            transcriber: Arc::new(FixedTranscriber),
        };
        assert!(matches!(
            Orchestrator::with_components(settings, Prompts::default(), components),
            Err(ScribeError::Config(_))
        ));
    }
}
