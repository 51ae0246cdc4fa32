use std::{sync::Arc, time::Duration};

use qg_core::{FileStore, MemoryStore, ProgressStore, QuizGenerator};
use qg_gemini::GeminiGenerator;

use crate::{ApiConfig, config::Environment, session::registry::SessionRegistry};

#[derive(Clone)]
pub struct ApiState {
    pub sessions: SessionRegistry,
    pub store: Arc<dyn ProgressStore>,
    pub generator: Arc<dyn QuizGenerator>,
    pub environment: Environment,
    pub session_idle_timeout: Duration,
}

impl ApiState {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn ProgressStore> = match &config.store_dir {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "Saving quiz progress to disk");
                Arc::new(FileStore::open(dir)?)
            }
            None => {
                tracing::warn!("QUIZGEN_STORE_DIR not set, quiz progress is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let generator = GeminiGenerator::new(
            config.gemini_api_key.clone(),
            config.gemini_base_url.clone(),
            config.request_timeout(),
        )?;

        Ok(Self::with_parts(store, Arc::new(generator), config.env.clone())
            .with_session_idle_timeout(config.session_idle_timeout()))
    }

    /// State around an explicit store and generator
    pub fn with_parts(
        store: Arc<dyn ProgressStore>,
        generator: Arc<dyn QuizGenerator>,
        environment: Environment,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            store,
            generator,
            environment,
            session_idle_timeout: Duration::from_secs(120 * 60),
        }
    }

    #[must_use]
    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }
}
