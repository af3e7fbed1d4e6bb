use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cache::MaskingCache;
use crate::errors::MaskError;
use crate::llm::{default_client_factory, ClientFactory, Masker, PromptMasker};
use crate::models::{Job, JobOutcome, MaskingOptions, Snapshot};
use crate::pipeline::classify::classify_error;
use crate::pipeline::queue::{JobProcessor, JobQueue, JobTicket, StatusSubscription};
use crate::settings::SettingsProvider;

pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Returned by [`MaskingService::enqueue`] as soon as the job is admitted.
pub struct EnqueueReceipt {
    pub job_id: String,
    ticket: JobTicket,
}

impl EnqueueReceipt {
    /// Wait for the job's outcome. Dropping the receipt instead is fine.
    pub async fn outcome(self) -> JobOutcome {
        self.ticket.outcome().await
    }
}

/// The processor the service hands to its queue.
struct JobExecutor {
    cache: Arc<MaskingCache>,
    settings: Arc<dyn SettingsProvider>,
    masker: Arc<dyn Masker>,
    client_factory: ClientFactory,
    clock: Clock,
}

impl JobExecutor {
    async fn execute(&self, job: &Job) -> JobOutcome {
        match self.try_execute(job).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let error = classify_error(&err);
                tracing::warn!(job_id = %job.id, code = %error.code, "masking failed: {}", error.message);
                JobOutcome::Failed { error }
            }
        }
    }

    async fn try_execute(&self, job: &Job) -> anyhow::Result<JobOutcome> {
        // Resolved here rather than at submission so queued jobs see edits.
        let settings = self.settings.resolved_settings().await?;
        let client = (self.client_factory)(&settings)?;
        let result = self
            .masker
            .mask(client.as_ref(), &job.text, job.options.as_ref())
            .await?;

        let snapshot = Snapshot {
            input_text: job.text.clone(),
            masked_text: result.masked_text,
            model: settings.model_name.clone(),
            endpoint: settings.endpoint_label(),
            finished_at: (self.clock)(),
        };
        self.cache.remember_result(&snapshot).await?;

        Ok(JobOutcome::Succeeded {
            masked_text: snapshot.masked_text,
            model: snapshot.model,
            endpoint: snapshot.endpoint,
            finished_at: snapshot.finished_at,
        })
    }
}

#[async_trait]
impl JobProcessor for JobExecutor {
    async fn process(&self, job: Job) -> anyhow::Result<JobOutcome> {
        Ok(self.execute(&job).await)
    }
}

pub struct MaskingServiceBuilder {
    cache: Arc<MaskingCache>,
    settings: Arc<dyn SettingsProvider>,
    masker: Option<Arc<dyn Masker>>,
    client_factory: Option<ClientFactory>,
    id_generator: Option<IdGenerator>,
    clock: Option<Clock>,
}

impl MaskingServiceBuilder {
    pub fn masker(mut self, masker: Arc<dyn Masker>) -> Self {
        self.masker = Some(masker);
        self
    }

    pub fn client_factory(mut self, factory: ClientFactory) -> Self {
        self.client_factory = Some(factory);
        self
    }

    pub fn id_generator(mut self, generator: IdGenerator) -> Self {
        self.id_generator = Some(generator);
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> MaskingService {
        let clock: Clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(Utc::now),
        };
        let masker: Arc<dyn Masker> = match self.masker {
            Some(masker) => masker,
            None => Arc::new(PromptMasker),
        };
        let id_generator: IdGenerator = match self.id_generator {
            Some(generator) => generator,
            None => Arc::new(|| Uuid::now_v7().to_string()),
        };
        let executor = Arc::new(JobExecutor {
            cache: Arc::clone(&self.cache),
            settings: self.settings,
            masker,
            client_factory: self.client_factory.unwrap_or_else(default_client_factory),
            clock: Arc::clone(&clock),
        });
        MaskingService {
            queue: JobQueue::new(executor),
            cache: self.cache,
            id_generator,
            clock,
        }
    }
}

/// Accepts text submissions and runs them through a [`JobQueue`].
pub struct MaskingService {
    queue: JobQueue,
    cache: Arc<MaskingCache>,
    id_generator: IdGenerator,
    clock: Clock,
}

impl MaskingService {
    pub fn builder(
        cache: Arc<MaskingCache>,
        settings: Arc<dyn SettingsProvider>,
    ) -> MaskingServiceBuilder {
        MaskingServiceBuilder {
            cache,
            settings,
            masker: None,
            client_factory: None,
            id_generator: None,
            clock: None,
        }
    }

    /// Submit text for masking. Returns once the job is queued; the job id
    /// is also carried by every status event for it.
    pub async fn enqueue(
        &self,
        text: &str,
        options: Option<MaskingOptions>,
    ) -> Result<EnqueueReceipt, MaskError> {
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(MaskError::Usage("text is required".to_string()));
        }
        self.cache
            .remember_input(normalized)
            .await
            .map_err(|e| MaskError::Storage(format!("{:#}", e)))?;

        let job = Job {
            id: (self.id_generator)(),
            text: normalized.to_string(),
            requested_at: (self.clock)(),
            options,
        };
        let job_id = job.id.clone();
        tracing::debug!(job_id = %job_id, chars = job.text.chars().count(), "masking job submitted");

        let ticket = self.queue.enqueue(job);
        Ok(EnqueueReceipt { job_id, ticket })
    }

    pub fn cancel(&self, job_id: &str) -> bool {
        self.queue.cancel(job_id)
    }

    pub fn on_status(&self) -> StatusSubscription {
        self.queue.on_status()
    }

    pub fn is_locked(&self) -> bool {
        self.queue.is_locked()
    }

    pub async fn wait_for_idle(&self) {
        self.queue.wait_for_idle().await
    }

    pub fn cache(&self) -> &Arc<MaskingCache> {
        &self.cache
    }
}
