use hiretrack::auth::AccessTokens;
use hiretrack::config::{AuthConfig, BotMimicConfig};
use hiretrack::workflows::applications::{Actor, ActorRole, ApplicationRegistry, InMemoryStore};
use hiretrack::workflows::bot_mimic::{AutoProcessScheduler, BotMimicProcessor};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryRegistry = ApplicationRegistry<InMemoryStore, InMemoryStore>;
pub(crate) type MemoryProcessor = BotMimicProcessor<InMemoryStore, InMemoryStore>;
pub(crate) type MemoryScheduler = AutoProcessScheduler<InMemoryStore, InMemoryStore>;

/// Registry and Bot Mimic scheduler sharing one process-local store.
pub(crate) struct Services {
    pub(crate) registry: Arc<MemoryRegistry>,
    pub(crate) scheduler: Arc<MemoryScheduler>,
}

impl Services {
    pub(crate) fn in_memory(config: &BotMimicConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let registry = Arc::new(ApplicationRegistry::new(
            store.clone(),
            store.clone(),
            config.persistence_timeout,
        ));
        let processor: Arc<MemoryProcessor> = Arc::new(BotMimicProcessor::new(
            store.clone(),
            store.clone(),
            config.persistence_timeout,
        ));
        let scheduler = Arc::new(AutoProcessScheduler::new(
            processor,
            config.default_interval_minutes,
        ));

        Self {
            registry,
            scheduler,
        }
    }

    pub(crate) fn processor(&self) -> &Arc<MemoryProcessor> {
        self.scheduler.processor()
    }
}

/// Token table built from the configured bearer tokens; unset roles cannot authenticate.
pub(crate) fn access_tokens(auth: &AuthConfig) -> AccessTokens {
    let mut tokens = AccessTokens::new();
    if let Some(token) = &auth.bot_token {
        tokens = tokens.with_token(token.clone(), Actor::bot_mimic());
    }
    if let Some(token) = &auth.admin_token {
        tokens = tokens.with_token(
            token.clone(),
            Actor::new("admin", "Administrator", ActorRole::Admin),
        );
    }
    if let Some(token) = &auth.applicant_token {
        tokens = tokens.with_token(
            token.clone(),
            Actor::new("applicant", "Applicant", ActorRole::Applicant),
        );
    }
    tokens
}
