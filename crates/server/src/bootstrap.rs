use std::sync::Arc;

use axum::Router;
use concierge_core::config::AppConfig;
use concierge_core::{CandidateRegistry, EventBus};
use concierge_providers::relay::WebhookEmailSender;
use concierge_providers::{InMemoryMailbox, OpenAiClient, ProviderSet};
use tracing::info;

use crate::{dashboard, health};

/// Everything one process shares across requests. Cloning is cheap; all
/// fields are handles onto the same underlying state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub bus: EventBus,
    pub registry: CandidateRegistry,
    pub providers: ProviderSet,
    /// Reply store fed by the inbound webhook. Also the simulated outbox in
    /// offline mode.
    pub mailbox: Arc<InMemoryMailbox>,
}

pub struct Application {
    pub state: AppState,
    pub router: Router,
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let (mut providers, mailbox) = ProviderSet::in_memory();

    if config.offline() {
        info!(
            event_name = "system.bootstrap.simulation",
            "no llm key configured, running in simulation mode"
        );
    } else {
        if let (Some(url), Some(secret)) =
            (config.relay.url.as_deref(), config.relay.webhook_secret.clone())
        {
            info!(
                event_name = "system.bootstrap.email_relay",
                relay_url = %url,
                "outbound email goes through the webhook relay"
            );
            providers.email = Arc::new(WebhookEmailSender::new(url, secret));
        }
        if let Some(api_key) = config.llm.api_key.clone() {
            info!(
                event_name = "system.bootstrap.llm",
                model = %config.llm.model,
                "llm client configured"
            );
            providers.llm = Some(Arc::new(OpenAiClient::new(api_key, config.llm.model.clone())));
        }
    }

    let state = AppState {
        config: Arc::new(config),
        bus: EventBus::new(),
        registry: CandidateRegistry::new(),
        providers,
        mailbox,
    };

    let router = dashboard::router(state.clone()).merge(health::router(state.clone()));

    Application { state, router }
}

#[cfg(test)]
pub(crate) fn state_for_tests(config: AppConfig) -> AppState {
    let (providers, mailbox) = ProviderSet::in_memory();
    AppState {
        config: Arc::new(config),
        bus: EventBus::new(),
        registry: CandidateRegistry::new(),
        providers,
        mailbox,
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::config::AppConfig;

    use super::bootstrap_with_config;

    #[test]
    fn default_config_boots_in_simulation_mode() {
        let app = bootstrap_with_config(AppConfig::default());
        assert!(app.state.config.offline());
        assert!(app.state.providers.llm.is_none());
    }
}
