//! Customer authorization handoff.
//!
//! When a tool needs the customer to sign in, the pending utterance is kept
//! in the session, the approval surface is opened, and a background task
//! polls the server until the conversation is authorized. The utterance is
//! then replayed through the coordinator.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shop_chat_core::{ChatRole, ConversationId, TokenStatus};

use crate::config::PollPolicy;
use crate::ports::{ChatBackend, Presenter};
use crate::session::{PollToken, Session};
use crate::stream::StreamEventCoordinator;

pub const AUTH_IN_PROGRESS_MESSAGE: &str =
    "Authentication in progress. Please complete the process in the popup window.";
pub const AUTH_SUCCESS_MESSAGE: &str =
    "Authorization successful! I'm now continuing with your request.";
pub const AUTH_TIMEOUT_MESSAGE: &str = "Authorization timed out. Please try signing in again.";

/// How a poller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The customer authorized; any pending utterance was replayed.
    Authorized,
    /// A newer poller took over.
    Superseded,
    /// Gave up after the maximum number of attempts.
    TimedOut,
}

/// Starts and supervises authorization pollers.
pub struct AuthorizationHandoff<B, P> {
    coordinator: Weak<StreamEventCoordinator<B, P>>,
    backend: Arc<B>,
    presenter: Arc<P>,
    session: Session,
    policy: PollPolicy,
}

impl<B, P> AuthorizationHandoff<B, P>
where
    B: ChatBackend + 'static,
    P: Presenter + 'static,
{
    pub(crate) const fn new(
        coordinator: Weak<StreamEventCoordinator<B, P>>,
        backend: Arc<B>,
        presenter: Arc<P>,
        session: Session,
        policy: PollPolicy,
    ) -> Self {
        Self {
            coordinator,
            backend,
            presenter,
            session,
            policy,
        }
    }

    /// React to an `auth_required` event for `utterance`.
    ///
    /// Without a conversation ID there is nothing to poll; the utterance is
    /// still kept for a later replay.
    pub fn begin(&self, utterance: &str) -> Option<JoinHandle<PollOutcome>> {
        self.session.set_pending_message(utterance);
        self.presenter.open_authorization();

        let Some(conversation_id) = self.session.conversation_id() else {
            warn!("Authorization required before a conversation was assigned");
            return None;
        };
        self.presenter
            .render_message(ChatRole::Assistant, AUTH_IN_PROGRESS_MESSAGE);
        Some(self.start_polling(conversation_id))
    }

    /// Start a poller for `conversation_id`, superseding any running one.
    pub fn start_polling(&self, conversation_id: ConversationId) -> JoinHandle<PollOutcome> {
        let token = self.session.begin_polling();
        info!(conversation_id = %conversation_id, "Polling for customer authorization");

        let poller = Poller {
            coordinator: self.coordinator.clone(),
            backend: Arc::clone(&self.backend),
            presenter: Arc::clone(&self.presenter),
            session: self.session.clone(),
            policy: self.policy,
            conversation_id,
            token,
        };
        tokio::spawn(poller.run())
    }
}

struct Poller<B, P> {
    coordinator: Weak<StreamEventCoordinator<B, P>>,
    backend: Arc<B>,
    presenter: Arc<P>,
    session: Session,
    policy: PollPolicy,
    conversation_id: ConversationId,
    token: PollToken,
}

impl<B, P> Poller<B, P>
where
    B: ChatBackend + 'static,
    P: Presenter + 'static,
{
    async fn run(self) -> PollOutcome {
        tokio::time::sleep(self.policy.initial_delay).await;

        let mut attempts = 0;
        loop {
            if !self.session.is_current_poll(self.token) {
                debug!("Authorization poller superseded");
                return PollOutcome::Superseded;
            }
            if attempts >= self.policy.max_attempts {
                warn!(attempts, "Authorization polling gave up");
                self.presenter
                    .render_message(ChatRole::Assistant, AUTH_TIMEOUT_MESSAGE);
                self.session.finish_polling(self.token);
                return PollOutcome::TimedOut;
            }
            attempts += 1;

            match self.backend.token_status(&self.conversation_id).await {
                Ok(TokenStatus::Authorized) => {
                    info!(attempts, "Customer authorized");
                    self.resume().await;
                    return PollOutcome::Authorized;
                }
                Ok(TokenStatus::Pending) => debug!(attempt = attempts, "Authorization pending"),
                Err(e) => warn!(attempt = attempts, error = %e, "Token status check failed"),
            }

            tokio::time::sleep(self.policy.interval).await;
        }
    }

    async fn resume(&self) {
        if let Some(message) = self.session.take_pending_message() {
            tokio::time::sleep(self.policy.replay_delay).await;
            self.presenter
                .render_message(ChatRole::Assistant, AUTH_SUCCESS_MESSAGE);
            self.presenter.show_busy();
            match self.coordinator.upgrade() {
                Some(coordinator) => {
                    coordinator.stream_response(&message).await;
                }
                None => debug!("Widget dropped before the pending message could be replayed"),
            }
        }
        self.session.finish_polling(self.token);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{RecordingPresenter, Rendered, ScriptedBackend};
    use shop_chat_core::StreamEvent;

    type TestCoordinator = StreamEventCoordinator<ScriptedBackend, RecordingPresenter>;

    fn setup(
        backend: &Arc<ScriptedBackend>,
    ) -> (Arc<TestCoordinator>, Arc<RecordingPresenter>) {
        let presenter = Arc::new(RecordingPresenter::default());
        let session = Session::with_conversation(ConversationId::new("conv-auth"));
        let coordinator = StreamEventCoordinator::new(
            Arc::clone(backend),
            Arc::clone(&presenter),
            session,
            "standardAssistant",
            PollPolicy::default(),
        );
        (coordinator, presenter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_authorized_poll_replays_pending_message() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(Some(TokenStatus::Pending));
        backend.push_status(None);
        backend.push_status(Some(TokenStatus::Authorized));
        backend.push_events(&[
            StreamEvent::Chunk {
                chunk: "Your order shipped.".to_string(),
            },
            StreamEvent::MessageComplete,
            StreamEvent::EndTurn,
        ]);
        let (coordinator, presenter) = setup(&backend);

        let poller = coordinator
            .handoff()
            .begin("where is my order")
            .expect("poller started");
        assert_eq!(poller.await.expect("join"), PollOutcome::Authorized);

        assert_eq!(backend.status_polls(), 3);
        assert_eq!(presenter.count(&Rendered::AuthorizationOpened), 1);
        assert_eq!(
            presenter.assistant_messages(),
            vec![
                AUTH_IN_PROGRESS_MESSAGE.to_string(),
                AUTH_SUCCESS_MESSAGE.to_string(),
                "Your order shipped.".to_string(),
            ]
        );
        assert_eq!(backend.requests()[0].message, "where is my order");
        assert!(coordinator.session().pending_message().is_none());
        assert!(!coordinator.session().is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_poller_supersedes_old() {
        let backend = Arc::new(ScriptedBackend::new());
        let (coordinator, _presenter) = setup(&backend);
        let handoff = coordinator.handoff();

        let first = handoff.start_polling(ConversationId::new("conv-auth"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        let second = handoff.start_polling(ConversationId::new("conv-auth"));

        assert_eq!(first.await.expect("join"), PollOutcome::Superseded);
        coordinator.session().reset();
        assert_eq!(second.await.expect("join"), PollOutcome::Superseded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_timeout_and_keeps_message() {
        let backend = Arc::new(ScriptedBackend::new());
        let (coordinator, presenter) = setup(&backend);

        let poller = coordinator
            .handoff()
            .begin("show my orders")
            .expect("poller started");
        assert_eq!(poller.await.expect("join"), PollOutcome::TimedOut);

        assert_eq!(backend.status_polls(), 30);
        assert_eq!(
            presenter.assistant_messages().last().map(String::as_str),
            Some(AUTH_TIMEOUT_MESSAGE)
        );
        assert_eq!(
            coordinator.session().pending_message().as_deref(),
            Some("show my orders")
        );
        assert!(!coordinator.session().is_polling());
    }

    #[tokio::test]
    async fn test_no_polling_without_conversation() {
        let backend = Arc::new(ScriptedBackend::new());
        let presenter = Arc::new(RecordingPresenter::default());
        let coordinator = StreamEventCoordinator::new(
            Arc::clone(&backend),
            Arc::clone(&presenter),
            Session::new(),
            "standardAssistant",
            PollPolicy::default(),
        );

        assert!(coordinator.handoff().begin("track order").is_none());
        assert_eq!(presenter.count(&Rendered::AuthorizationOpened), 1);
        assert!(presenter.assistant_messages().is_empty());
        assert_eq!(
            coordinator.session().pending_message().as_deref(),
            Some("track order")
        );
    }
}
