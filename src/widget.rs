//! The chat widget: state machine, message exchange and control surface.
//!
//! A [`ChatWidget`] is a cheap handle over shared state. Construction reads
//! persisted state once, builds the DOM and registers listeners; everything
//! afterwards is driven by the host through the control surface or
//! [`ChatWidget::dispatch`].
//!
//! # Example
//!
//! ```rust,no_run
//! use gharfix_widget::config::WidgetConfig;
//! use gharfix_widget::widget::ChatWidget;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let widget = ChatWidget::builder(WidgetConfig::default()).build()?;
//! widget.send_message("Pricing").await;
//! println!("{}", widget.render_html());
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::WidgetConfig;
use crate::conversation::ConversationId;
use crate::error::{ExchangeError, Result};
use crate::events::{Action, DomEvent, EventKind, EventTarget, ListenerRegistry};
use crate::links::{LinkOpener, RecordingOpener};
use crate::protocol::{ChatRequest, Reply};
use crate::scheduler::Scheduler;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::transport::{HttpEndpoint, MessageEndpoint};
use crate::view::{self, Message, Sender, WidgetDom};

/// Persistent and transient widget flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetState {
    /// Collapsed; persisted across reloads.
    pub minimized: bool,
    /// An exchange is in flight.
    pub sending: bool,
}

/// Why a send request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another exchange is in flight.
    Busy,
    /// Nothing left after trimming.
    EmptyInput,
    /// Form submitted while collapsed; the widget expanded instead.
    Collapsed,
    /// Widget was disposed.
    Disposed,
}

/// Which branch a send request took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeOutcome {
    Skipped { reason: SkipReason },
    /// Reply shown as a bot bubble.
    Replied,
    /// Confirmation shown; link opening scheduled.
    Redirected { url: Url },
    /// Empty or unusable reply; fallback bubble shown.
    Fallback,
    /// Transport failure; error bubble shown.
    Failed,
}

impl ExchangeOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }
}

/// Serializable view of a widget for hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetSnapshot {
    pub conversation_id: ConversationId,
    pub minimized: bool,
    pub sending: bool,
    pub send_enabled: bool,
    pub typing: bool,
    pub messages: Vec<Message>,
}

/// Handle to one widget instance.
#[derive(Debug, Clone)]
pub struct ChatWidget {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    config: WidgetConfig,
    conversation_id: ConversationId,
    store: Arc<dyn KeyValueStore>,
    endpoint: Arc<dyn MessageEndpoint>,
    opener: Arc<dyn LinkOpener>,
    state: Mutex<WidgetState>,
    dom: Mutex<WidgetDom>,
    listeners: Mutex<ListenerRegistry>,
    scheduler: Scheduler,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for [`ChatWidget`].
///
/// Unset collaborators default to an in-memory store, an HTTP endpoint
/// derived from the config and a recording link opener.
#[derive(Debug)]
pub struct ChatWidgetBuilder {
    config: WidgetConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    endpoint: Option<Arc<dyn MessageEndpoint>>,
    opener: Option<Arc<dyn LinkOpener>>,
}

impl ChatWidgetBuilder {
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: Arc<dyn MessageEndpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn opener(mut self, opener: Arc<dyn LinkOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Read persisted state, build the DOM and wire listeners.
    ///
    /// Must be called from within a tokio runtime: the welcome message is
    /// scheduled on it.
    pub fn build(self) -> Result<ChatWidget> {
        let config = self.config;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);
        let endpoint = match self.endpoint {
            Some(endpoint) => endpoint,
            None => Arc::new(HttpEndpoint::with_timeout(
                config.endpoint_url()?,
                config.timing.request_timeout(),
            )?) as Arc<dyn MessageEndpoint>,
        };
        let opener = self
            .opener
            .unwrap_or_else(|| Arc::new(RecordingOpener::new()) as Arc<dyn LinkOpener>);

        let minimized = store.get(&config.minimized_key)?.as_deref() == Some("true");
        let conversation_id = ConversationId::load_or_create(store.as_ref(), &config.storage_key)?;
        let dom = WidgetDom::build(&config, minimized);

        let mut listeners = ListenerRegistry::new();
        listeners.subscribe(
            EventKind::Click,
            EventTarget::Element(view::MINIMIZE_ID.into()),
            Action::ToggleMinimize,
        );
        listeners.subscribe(
            EventKind::Click,
            EventTarget::Element(view::CONTAINER_ID.into()),
            Action::ExpandIfCollapsed,
        );
        listeners.subscribe(
            EventKind::Submit,
            EventTarget::Element(view::FORM_ID.into()),
            Action::SubmitForm,
        );
        for action in &config.quick_actions {
            listeners.subscribe(
                EventKind::Click,
                EventTarget::QuickAction(action.key.clone()),
                Action::QuickAction(action.key.clone()),
            );
        }

        tracing::info!(
            name: "widget.created",
            conversation_id = %conversation_id,
            minimized,
            listeners = listeners.len(),
            "Chat widget initialized"
        );

        let widget = ChatWidget {
            shared: Arc::new(Shared {
                config,
                conversation_id,
                store,
                endpoint,
                opener,
                state: Mutex::new(WidgetState {
                    minimized,
                    sending: false,
                }),
                dom: Mutex::new(dom),
                listeners: Mutex::new(listeners),
                scheduler: Scheduler::new(),
            }),
        };

        if !minimized {
            widget.schedule_welcome();
        }
        Ok(widget)
    }
}

/// Clears the in-flight state when an exchange ends, including when its
/// future is dropped mid-request.
struct SendingGuard<'a> {
    shared: &'a Shared,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        {
            let mut dom = lock(&self.shared.dom);
            dom.hide_typing();
            dom.set_send_enabled(true);
        }
        lock(&self.shared.state).sending = false;
    }
}

impl ChatWidget {
    #[must_use]
    pub fn builder(config: WidgetConfig) -> ChatWidgetBuilder {
        ChatWidgetBuilder {
            config,
            store: None,
            endpoint: None,
            opener: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn config(&self) -> &WidgetConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn conversation_id(&self) -> &ConversationId {
        &self.shared.conversation_id
    }

    #[must_use]
    pub fn state(&self) -> WidgetState {
        *lock(&self.shared.state)
    }

    #[must_use]
    pub fn is_minimized(&self) -> bool {
        self.state().minimized
    }

    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.state().sending
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.scheduler.is_cancelled()
    }

    /// Bubbles in display order (typing indicator excluded).
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.shared.dom).messages()
    }

    /// Run `f` against the current DOM.
    pub fn with_dom<R>(&self, f: impl FnOnce(&WidgetDom) -> R) -> R {
        f(&lock(&self.shared.dom))
    }

    #[must_use]
    pub fn render_html(&self) -> String {
        lock(&self.shared.dom).render_html()
    }

    #[must_use]
    pub fn snapshot(&self) -> WidgetSnapshot {
        let state = self.state();
        let dom = lock(&self.shared.dom);
        WidgetSnapshot {
            conversation_id: self.shared.conversation_id.clone(),
            minimized: state.minimized,
            sending: state.sending,
            send_enabled: dom.send_enabled(),
            typing: dom.has_typing_indicator(),
            messages: dom.messages(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Minimize state machine
    // ─────────────────────────────────────────────────────────────────────

    /// Expand if collapsed. Returns whether anything changed.
    pub fn expand(&self) -> bool {
        if self.is_disposed() || !self.is_minimized() {
            return false;
        }
        self.apply_minimized(false);
        true
    }

    /// Collapse if expanded. Returns whether anything changed.
    pub fn minimize(&self) -> bool {
        if self.is_disposed() || self.is_minimized() {
            return false;
        }
        self.apply_minimized(true);
        true
    }

    /// Flip the state and return the new `minimized` value.
    pub fn toggle(&self) -> bool {
        let minimized = !self.is_minimized();
        if !self.is_disposed() {
            self.apply_minimized(minimized);
        }
        self.is_minimized()
    }

    /// Click on the container background: expands a collapsed widget.
    pub fn click_container(&self) -> bool {
        self.expand()
    }

    fn apply_minimized(&self, minimized: bool) {
        lock(&self.shared.state).minimized = minimized;

        let flag = if minimized { "true" } else { "false" };
        if let Err(e) = self.shared.store.set(&self.shared.config.minimized_key, flag) {
            tracing::warn!(
                name: "widget.state.persist_failed",
                error = %e,
                "Failed to persist minimized flag"
            );
        }

        lock(&self.shared.dom).set_minimized(minimized);
        tracing::debug!(name: "widget.toggled", minimized, "Widget visibility changed");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────────────

    /// Set the text field's value.
    pub fn set_input(&self, text: &str) {
        lock(&self.shared.dom).set_input_value(text);
    }

    #[must_use]
    pub fn input(&self) -> String {
        lock(&self.shared.dom).input_value()
    }

    /// Submit the input form.
    ///
    /// While collapsed this only expands. While an exchange is in flight the
    /// input is left untouched.
    pub async fn submit(&self) -> ExchangeOutcome {
        if self.is_disposed() {
            return ExchangeOutcome::skipped(SkipReason::Disposed);
        }
        if self.is_minimized() {
            self.expand();
            return ExchangeOutcome::skipped(SkipReason::Collapsed);
        }
        // Claim the exchange before taking the input.
        let Some(guard) = self.begin_exchange() else {
            return ExchangeOutcome::skipped(SkipReason::Busy);
        };

        let raw = lock(&self.shared.dom).take_input();
        let text = raw.trim();
        if text.is_empty() {
            return ExchangeOutcome::skipped(SkipReason::EmptyInput);
        }
        self.run_exchange(text, guard).await
    }

    /// Click a quick-action button by key (or label). `None` for unknown
    /// actions.
    pub async fn click_quick_action(&self, key: &str) -> Option<ExchangeOutcome> {
        let text = self.shared.config.quick_action(key)?.message_text.clone();
        self.expand();
        Some(self.send_user_text(&text).await)
    }

    /// Host-facing send: expands if collapsed, then runs an exchange.
    pub async fn send_message(&self, text: &str) -> ExchangeOutcome {
        if !text.trim().is_empty() {
            self.expand();
        }
        self.send_user_text(text).await
    }

    /// Route a raw DOM event through the listener list.
    ///
    /// Returns the exchange outcome for events that start one.
    pub async fn dispatch(&self, event: &DomEvent) -> Option<ExchangeOutcome> {
        let action = lock(&self.shared.listeners).resolve(event);
        match action? {
            Action::ToggleMinimize => {
                self.toggle();
                None
            }
            Action::ExpandIfCollapsed => {
                self.click_container();
                None
            }
            Action::SubmitForm => Some(self.submit().await),
            Action::QuickAction(key) => self.click_quick_action(&key).await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Exchange
    // ─────────────────────────────────────────────────────────────────────

    /// Append a user bubble and run one exchange with the endpoint.
    ///
    /// A call while another exchange is in flight is dropped without a
    /// bubble or a request.
    pub async fn send_user_text(&self, text: &str) -> ExchangeOutcome {
        let text = text.trim();
        if text.is_empty() {
            return ExchangeOutcome::skipped(SkipReason::EmptyInput);
        }
        if self.is_disposed() {
            return ExchangeOutcome::skipped(SkipReason::Disposed);
        }

        let Some(guard) = self.begin_exchange() else {
            return ExchangeOutcome::skipped(SkipReason::Busy);
        };
        self.run_exchange(text, guard).await
    }

    /// Mark an exchange as in flight, or `None` if one already is.
    fn begin_exchange(&self) -> Option<SendingGuard<'_>> {
        let mut state = lock(&self.shared.state);
        if state.sending {
            tracing::debug!(name: "widget.exchange.dropped", "Exchange already in flight");
            return None;
        }
        state.sending = true;
        Some(SendingGuard {
            shared: &self.shared,
        })
    }

    async fn run_exchange(&self, text: &str, _guard: SendingGuard<'_>) -> ExchangeOutcome {
        {
            let mut dom = lock(&self.shared.dom);
            dom.append_message(Sender::User, text);
            dom.set_send_enabled(false);
            dom.show_typing();
        }

        let request = ChatRequest {
            message: text.to_string(),
            conversation_id: self.shared.conversation_id.clone(),
        };
        tracing::info!(
            name: "widget.exchange.started",
            conversation_id = %request.conversation_id,
            chars = request.message.chars().count(),
            "Sending message"
        );

        let result = self
            .shared
            .endpoint
            .exchange(&request)
            .await
            .and_then(Reply::classify);

        let messages = &self.shared.config.messages;
        let mut dom = lock(&self.shared.dom);
        dom.hide_typing();

        match result {
            Ok(Reply::Text(reply)) => {
                dom.append_message(Sender::Bot, &reply);
                ExchangeOutcome::Replied
            }
            Ok(Reply::Redirect(url)) => {
                dom.append_message(Sender::Bot, &messages.redirect_confirmation);
                drop(dom);
                tracing::info!(name: "widget.exchange.redirect", url = %url, "Redirect reply received");
                self.schedule_redirect(url.clone());
                ExchangeOutcome::Redirected { url }
            }
            Err(err) => {
                let (text, outcome) = match &err {
                    ExchangeError::Status { .. } => {
                        (&messages.request_failed, ExchangeOutcome::Failed)
                    }
                    ExchangeError::EmptyReply | ExchangeError::InvalidRedirect(_) => {
                        (&messages.empty_reply, ExchangeOutcome::Fallback)
                    }
                    ExchangeError::Network(_) | ExchangeError::Decode(_) => {
                        (&messages.network_error, ExchangeOutcome::Failed)
                    }
                };
                if err.is_transport() {
                    tracing::error!(name: "widget.exchange.failed", error = %err, "Chat exchange failed");
                } else {
                    tracing::warn!(name: "widget.exchange.unusable", error = %err, "Chat reply unusable");
                }
                dom.append_message(Sender::Bot, text);
                outcome
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scheduled work
    // ─────────────────────────────────────────────────────────────────────

    fn schedule_welcome(&self) {
        let weak = Arc::downgrade(&self.shared);
        self.shared
            .scheduler
            .schedule(self.shared.config.timing.welcome_delay(), move || {
                if let Some(shared) = weak.upgrade() {
                    let text = &shared.config.welcome_message;
                    lock(&shared.dom).append_message(Sender::Bot, text);
                }
            });
    }

    /// Open `url` after the first delay, then post the follow-up bubble
    /// after the second. Both stages die with the widget.
    fn schedule_redirect(&self, url: Url) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let timing = &self.shared.config.timing;
        let open_delay = timing.redirect_open_delay();
        let follow_up_delay = timing.redirect_follow_up_delay();

        self.shared.scheduler.spawn(async move {
            tokio::time::sleep(open_delay).await;
            match weak.upgrade() {
                Some(shared) => shared.opener.open(&url),
                None => return,
            }

            tokio::time::sleep(follow_up_delay).await;
            if let Some(shared) = weak.upgrade() {
                let text = &shared.config.messages.redirect_follow_up;
                lock(&shared.dom).append_message(Sender::Bot, text);
            }
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────

    /// Remove every listener and cancel pending timers. Idempotent.
    pub fn dispose(&self) {
        let removed = lock(&self.shared.listeners).dispose();
        self.shared.scheduler.cancel_all();
        tracing::info!(
            name: "widget.disposed",
            conversation_id = %self.shared.conversation_id,
            listeners = removed,
            "Chat widget disposed"
        );
    }

    /// Delayed tasks still waiting to run.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.shared.scheduler.pending()
    }
}
