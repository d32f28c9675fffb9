//! Event wiring as an explicit subscription list.
//!
//! The widget registers its listeners once at construction; hosts feed raw
//! DOM events through [`ListenerRegistry::resolve`]. Disposal drops every
//! listener at once, after which nothing resolves.

/// Kind of DOM event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Submit,
}

/// What an event was fired on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// Element with this id.
    Element(String),
    /// Quick-action button with this `data-action` key.
    QuickAction(String),
}

/// A raw event from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: EventTarget,
}

impl DomEvent {
    #[must_use]
    pub fn click(id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Click,
            target: EventTarget::Element(id.into()),
        }
    }

    #[must_use]
    pub fn submit(id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Submit,
            target: EventTarget::Element(id.into()),
        }
    }

    #[must_use]
    pub fn quick_action(key: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Click,
            target: EventTarget::QuickAction(key.into()),
        }
    }
}

/// Widget behavior bound to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ToggleMinimize,
    /// Background click: only expands a collapsed widget.
    ExpandIfCollapsed,
    SubmitForm,
    QuickAction(String),
}

#[derive(Debug, Clone)]
struct Listener {
    kind: EventKind,
    target: EventTarget,
    action: Action,
}

/// Subscription list owned by one widget instance.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    listeners: Vec<Listener>,
    disposed: bool,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Ignored once disposed.
    pub fn subscribe(&mut self, kind: EventKind, target: EventTarget, action: Action) {
        if self.disposed {
            return;
        }
        self.listeners.push(Listener {
            kind,
            target,
            action,
        });
    }

    /// Action bound to `event`, if any.
    #[must_use]
    pub fn resolve(&self, event: &DomEvent) -> Option<Action> {
        self.listeners
            .iter()
            .find(|l| l.kind == event.kind && l.target == event.target)
            .map(|l| l.action.clone())
    }

    /// Drop every listener. Returns how many were removed.
    pub fn dispose(&mut self) -> usize {
        self.disposed = true;
        let count = self.listeners.len();
        self.listeners.clear();
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_matches_kind_and_target() {
        let mut registry = ListenerRegistry::new();
        registry.subscribe(
            EventKind::Click,
            EventTarget::Element("min".into()),
            Action::ToggleMinimize,
        );
        registry.subscribe(
            EventKind::Submit,
            EventTarget::Element("form".into()),
            Action::SubmitForm,
        );

        assert_eq!(
            registry.resolve(&DomEvent::click("min")),
            Some(Action::ToggleMinimize)
        );
        assert_eq!(registry.resolve(&DomEvent::click("form")), None);
        assert_eq!(
            registry.resolve(&DomEvent::submit("form")),
            Some(Action::SubmitForm)
        );
    }

    #[test]
    fn test_dispose_is_final() {
        let mut registry = ListenerRegistry::new();
        registry.subscribe(
            EventKind::Click,
            EventTarget::QuickAction("pricing".into()),
            Action::QuickAction("pricing".into()),
        );

        assert_eq!(registry.dispose(), 1);
        assert!(registry.is_disposed());
        assert_eq!(registry.resolve(&DomEvent::quick_action("pricing")), None);

        registry.subscribe(
            EventKind::Click,
            EventTarget::Element("x".into()),
            Action::ToggleMinimize,
        );
        assert!(registry.is_empty());
    }
}
