//! Widget DOM: built once, then mutated only through this type.

use serde::{Deserialize, Serialize};

use crate::config::WidgetConfig;
use crate::dom::{Element, Node, text_with_breaks};

pub const CONTAINER_ID: &str = "gfc-always-chat";
pub const HEADER_ID: &str = "gfc-header";
pub const MINIMIZE_ID: &str = "gfc-minimize";
pub const MESSAGES_ID: &str = "gfc-messages";
pub const FORM_ID: &str = "gfc-inputbar";
pub const INPUT_ID: &str = "gfc-input";
pub const SEND_ID: &str = "gfc-send";
pub const TYPING_ID: &str = "gfc-typing";

pub const MINIMIZED_CLASS: &str = "minimized";
pub const QUICK_ACTIONS_CLASS: &str = "gfc-quick-actions";
pub const QUICK_BUTTON_CLASS: &str = "gfc-quick-btn";
pub const MESSAGE_CLASS: &str = "gfc-msg";
pub const BUBBLE_CLASS: &str = "gfc-bubble";

/// Who a bubble speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    fn class(self) -> &'static str {
        match self {
            Self::User => "gfc-user",
            Self::Bot => "gfc-bot",
        }
    }
}

/// A rendered message bubble, read back from the DOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

/// The widget's element tree plus the little view state the DOM itself
/// would hold (scroll offset, focus).
#[derive(Debug, Clone)]
pub struct WidgetDom {
    root: Element,
    scroll_top: usize,
    focused: bool,
}

impl WidgetDom {
    /// Build the full subtree: container, header, message list, quick
    /// actions and input form.
    #[must_use]
    pub fn build(config: &WidgetConfig, minimized: bool) -> Self {
        let (glyph, tooltip) = toggle_face(minimized);
        let minimize = Element::new("button")
            .with_id(MINIMIZE_ID)
            .with_attr("type", "button")
            .with_attr("title", tooltip)
            .with_text(glyph);

        let header = Element::new("div")
            .with_id(HEADER_ID)
            .with_child(Element::new("h3").with_text(config.title.clone()))
            .with_child(Element::new("p").with_text(config.subtitle.clone()))
            .with_child(minimize);

        let messages = Element::new("div").with_id(MESSAGES_ID);

        let quick_actions = Element::new("div")
            .with_class(QUICK_ACTIONS_CLASS)
            .with_children(config.quick_actions.iter().map(|action| {
                Element::new("button")
                    .with_class(QUICK_BUTTON_CLASS)
                    .with_attr("type", "button")
                    .with_attr("data-action", action.key.clone())
                    .with_text(action.label.clone())
                    .into()
            }));

        let form = Element::new("form")
            .with_id(FORM_ID)
            .with_attr("autocomplete", "off")
            .with_child(
                Element::new("input")
                    .with_id(INPUT_ID)
                    .with_attr("type", "text")
                    .with_attr("placeholder", "Type your message...")
                    .with_attr("autocomplete", "off"),
            )
            .with_child(
                Element::new("button")
                    .with_id(SEND_ID)
                    .with_attr("type", "submit")
                    .with_text("Send"),
            );

        let mut root = Element::new("div")
            .with_id(CONTAINER_ID)
            .with_child(header)
            .with_child(messages)
            .with_child(quick_actions)
            .with_child(form);
        root.set_class(MINIMIZED_CLASS, minimized);

        Self {
            root,
            scroll_top: 0,
            focused: false,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    #[must_use]
    pub fn render_html(&self) -> String {
        self.root.render_html()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Minimize state
    // ─────────────────────────────────────────────────────────────────────

    /// Apply the collapsed/expanded look. Expanding focuses the input.
    pub fn set_minimized(&mut self, minimized: bool) {
        self.root.set_class(MINIMIZED_CLASS, minimized);
        let (glyph, tooltip) = toggle_face(minimized);
        if let Some(button) = self.root.find_by_id_mut(MINIMIZE_ID) {
            button.set_text(glyph);
            button.set_attr("title", tooltip);
        }
        self.focused = !minimized;
    }

    #[must_use]
    pub fn is_minimized(&self) -> bool {
        self.root.has_class(MINIMIZED_CLASS)
    }

    #[must_use]
    pub fn toggle_glyph(&self) -> String {
        self.root
            .find_by_id(MINIMIZE_ID)
            .map(Element::text_content)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn focused(&self) -> bool {
        self.focused
    }

    // ─────────────────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────────────────

    /// Append a bubble and scroll the list to the bottom.
    pub fn append_message(&mut self, sender: Sender, text: &str) {
        let bubble = Element::new("div")
            .with_class(BUBBLE_CLASS)
            .with_children(text_with_breaks(text));
        let message = Element::new("div")
            .with_class(MESSAGE_CLASS)
            .with_class(sender.class())
            .with_child(bubble);
        self.append_to_list(message);
    }

    /// Insert the typing indicator. At most one exists; returns `false` if
    /// one was already present.
    pub fn show_typing(&mut self) -> bool {
        if self.has_typing_indicator() {
            return false;
        }
        let dots = (0..3).map(|_| Element::new("span").with_class("dot").into());
        let typing = Element::new("div")
            .with_class("gfc-typing")
            .with_text("Assistant is typing")
            .with_children(dots);
        let indicator = Element::new("div")
            .with_id(TYPING_ID)
            .with_class(MESSAGE_CLASS)
            .with_class(Sender::Bot.class())
            .with_child(Element::new("div").with_class(BUBBLE_CLASS).with_child(typing));
        self.append_to_list(indicator);
        true
    }

    /// Remove the typing indicator if present.
    pub fn hide_typing(&mut self) -> bool {
        let removed = self.root.remove_by_id(TYPING_ID).is_some();
        if removed {
            self.scroll_top = self.scroll_top.min(self.scroll_height());
        }
        removed
    }

    #[must_use]
    pub fn has_typing_indicator(&self) -> bool {
        self.root.find_by_id(TYPING_ID).is_some()
    }

    /// Bubbles in display order, typing indicator excluded.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.list()
            .map(|list| {
                list.child_elements()
                    .filter(|e| e.id() != Some(TYPING_ID))
                    .filter_map(|e| {
                        let sender = if e.has_class(Sender::User.class()) {
                            Sender::User
                        } else if e.has_class(Sender::Bot.class()) {
                            Sender::Bot
                        } else {
                            return None;
                        };
                        Some(Message {
                            text: e.text_content(),
                            sender,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of children in the message list (indicator included).
    #[must_use]
    pub fn scroll_height(&self) -> usize {
        self.list().map_or(0, |l| l.child_elements().count())
    }

    #[must_use]
    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    #[must_use]
    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll_top == self.scroll_height()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Form
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_send_enabled(&mut self, enabled: bool) {
        if let Some(send) = self.root.find_by_id_mut(SEND_ID) {
            if enabled {
                send.remove_attr("disabled");
            } else {
                send.set_attr("disabled", "");
            }
        }
    }

    #[must_use]
    pub fn send_enabled(&self) -> bool {
        self.root
            .find_by_id(SEND_ID)
            .is_some_and(|e| e.attr("disabled").is_none())
    }

    #[must_use]
    pub fn input_value(&self) -> String {
        self.root
            .find_by_id(INPUT_ID)
            .and_then(|e| e.attr("value"))
            .unwrap_or_default()
            .to_string()
    }

    pub fn set_input_value(&mut self, value: &str) {
        if let Some(input) = self.root.find_by_id_mut(INPUT_ID) {
            if value.is_empty() {
                input.remove_attr("value");
            } else {
                input.set_attr("value", value);
            }
        }
    }

    /// Clear the input and return what it held.
    pub fn take_input(&mut self) -> String {
        let value = self.input_value();
        self.set_input_value("");
        value
    }

    fn list(&self) -> Option<&Element> {
        self.root.find_by_id(MESSAGES_ID)
    }

    fn append_to_list(&mut self, child: Element) {
        if let Some(list) = self.root.find_by_id_mut(MESSAGES_ID) {
            list.push_child(Node::Element(child));
        }
        self.scroll_top = self.scroll_height();
    }
}

fn toggle_face(minimized: bool) -> (&'static str, &'static str) {
    if minimized {
        ("+", "Expand chat")
    } else {
        ("−", "Minimize chat")
    }
}
