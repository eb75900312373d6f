//! State of one embedded chat widget.
//!
//! A `ChatWidget` owns everything one instance shows: whether the panel is
//! open, the rendered log, the conversation history sent to the backend and
//! the input line. Instances share nothing, so several can live side by side.
//!
//! Submitting is split in two so a front-end can stay responsive while the
//! request is in flight: [`ChatWidget::begin_submit`] renders the user turn
//! and hands back the request body, [`ChatWidget::finish_submit`] renders
//! whatever came back.

use tracing::{info, warn};

use crate::client::{ChatClient, ChatError, DEFAULT_BACKEND_URL};
use crate::state::{ChatMessage, ChatRequest, ChatRole};

/// First message shown in every new widget.
pub const GREETING: &str = "Hi! I'm your virtual assistant. How can I help you today?";

/// Shown when the backend answers without a `response` field.
pub const NO_REPLY: &str = "No response received from the assistant.";

/// How a single submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Reply rendered and appended to history.
    Replied,
    /// Backend answered without a reply; fallback rendered.
    NoReply,
    /// Request failed; error rendered.
    Errored,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone)]
pub struct ChatWidget {
    endpoint: String,
    is_open: bool,

    // Everything rendered, in order. Superset of `history`.
    log: Vec<ChatMessage>,
    history: Vec<ChatMessage>,

    input: String,
    cursor: usize,

    // Lines scrolled up from the newest entry; 0 follows the tail.
    scroll: u16,
    pending: usize,
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ChatWidget {
    /// Attach a new widget. Without an endpoint the default local backend is
    /// used. The panel starts closed with the greeting already rendered.
    pub fn new(endpoint: Option<String>) -> Self {
        let mut widget = Self {
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            is_open: false,
            log: Vec::new(),
            history: Vec::new(),
            input: String::new(),
            cursor: 0,
            scroll: 0,
            pending: 0,
        };
        widget.render_message(GREETING, ChatRole::Assistant);
        widget
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// The floating bubble is shown exactly when the panel is not.
    pub fn bubble_visible(&self) -> bool {
        !self.is_open
    }

    pub fn log(&self) -> &[ChatMessage] {
        &self.log
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    /// Number of submissions still waiting on the backend.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn toggle_open(&mut self) {
        self.is_open = !self.is_open;
    }

    pub fn open(&mut self) {
        if !self.is_open {
            self.toggle_open();
        }
    }

    pub fn close(&mut self) {
        if self.is_open {
            self.toggle_open();
        }
    }

    /// Append an entry to the visible log and jump to it.
    pub fn render_message(&mut self, text: &str, role: ChatRole) {
        self.log.push(ChatMessage {
            role,
            content: text.to_string(),
        });
        self.scroll_to_bottom();
    }

    // Scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = 0;
    }

    /// Keep the offset inside what the renderer can actually show.
    pub fn clamp_scroll(&mut self, max: u16) {
        self.scroll = self.scroll.min(max);
    }

    // Input editing

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.cursor = self.input.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Submission

    /// Accept the current input as a user turn.
    ///
    /// Returns `None` and changes nothing when the input is blank. Otherwise
    /// the trimmed text is rendered, appended to history and the input is
    /// cleared; the returned request carries the history as it stood before
    /// this turn.
    pub fn begin_submit(&mut self) -> Option<ChatRequest> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }

        let request = ChatRequest {
            history: self.history.clone(),
            user_message: text.clone(),
        };

        self.render_message(&text, ChatRole::User);
        self.history.push(ChatMessage::user(text));
        self.input.clear();
        self.cursor = 0;
        self.pending += 1;

        Some(request)
    }

    /// Render the result of a request started by [`begin_submit`](Self::begin_submit).
    pub fn finish_submit(&mut self, result: Result<Option<String>, ChatError>) -> SubmitOutcome {
        self.pending = self.pending.saturating_sub(1);

        match result {
            Ok(Some(reply)) => {
                info!(chars = reply.chars().count(), "assistant replied");
                self.render_message(&reply, ChatRole::Assistant);
                self.history.push(ChatMessage::assistant(reply));
                SubmitOutcome::Replied
            }
            Ok(None) => {
                warn!(endpoint = %self.endpoint, "backend answered without a response field");
                self.render_message(NO_REPLY, ChatRole::Assistant);
                SubmitOutcome::NoReply
            }
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = ?err, "chat request failed");
                self.render_message(&format!("Error: {}", err), ChatRole::Assistant);
                SubmitOutcome::Errored
            }
        }
    }

    /// Submit the current input and wait for the reply in one step.
    pub async fn submit(&mut self, client: &ChatClient) -> Option<SubmitOutcome> {
        let request = self.begin_submit()?;
        let result = client.send(&request).await;
        Some(self.finish_submit(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{refused_url, MockBackend};
    use serde_json::json;

    fn widget_for(url: &str) -> (ChatWidget, ChatClient) {
        let widget = ChatWidget::new(Some(url.to_string()));
        let client = ChatClient::new(widget.endpoint());
        (widget, client)
    }

    fn last(widget: &ChatWidget) -> &ChatMessage {
        widget.log().last().unwrap()
    }

    #[test]
    fn test_initial_state() {
        let widget = ChatWidget::default();
        assert!(!widget.is_open());
        assert!(widget.bubble_visible());
        assert_eq!(widget.endpoint(), DEFAULT_BACKEND_URL);
        assert_eq!(widget.log(), &[ChatMessage::assistant(GREETING)]);
        assert!(widget.history().is_empty());
    }

    #[test]
    fn test_double_toggle_restores_start_state() {
        let mut widget = ChatWidget::default();

        widget.toggle_open();
        assert!(widget.is_open());
        assert!(!widget.bubble_visible());

        widget.toggle_open();
        assert!(!widget.is_open());
        assert!(widget.bubble_visible());
    }

    #[test]
    fn test_open_and_close_are_idempotent() {
        let mut widget = ChatWidget::default();

        widget.open();
        widget.open();
        assert!(widget.is_open());

        widget.close();
        widget.close();
        assert!(!widget.is_open());
    }

    #[test]
    fn test_render_message_follows_tail() {
        let mut widget = ChatWidget::default();
        widget.scroll_up(7);

        widget.render_message("note", ChatRole::User);
        assert_eq!(widget.scroll(), 0);
        assert_eq!(last(&widget), &ChatMessage::user("note"));
        // Rendering alone never touches history.
        assert!(widget.history().is_empty());
    }

    #[test]
    fn test_blank_input_is_ignored() {
        let mut widget = ChatWidget::default();

        assert!(widget.begin_submit().is_none());

        widget.set_input("   \t ");
        assert!(widget.begin_submit().is_none());
        assert_eq!(widget.log().len(), 1);
        assert_eq!(widget.pending(), 0);
        assert_eq!(widget.input(), "   \t ");
    }

    #[test]
    fn test_begin_submit_renders_user_turn_first() {
        let mut widget = ChatWidget::default();
        widget.set_input("  hello there  ");

        let request = widget.begin_submit().unwrap();

        assert_eq!(request.user_message, "hello there");
        assert!(request.history.is_empty());
        assert_eq!(widget.log().len(), 2);
        assert_eq!(last(&widget), &ChatMessage::user("hello there"));
        assert_eq!(widget.history(), &[ChatMessage::user("hello there")]);
        assert_eq!(widget.input(), "");
        assert_eq!(widget.cursor(), 0);
        assert_eq!(widget.pending(), 1);
    }

    #[test]
    fn test_overlapping_submissions_are_not_blocked() {
        let mut widget = ChatWidget::default();

        widget.set_input("one");
        let first = widget.begin_submit().unwrap();
        widget.set_input("two");
        let second = widget.begin_submit().unwrap();

        assert_eq!(widget.pending(), 2);
        assert!(first.history.is_empty());
        assert_eq!(second.history, vec![ChatMessage::user("one")]);
    }

    #[tokio::test]
    async fn test_reply_is_rendered_and_kept() {
        let backend = MockBackend::start(vec![(200, r#"{"response":"X"}"#.into())]).await;
        let (mut widget, client) = widget_for(&backend.url);
        widget.set_input("question");

        let outcome = widget.submit(&client).await;

        assert_eq!(outcome, Some(SubmitOutcome::Replied));
        assert_eq!(last(&widget), &ChatMessage::assistant("X"));
        assert_eq!(
            widget.history(),
            &[ChatMessage::user("question"), ChatMessage::assistant("X")]
        );
        assert_eq!(widget.pending(), 0);
    }

    #[tokio::test]
    async fn test_missing_reply_uses_fallback() {
        let backend = MockBackend::start(vec![(200, r#"{"status":"ok"}"#.into())]).await;
        let (mut widget, client) = widget_for(&backend.url);
        widget.set_input("question");

        let outcome = widget.submit(&client).await;

        assert_eq!(outcome, Some(SubmitOutcome::NoReply));
        assert_eq!(last(&widget), &ChatMessage::assistant(NO_REPLY));
        assert_eq!(widget.history(), &[ChatMessage::user("question")]);
    }

    #[tokio::test]
    async fn test_server_error_is_rendered() {
        let backend = MockBackend::start(vec![(500, r#"{"detail":"boom"}"#.into())]).await;
        let (mut widget, client) = widget_for(&backend.url);
        widget.set_input("question");

        let outcome = widget.submit(&client).await;

        assert_eq!(outcome, Some(SubmitOutcome::Errored));
        let rendered = last(&widget);
        assert_eq!(rendered.role, ChatRole::Assistant);
        assert!(rendered.content.contains("boom"));
        assert!(rendered.content.contains("500"));
        assert_eq!(widget.history().len(), 1);
    }

    #[tokio::test]
    async fn test_widget_usable_after_connection_failure() {
        let (mut widget, client) = widget_for(&refused_url().await);
        widget.set_input("anyone there?");

        let outcome = widget.submit(&client).await;
        assert_eq!(outcome, Some(SubmitOutcome::Errored));
        assert!(last(&widget).content.contains("Could not connect to the server"));

        // A second attempt goes through the same path.
        widget.set_input("still there?");
        assert_eq!(widget.submit(&client).await, Some(SubmitOutcome::Errored));
        assert_eq!(widget.pending(), 0);
        assert_eq!(widget.log().len(), 5);
    }

    #[tokio::test]
    async fn test_history_sent_in_order_without_current_turn() {
        let exchanges = 3;
        let responses = (0..=exchanges)
            .map(|i| (200, format!(r#"{{"response":"reply {}"}}"#, i)))
            .collect();
        let mut backend = MockBackend::start(responses).await;
        let (mut widget, client) = widget_for(&backend.url);

        for i in 0..exchanges {
            widget.set_input(&format!("question {}", i));
            widget.submit(&client).await;
            backend.next_request().await;
        }

        widget.set_input("question 3");
        widget.submit(&client).await;
        let seen = backend.next_request().await;

        let mut expected = Vec::new();
        for i in 0..exchanges {
            expected.push(json!({ "role": "user", "content": format!("question {}", i) }));
            expected.push(json!({ "role": "assistant", "content": format!("reply {}", i) }));
        }
        assert_eq!(seen.body["history"], json!(expected));
        assert_eq!(seen.body["user_message"], "question 3");
    }

    #[test]
    fn test_input_editing_is_utf8_safe() {
        let mut widget = ChatWidget::default();
        for c in "añb".chars() {
            widget.insert_char(c);
        }
        widget.cursor_left();
        widget.backspace();
        assert_eq!(widget.input(), "ab");
        assert_eq!(widget.cursor(), 1);

        widget.insert_char('é');
        widget.cursor_home();
        widget.delete();
        assert_eq!(widget.input(), "éb");

        widget.cursor_end();
        widget.cursor_right();
        assert_eq!(widget.cursor(), 2);
    }

    #[test]
    fn test_scroll_clamps() {
        let mut widget = ChatWidget::default();
        widget.scroll_up(50);
        widget.clamp_scroll(4);
        assert_eq!(widget.scroll(), 4);
        widget.scroll_down(10);
        assert_eq!(widget.scroll(), 0);
    }

    #[test]
    fn test_instances_are_independent() {
        let mut a = ChatWidget::new(Some("http://a.example/chat".to_string()));
        let b = ChatWidget::new(Some("http://b.example/chat".to_string()));

        a.open();
        a.set_input("only in a");
        a.begin_submit();

        assert!(!b.is_open());
        assert!(b.history().is_empty());
        assert_eq!(b.log().len(), 1);
        assert_eq!(b.endpoint(), "http://b.example/chat");
    }
}
