use chatbot_core::{ChatClient, ChatError, ChatWidget};
use ratatui::layout::{Position, Rect};
use tokio::sync::mpsc;
use tracing::debug;

use crate::tui::AppEvent;

pub struct App {
    pub should_quit: bool,
    pub widget: ChatWidget,
    client: ChatClient,
    events: mpsc::UnboundedSender<AppEvent>,

    // Animation frame for "Thinking..." indicator (0-2)
    pub animation_frame: u8,

    // Layout areas from the last draw, for mouse hit-testing
    pub bubble_area: Option<Rect>,
    pub close_area: Option<Rect>,
    pub send_area: Option<Rect>,
    pub log_area: Option<Rect>,
}

impl App {
    pub fn new(endpoint: String, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let widget = ChatWidget::new(Some(endpoint));
        let client = ChatClient::new(widget.endpoint());

        Self {
            should_quit: false,
            widget,
            client,
            events,
            animation_frame: 0,
            bubble_area: None,
            close_area: None,
            send_area: None,
            log_area: None,
        }
    }

    /// Submit whatever is in the input line.
    ///
    /// The request runs on its own task and reports back through the event
    /// channel, so the UI keeps drawing and accepting keys meanwhile.
    pub fn submit(&mut self) {
        let Some(request) = self.widget.begin_submit() else {
            return;
        };

        debug!(in_flight = self.widget.pending(), "spawning chat request");

        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.send(&request).await;
            // Receiver is gone only when the app is shutting down.
            let _ = events.send(AppEvent::Reply(result));
        });
    }

    pub fn apply_reply(&mut self, result: Result<Option<String>, ChatError>) {
        let outcome = self.widget.finish_submit(result);
        debug!(?outcome, "chat request finished");
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.widget.pending() > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn hit(area: Option<Rect>, column: u16, row: u16) -> bool {
        area.is_some_and(|r| r.contains(Position::new(column, row)))
    }
}
