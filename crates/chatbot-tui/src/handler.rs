use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::App;
use crate::tui::AppEvent;

const PAGE_LINES: u16 = 5;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(result) => app.apply_reply(result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any state
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.widget.is_open() {
        handle_open_key(app, key);
    } else {
        handle_closed_key(app, key);
    }
}

/// Only the bubble is on screen.
fn handle_closed_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('o') => app.widget.toggle_open(),
        _ => {}
    }
}

/// Panel is open and the input line has focus.
fn handle_open_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.widget.close(),
        KeyCode::Enter => app.submit(),

        // Log scrolling
        KeyCode::Up => app.widget.scroll_up(1),
        KeyCode::Down => app.widget.scroll_down(1),
        KeyCode::PageUp => app.widget.scroll_up(PAGE_LINES),
        KeyCode::PageDown => app.widget.scroll_down(PAGE_LINES),

        // Input editing
        KeyCode::Backspace => app.widget.backspace(),
        KeyCode::Delete => app.widget.delete(),
        KeyCode::Left => app.widget.cursor_left(),
        KeyCode::Right => app.widget.cursor_right(),
        KeyCode::Home => app.widget.cursor_home(),
        KeyCode::End => app.widget.cursor_end(),
        KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            app.widget.insert_char(c);
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (col, row) = (mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if !app.widget.is_open() {
                if App::hit(app.bubble_area, col, row) {
                    app.widget.toggle_open();
                }
            } else if App::hit(app.close_area, col, row) {
                app.widget.close();
            } else if App::hit(app.send_area, col, row) {
                app.submit();
            }
        }
        MouseEventKind::ScrollUp if app.widget.is_open() && App::hit(app.log_area, col, row) => {
            app.widget.scroll_up(3);
        }
        MouseEventKind::ScrollDown if app.widget.is_open() && App::hit(app.log_area, col, row) => {
            app.widget.scroll_down(3);
        }
        _ => {}
    }
}
