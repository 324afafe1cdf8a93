use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use virtualgpt_core::input::{submit_on_enter, InputKey};
use crate::app::{App, Dialog, Focus};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(width, _) => {
            app.view.viewport_width = width;
        }
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Api(result) => app.apply(result),
    }
    app.after_update();
    Ok(())
}

fn to_input_key(code: KeyCode) -> InputKey {
    match code {
        KeyCode::Enter => InputKey::Enter,
        KeyCode::Char(c) => InputKey::Char(c),
        _ => InputKey::Other,
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.dialog.is_some() {
        handle_dialog_key(app, key);
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('b') => app.toggle_sidebar(),
            KeyCode::Char('n') => app.new_chat(),
            KeyCode::Char('r') => app.open_rename(),
            KeyCode::Char('d') => app.open_delete(),
            KeyCode::Char('l') => app.open_logout(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::PageUp => app.scroll_up(app.transcript_height.max(2) / 2),
        KeyCode::PageDown => app.scroll_down(app.transcript_height.max(2) / 2),
        KeyCode::Esc if app.view.sidebar.is_open() => app.close_sidebar(),
        _ => match app.focus {
            Focus::Input => handle_input_key(app, key),
            Focus::Sidebar => handle_sidebar_key(app, key),
        },
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    // Alt+Enter for terminals that can't report Shift+Enter
    let shift_held = key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT);

    if submit_on_enter(to_input_key(key.code), shift_held) {
        app.submit_input();
        return;
    }

    match key.code {
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        code => {
            let input = &mut app.view.input;
            match code {
                KeyCode::Enter => input.insert_newline(),
                KeyCode::Backspace => input.backspace(),
                KeyCode::Delete => input.delete(),
                KeyCode::Left => input.move_left(),
                KeyCode::Right => input.move_right(),
                KeyCode::Home => input.move_home(),
                KeyCode::End => input.move_end(),
                KeyCode::Char(c) => input.insert_char(c),
                _ => {}
            }
        }
    }
}

fn handle_sidebar_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.list_down(),
        KeyCode::Char('k') | KeyCode::Up => app.list_up(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.select_under_cursor(),
        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Char('r') => app.open_rename(),
        KeyCode::Char('d') => app.open_delete(),
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => app.focus = Focus::Input,
        _ => {}
    }
}

fn handle_dialog_key(app: &mut App, key: KeyEvent) {
    let Some(dialog) = app.dialog.take() else {
        return;
    };

    match dialog {
        Dialog::Alert(_) => {
            if !matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                app.dialog = Some(dialog);
            }
        }
        Dialog::ConfirmDelete { id, title } => match confirmation(key.code) {
            Some(confirmed) => app.delete(id, confirmed),
            None => app.dialog = Some(Dialog::ConfirmDelete { id, title }),
        },
        Dialog::ConfirmLogout => match confirmation(key.code) {
            Some(confirmed) => app.logout(confirmed),
            None => app.dialog = Some(Dialog::ConfirmLogout),
        },
        Dialog::Rename { id, current, mut input } => match key.code {
            KeyCode::Enter => {
                let proposed = input.value().to_string();
                app.rename(id, &current, Some(&proposed));
            }
            KeyCode::Esc => app.rename(id, &current, None),
            code => {
                match code {
                    KeyCode::Backspace => input.backspace(),
                    KeyCode::Delete => input.delete(),
                    KeyCode::Left => input.move_left(),
                    KeyCode::Right => input.move_right(),
                    KeyCode::Home => input.move_home(),
                    KeyCode::End => input.move_end(),
                    KeyCode::Char(c) => input.insert_char(c),
                    _ => {}
                }
                app.dialog = Some(Dialog::Rename { id, current, input });
            }
        },
    }
}

/// `Some(true)` accept, `Some(false)` decline, `None` not an answer.
fn confirmation(code: KeyCode) -> Option<bool> {
    match code {
        KeyCode::Enter | KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char('y') | KeyCode::Char('Y') => {
            Some(true)
        }
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => Some(false),
        _ => None,
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.dialog.is_some() {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{pump, summaries, test_app, FakeBackend};
    use crossterm::event::KeyEventKind;
    use virtualgpt_core::ClientVariant;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent::new_with_kind(code, modifiers, KeyEventKind::Press))
    }

    fn type_keys(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c), KeyModifiers::NONE)).unwrap();
        }
    }

    fn backend() -> FakeBackend {
        FakeBackend { list: summaries(&[(7, "Chat A")]), fail_sends: false }
    }

    #[tokio::test]
    async fn test_enter_sends_shift_enter_breaks_line() {
        let (mut app, mut rx) = test_app(ClientVariant::Guest, backend());

        type_keys(&mut app, "hola");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::SHIFT)).unwrap();
        type_keys(&mut app, "mundo");
        assert_eq!(app.view.input.value(), "hola\nmundo");
        assert!(!app.is_sending());

        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE)).unwrap();
        assert!(app.is_sending());
        assert!(app.view.input.is_empty());

        pump(&mut app, &mut rx).await;
        let last = app.view.transcript.entries().last().unwrap();
        assert_eq!(last.message.text, "eco: hola\nmundo");
    }

    #[tokio::test]
    async fn test_blank_enter_does_nothing() {
        let (mut app, mut rx) = test_app(ClientVariant::Guest, backend());

        type_keys(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE)).unwrap();

        assert!(!app.is_sending());
        assert!(app.view.transcript.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rename_dialog_cancel_and_submit() {
        let (mut app, mut rx) = test_app(ClientVariant::Authenticated, backend());
        app.start();
        pump(&mut app, &mut rx).await;
        pump(&mut app, &mut rx).await;

        handle_event(&mut app, key(KeyCode::Char('r'), KeyModifiers::CONTROL)).unwrap();
        assert!(matches!(app.dialog, Some(Dialog::Rename { id: 7, .. })));
        handle_event(&mut app, key(KeyCode::Esc, KeyModifiers::NONE)).unwrap();
        assert!(app.dialog.is_none());
        assert!(rx.try_recv().is_err());

        handle_event(&mut app, key(KeyCode::Char('r'), KeyModifiers::CONTROL)).unwrap();
        for _ in 0.."Chat A".len() {
            handle_event(&mut app, key(KeyCode::Backspace, KeyModifiers::NONE)).unwrap();
        }
        type_keys(&mut app, "Viaje");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE)).unwrap();

        pump(&mut app, &mut rx).await;
        assert_eq!(app.view.title, "Viaje");
    }

    #[tokio::test]
    async fn test_declined_delete_keeps_conversation() {
        let (mut app, mut rx) = test_app(ClientVariant::Authenticated, backend());
        app.start();
        pump(&mut app, &mut rx).await;
        pump(&mut app, &mut rx).await;

        handle_event(&mut app, key(KeyCode::Char('d'), KeyModifiers::CONTROL)).unwrap();
        // not an answer: dialog stays up
        handle_event(&mut app, key(KeyCode::Char('x'), KeyModifiers::NONE)).unwrap();
        assert!(app.dialog.is_some());

        handle_event(&mut app, key(KeyCode::Char('n'), KeyModifiers::NONE)).unwrap();
        assert!(app.dialog.is_none());
        assert!(rx.try_recv().is_err());
        assert_eq!(app.view.conversations.len(), 1);
    }

    #[tokio::test]
    async fn test_new_chat_shortcut_resets_view() {
        let (mut app, mut rx) = test_app(ClientVariant::Authenticated, backend());
        app.start();
        pump(&mut app, &mut rx).await;
        pump(&mut app, &mut rx).await;

        handle_event(&mut app, key(KeyCode::Char('n'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(app.session.active(), None);
        assert_eq!(app.view.title, virtualgpt_core::view::DEFAULT_TITLE);
        assert_eq!(app.view.conversations.active(), None);
    }

    #[test]
    fn test_resize_updates_viewport() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = App::new(
            &virtualgpt_core::Config::new(),
            ClientVariant::Authenticated,
            std::sync::Arc::new(backend()),
            tx,
        );
        handle_event(&mut app, AppEvent::Resize(70, 30)).unwrap();
        assert!(app.is_narrow());
    }
}
