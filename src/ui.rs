use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use virtualgpt_core::{InputBox, Phase, Sender, Welcome};
use crate::app::{App, Dialog, Focus, DELETE_PROMPT, LOGOUT_PROMPT, RENAME_PROMPT};

const SIDEBAR_WIDTH: u16 = 32;
const ASSISTANT_AVATAR: &str = "🤖";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    app.view.viewport_width = area.width;

    // Input box grows with its content, up to the configured cap
    let input_height = app.view.input.resize(area.width.saturating_sub(2)) + 2;

    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let overlay = app.sidebar_visible() && app.is_narrow();
    let transcript_area = if app.sidebar_visible() && !overlay {
        let [sidebar_area, transcript_area] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)]).areas(body_area);
        render_sidebar(app, frame, sidebar_area);
        transcript_area
    } else {
        body_area
    };

    render_transcript(app, frame, transcript_area);

    if overlay {
        // Narrow terminals draw the list over the transcript
        let width = SIDEBAR_WIDTH.min(body_area.width);
        let sidebar_area = Rect { width, ..body_area };
        frame.render_widget(Clear, sidebar_area);
        render_sidebar(app, frame, sidebar_area);
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.dialog.is_some() {
        render_dialog(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", app.view.title), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.variant().display_name()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = if app.dialog.is_some() {
        " Enter: aceptar | Esc: cancelar "
    } else {
        match (app.focus, app.variant().has_conversations()) {
            (Focus::Sidebar, _) => {
                " j/k: mover | Enter: abrir | n: nueva | r: renombrar | d: eliminar | Tab: escribir "
            }
            (Focus::Input, true) => {
                " Enter: enviar | Shift/Alt+Enter: salto | ^N nueva | ^R renombrar | ^D eliminar | ^B lista | ^L salir de la cuenta | ^C cerrar "
            }
            (Focus::Input, false) => " Enter: enviar | Shift/Alt+Enter: salto | PgUp/PgDn: desplazar | ^C cerrar ",
        }
    };

    let footer = Paragraph::new(Line::from(Span::styled(
        hints,
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(footer, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Sidebar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversaciones ");

    if app.view.conversations.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "Aún no hay conversaciones",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .view
        .conversations
        .items()
        .iter()
        .map(|c| {
            let style = if app.view.conversations.is_active(c.id) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(format!(" {}", c.title), style)))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(if focused {
            Style::default().bg(Color::Cyan).fg(Color::Black)
        } else {
            Style::default()
        })
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.transcript_height = area.height.saturating_sub(2);
    app.transcript_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let mut lines: Vec<Line> = Vec::new();

    match app.view.transcript.welcome() {
        Some(Welcome::NewChat) => {
            lines.push(Line::default());
            lines.push(Line::from("💬").centered());
            lines.push(Line::from(Span::styled(Welcome::NewChat.text(), Style::default().bold())).centered());
        }
        Some(welcome) => {
            push_message(&mut lines, welcome.sender().unwrap_or(Sender::Assistant), welcome.text(), Phase::Visible, &app.view.user_initial);
        }
        None => {}
    }

    for entry in app.view.transcript.entries() {
        push_message(&mut lines, entry.message.sender, &entry.message.text, entry.phase, &app.view.user_initial);
    }

    if app.is_sending() {
        lines.push(Line::from(Span::styled(
            format!("{} VirtualGPT:", ASSISTANT_AVATAR),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Pensando{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Row count comes from the same word wrapper that draws the paragraph
    let transcript = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let total_lines = rows(transcript.line_count(app.transcript_width));
    app.fit_transcript_scroll(total_lines);

    let transcript = transcript.block(block).scroll((app.transcript_scroll, 0));

    frame.render_widget(transcript, area);
}

fn push_message(lines: &mut Vec<Line<'static>>, sender: Sender, text: &str, phase: Phase, user_initial: &str) {
    let (label, color) = match sender {
        Sender::User => (format!("[{}] Tú:", user_initial), Color::Cyan),
        Sender::Assistant => (format!("{} VirtualGPT:", ASSISTANT_AVATAR), Color::Yellow),
    };

    // Entering messages are drawn dim until the next tick
    let body_style = match phase {
        Phase::Entering => Style::default().fg(Color::DarkGray),
        Phase::Visible => Style::default(),
    };

    lines.push(Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    for line in text.lines() {
        let parsed = match sender {
            Sender::User => Line::from(line.to_string()),
            Sender::Assistant => parse_markdown_line(line),
        };
        lines.push(parsed.patch_style(body_style));
    }
    lines.push(Line::default());
}

fn rows(count: usize) -> u16 {
    count.min(u16::MAX as usize) as u16
}

/// The input split into rows of at most `width` chars, the same breaks
/// `InputBox::content_height` and [`cursor_position`] count with.
fn input_rows(text: &str, width: u16) -> Vec<Line<'static>> {
    let width = width.max(1) as usize;
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            rows.push(Line::default());
            continue;
        }
        for chunk in chars.chunks(width) {
            rows.push(Line::from(chunk.iter().collect::<String>()));
        }
    }
    rows
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Input && app.dialog.is_none();
    let border_color = if app.view.send_busy {
        Color::DarkGray
    } else if focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    // The send control: relabelled and disabled while a message is in flight
    let title = if app.view.send_busy {
        let spinner = ["◐", "◓", "◑"][app.animation_frame as usize % 3];
        format!(" Enviando {} ", spinner)
    } else {
        " Mensaje (Enter para enviar) ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let (cursor_x, cursor_row) = cursor_position(&app.view.input, inner_width);
    let scroll = cursor_row.saturating_sub(inner_height.saturating_sub(1));

    let input = Paragraph::new(input_rows(app.view.input.value(), inner_width))
        .style(Style::default().fg(Color::Cyan))
        .scroll((scroll, 0))
        .block(block);

    frame.render_widget(input, area);

    if focused {
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1 + cursor_row - scroll));
    }
}

/// Cursor cell (column, wrapped row) for an input wrapped at `width`.
fn cursor_position(input: &InputBox, width: u16) -> (u16, u16) {
    let width = width.max(1) as usize;
    let (line, col) = input.cursor_line_col();
    let rows_before: usize = input
        .value()
        .split('\n')
        .take(line)
        .map(|l| l.chars().count().max(1).div_ceil(width))
        .sum();
    let row = rows_before + col / width;
    ((col % width) as u16, row.min(u16::MAX as usize) as u16)
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center).areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width)]).flex(Flex::Center).areas(row);
    rect
}

fn render_dialog(app: &App, frame: &mut Frame, area: Rect) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let width = area.width.saturating_sub(4).min(64);
    let (title, body, border) = match dialog {
        Dialog::Alert(message) => (" Aviso ", vec![Line::from(message.as_str())], Color::Red),
        Dialog::ConfirmDelete { title, .. } => (
            " Eliminar conversación ",
            vec![
                Line::from(Span::styled(title.as_str(), Style::default().bold())),
                Line::default(),
                Line::from(DELETE_PROMPT),
                Line::default(),
                Line::from(Span::styled("[s] Sí   [n] No", Style::default().fg(Color::DarkGray))),
            ],
            Color::Magenta,
        ),
        Dialog::ConfirmLogout => (
            " Cerrar sesión ",
            vec![
                Line::from(LOGOUT_PROMPT),
                Line::default(),
                Line::from(Span::styled("[s] Sí   [n] No", Style::default().fg(Color::DarkGray))),
            ],
            Color::Magenta,
        ),
        Dialog::Rename { input, .. } => (
            " Renombrar ",
            vec![
                Line::from(RENAME_PROMPT),
                Line::default(),
                Line::from(Span::styled(input.value(), Style::default().fg(Color::Cyan))),
            ],
            Color::Yellow,
        ),
    };

    let inner_width = width.saturating_sub(2);
    let body = Paragraph::new(body).wrap(Wrap { trim: false });
    let height = rows(body.line_count(inner_width)).saturating_add(2);
    let popup = centered_rect(area, width, height);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);

    frame.render_widget(Clear, popup);
    frame.render_widget(body.block(block), popup);

    if let Dialog::Rename { input, .. } = dialog {
        let x = (input.cursor() as u16).min(inner_width.saturating_sub(1));
        frame.set_cursor_position((popup.x + 1 + x, popup.y + 3));
    }
}
