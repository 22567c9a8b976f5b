use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppScreen, Dialog, NoticeLevel, Panel};
use crate::input::TextInput;
use crate::invite::InviteDialog;
use crate::models::file_name_from_url;
use crate::profile::{ProfileDialog, ProfileField};
use crate::rooms::{DeleteDialog, RoomField, RoomForm};

pub fn draw(frame: &mut Frame, app: &App) {
    match &app.screen {
        AppScreen::Loading { message } => draw_loading(frame, message),
        AppScreen::Error { message } => draw_error(frame, message),
        AppScreen::Main => draw_main(frame, app),
    }
}

fn draw_loading(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let block = Block::default()
        .title(" roomchat ")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(inner);

    let logo = Paragraph::new(vec![
        Line::from(Span::styled(
            "#  R O O M C H A T",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Rooms in your terminal",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(Color::Yellow))),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(logo, chunks[1]);
}

fn draw_error(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let block = Block::default()
        .title(" roomchat - Error ")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Red));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Min(3),
            Constraint::Length(2),
            Constraint::Percentage(30),
        ])
        .split(inner);

    let error = Paragraph::new(message.to_string())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
    frame.render_widget(error, chunks[1]);

    let hint = Paragraph::new("Press any key to exit")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hint, chunks[2]);
}

fn draw_main(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    draw_header(frame, app, chunks[0]);
    draw_body(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    match app.dialog {
        Some(Dialog::CreateRoom(ref d)) => draw_room_form(frame, " New Room ", &d.form),
        Some(Dialog::Rename(ref d)) => draw_room_form(frame, " Edit Room ", &d.form),
        Some(Dialog::Delete(ref d)) => draw_delete_dialog(frame, d),
        Some(Dialog::Invite(ref d)) => draw_invite_dialog(frame, app, d),
        Some(Dialog::Profile(ref d)) => draw_profile_dialog(frame, d),
        Some(Dialog::Attach(ref input)) => draw_attach_dialog(frame, input),
        None => {}
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let user = app.current_user();
    let user_name = user.as_ref().map(|u| u.username.as_str()).unwrap_or("Unknown");
    let initial = user_name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default();

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " # ROOMCHAT ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} rooms", app.directory.snapshot().rooms.len()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", initial),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        Span::styled(format!(" {} ", user_name), Style::default().fg(Color::Green)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(header, area);
}

fn draw_body(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    draw_room_list(frame, app, chunks[0]);
    draw_message_area(frame, app, chunks[1]);
}

fn draw_room_list(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.active_panel == Panel::RoomList;
    let border_color = if is_active { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .title(" Rooms ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let filter_text = if app.room_filter.is_empty() && !app.filtering {
        Span::styled("/ to search rooms", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            format!("/ {}", app.room_filter.as_str()),
            Style::default().fg(Color::White),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(filter_text)), chunks[0]);
    if app.filtering {
        frame.set_cursor_position((
            chunks[0].x + 2 + app.room_filter.cursor_column(),
            chunks[0].y,
        ));
    }

    let rooms = app.filtered_rooms();
    let selected_id = app.directory.selected_room_id();
    let selected_pos = rooms.iter().position(|r| Some(r.id) == selected_id);

    let item_height = 2usize;
    let max_visible = chunks[1].height as usize / item_height;
    let scroll_start = match selected_pos {
        Some(pos) if max_visible > 0 && pos >= max_visible => pos - max_visible + 1,
        _ => 0,
    };

    let items: Vec<ListItem> = rooms
        .iter()
        .skip(scroll_start)
        .take(max_visible.max(1))
        .map(|room| {
            let is_selected = Some(room.id) == selected_id;
            let name_style = if is_selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let indicator = if is_selected { "▸ " } else { "  " };
            let description = room.description_text();
            let description = if description.chars().count() > 25 {
                format!("{}…", description.chars().take(24).collect::<String>())
            } else {
                description.to_string()
            };

            ListItem::new(Text::from(vec![
                Line::from(vec![
                    Span::styled(indicator, name_style),
                    Span::styled(room.name.clone(), name_style),
                ]),
                Line::from(vec![
                    Span::raw("    "),
                    Span::styled(description, Style::default().fg(Color::DarkGray)),
                ]),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), chunks[1]);
}

fn draw_message_area(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(area);

    draw_messages(frame, app, chunks[0]);
    draw_input(frame, app, chunks[1]);
}

fn draw_messages(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.active_panel == Panel::Messages;
    let border_color = if is_active { Color::Cyan } else { Color::DarkGray };

    let directory = app.directory.snapshot();
    let title = match directory.selected_room() {
        Some(room) if !room.description_text().is_empty() => {
            format!(" {} · {} ", room.name, room.description_text())
        }
        Some(room) => format!(" {} ", room.name),
        None => " No room selected ".to_string(),
    };
    let members = directory
        .members
        .iter()
        .map(|m| m.username.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(format!(" {} ", members)).right_aligned())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if directory.selected_room_id.is_none() {
        let empty = Paragraph::new("Pick a room to start chatting")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    if app.thread.entries().is_empty() {
        let text = if app.thread.is_loading() {
            "Loading messages…"
        } else {
            "No messages yet"
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let current_user_id = app.current_user_id();
    let mut lines: Vec<Line> = Vec::new();

    for entry in app.thread.entries() {
        let is_me = Some(entry.message.sender) == current_user_id;
        let sender_style = if is_me {
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        };

        lines.push(Line::from(vec![
            Span::styled(entry.username.clone(), sender_style),
            Span::styled(
                format!("  {}", entry.formatted_time()),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        for text_line in entry.content_text().lines() {
            lines.push(Line::from(Span::styled(
                format!("  {}", text_line),
                Style::default().fg(Color::White),
            )));
        }

        if let Some(url) = entry.attachment() {
            lines.push(Line::from(Span::styled(
                format!("  📎 {}", file_name_from_url(url)),
                Style::default().fg(Color::Cyan),
            )));
        }

        lines.push(Line::from(""));
    }

    let scroll = scroll_row(lines.len(), inner.height as usize, app.thread.scroll_offset);
    let paragraph = Paragraph::new(Text::from(lines)).scroll((scroll, 0));
    frame.render_widget(paragraph, inner);
}

/// First visible line for a thread scrolled `offset` lines up from the bottom.
/// Saturates at `u16::MAX`, the furthest a paragraph can scroll.
pub fn scroll_row(total_lines: usize, visible_height: usize, offset: usize) -> u16 {
    let max_scroll = total_lines.saturating_sub(visible_height);
    let row = max_scroll.saturating_sub(offset.min(max_scroll));
    u16::try_from(row).unwrap_or(u16::MAX)
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.active_panel == Panel::Input;
    let border_color = if is_active { Color::Cyan } else { Color::DarkGray };
    let text = &app.composer.text;

    let display_text = if text.is_empty() {
        if is_active {
            "Type a message…"
        } else {
            "Press Tab → Enter to type"
        }
    } else {
        text.as_str()
    };

    let style = if text.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };

    let title = match app.composer.file_label() {
        Some(label) => format!(" Message · 📎 {} ", label),
        None => " Message ".to_string(),
    };

    let input = Paragraph::new(display_text).style(style).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color)),
    );
    frame.render_widget(input, area);

    if is_active && app.dialog.is_none() {
        frame.set_cursor_position((area.x + 1 + text.cursor_column(), area.y + 1));
    }
}

fn key_hint(key: &str, label: &str) -> [Span<'static>; 2] {
    [
        Span::styled(
            format!(" {}", key),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {} │", label), Style::default().fg(Color::DarkGray)),
    ]
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans: Vec<Span> = Vec::new();
    let hints: &[(&str, &str)] = match app.active_panel {
        Panel::RoomList => &[
            ("Tab", "Switch"),
            ("/", "Search"),
            ("n", "New"),
            ("e", "Edit"),
            ("d", "Delete"),
            ("i", "Invite"),
            ("p", "Profile"),
            ("x", "Sign out"),
            ("q", "Quit"),
        ],
        Panel::Messages => &[
            ("Tab", "Switch"),
            ("↑↓", "Scroll"),
            ("o", "Open file"),
            ("r", "Reload"),
            ("q", "Quit"),
        ],
        Panel::Input => &[
            ("Enter", "Send"),
            ("Ctrl+A", "Attach"),
            ("Ctrl+X", "Detach"),
            ("Esc", "Back"),
        ],
    };
    for (key, label) in hints {
        spans.extend(key_hint(key, label));
    }

    if let Some(notice) = app.active_notice() {
        let color = match notice.level {
            NoticeLevel::Info => Color::Yellow,
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Error => Color::LightRed,
        };
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let max_len = (area.width as usize).saturating_sub(used + 1);
        let text: String = notice.text.chars().take(max_len).collect();
        spans.push(Span::styled(
            format!(" {}", text),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }

    let bar = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(bar, area);
}

// ---- Dialogs ----

fn dialog_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
}

fn field_line<'a>(input: &'a TextInput, placeholder: &'a str, focused: bool) -> Line<'a> {
    let marker_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let (text, style) = if input.is_empty() {
        (placeholder, Style::default().fg(Color::DarkGray))
    } else {
        (input.as_str(), Style::default().fg(Color::White))
    };
    Line::from(vec![Span::styled("> ", marker_style), Span::styled(text, style)])
}

fn error_line(error: &Option<String>) -> Line<'_> {
    match error {
        Some(e) => Line::from(Span::styled(e.as_str(), Style::default().fg(Color::Red))),
        None => Line::from(""),
    }
}

fn draw_room_form(frame: &mut Frame, title: &str, form: &RoomForm) {
    let popup = centered_rect(60, 10, frame.area());
    frame.render_widget(Clear, popup);
    let block = dialog_block(title);
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let lines = vec![
        Line::from(Span::styled("Name", Style::default().fg(Color::Gray))),
        field_line(&form.name, "Room name", form.focus == RoomField::Name),
        Line::from(Span::styled("Description", Style::default().fg(Color::Gray))),
        field_line(
            &form.description,
            "Optional",
            form.focus == RoomField::Description,
        ),
        error_line(&form.error),
        Line::from(Span::styled(
            "Tab: next field  │  Enter: save  │  Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);

    let (input, row) = match form.focus {
        RoomField::Name => (&form.name, 1),
        RoomField::Description => (&form.description, 3),
    };
    frame.set_cursor_position((inner.x + 2 + input.cursor_column(), inner.y + row));
}

fn draw_delete_dialog(frame: &mut Frame, dialog: &DeleteDialog) {
    let popup = centered_rect(50, 6, frame.area());
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(" Delete Room ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let lines = vec![
        Line::from(format!("Delete \"{}\" for everyone?", dialog.room_name)),
        Line::from(""),
        Line::from(Span::styled(
            "y: delete  │  n/Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn draw_invite_dialog(frame: &mut Frame, app: &App, dialog: &InviteDialog) {
    let members = app.directory.members();
    let list_len = dialog.candidates.len().min(8) as u16;
    let height = 10 + list_len;
    let popup = centered_rect(60, height, frame.area());
    frame.render_widget(Clear, popup);
    let block = dialog_block(" Invite Members ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let mut lines = vec![
        Line::from(Span::styled("Search by name", Style::default().fg(Color::Gray))),
        field_line(&dialog.query, "Start typing a name…", true),
    ];

    if dialog.searching {
        lines.push(Line::from(Span::styled(
            "  searching…",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (i, user) in dialog.candidates.iter().take(8).enumerate() {
        let is_highlighted = i == dialog.highlighted;
        let style = if is_highlighted {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let indicator = if is_highlighted { "▸ " } else { "  " };
        lines.push(Line::from(vec![
            Span::styled(indicator, style),
            Span::styled(user.username.clone(), style),
        ]));
    }

    let selected = dialog
        .selected
        .iter()
        .map(|u| u.username.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Inviting: ", Style::default().fg(Color::Gray)),
        Span::styled(selected, Style::default().fg(Color::Green)),
    ]));
    let current = members
        .iter()
        .map(|u| u.username.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(Line::from(vec![
        Span::styled("Members:  ", Style::default().fg(Color::Gray)),
        Span::styled(current, Style::default().fg(Color::DarkGray)),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "↑↓: pick  │  Tab: add  │  Del: drop last  │  Enter: invite  │  Esc: cancel",
        Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Paragraph::new(lines), inner);
    frame.set_cursor_position((inner.x + 2 + dialog.query.cursor_column(), inner.y + 1));
}

fn draw_profile_dialog(frame: &mut Frame, dialog: &ProfileDialog) {
    let popup = centered_rect(60, 12, frame.area());
    frame.render_widget(Clear, popup);
    let block = dialog_block(" Profile ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let current = dialog
        .current_avatar
        .as_deref()
        .map(file_name_from_url)
        .unwrap_or("none");
    let preview = match dialog.preview {
        Some(ref p) => format!("new: {}x{} image", p.width, p.height),
        None => "new: -".to_string(),
    };

    let lines = vec![
        Line::from(Span::styled("Username", Style::default().fg(Color::Gray))),
        field_line(
            &dialog.username,
            "Username",
            dialog.focus == ProfileField::Username,
        ),
        Line::from(Span::styled(
            "Avatar file",
            Style::default().fg(Color::Gray),
        )),
        field_line(
            &dialog.avatar_path,
            "Path to an image (optional)",
            dialog.focus == ProfileField::AvatarPath,
        ),
        Line::from(vec![
            Span::styled(format!("current: {}  ", current), Style::default().fg(Color::DarkGray)),
            Span::styled(preview, Style::default().fg(Color::Green)),
        ]),
        error_line(&dialog.error),
        Line::from(""),
        Line::from(Span::styled(
            "Tab: next field  │  Enter: save  │  Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);

    let (input, row) = match dialog.focus {
        ProfileField::Username => (&dialog.username, 1),
        ProfileField::AvatarPath => (&dialog.avatar_path, 3),
    };
    frame.set_cursor_position((inner.x + 2 + input.cursor_column(), inner.y + row));
}

fn draw_attach_dialog(frame: &mut Frame, input: &TextInput) {
    let popup = centered_rect(60, 6, frame.area());
    frame.render_widget(Clear, popup);
    let block = dialog_block(" Attach File ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let lines = vec![
        Line::from(Span::styled("Path", Style::default().fg(Color::Gray))),
        field_line(input, "/path/to/file", true),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: attach  │  Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
    frame.set_cursor_position((inner.x + 2 + input.cursor_column(), inner.y + 1));
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(v[1])[1]
}
