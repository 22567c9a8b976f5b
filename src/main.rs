use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;
use tracing::{error, info};
use zeroize::Zeroize;

use roomchat::app::{App, AppScreen, Dialog, NoticeLevel, Panel};
use roomchat::client::ChatClient;
use roomchat::directory::Committed;
use roomchat::input::TextInput;
use roomchat::models::{Attachment, ThreadEntry, User, UserId};
use roomchat::session::{Session, SessionStore};
use roomchat::thread::LoadTicket;
use roomchat::{auth, config, invite, logging, profile, rooms, thread, ui, ChatError};

/// Results of background requests, delivered back to the event loop.
enum AppEvent {
    ThreadLoaded {
        ticket: LoadTicket,
        result: roomchat::Result<Vec<ThreadEntry>>,
    },
    SearchDone {
        query: String,
        result: roomchat::Result<Vec<User>>,
    },
}

type Events = mpsc::UnboundedSender<AppEvent>;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}\n", e);
            config::print_setup_guide();
            return Ok(());
        }
    };
    let dir = config::config_dir()?;
    let _log_guard = logging::init(&dir, config.log_level.as_deref());
    let session = Session::rehydrate(SessionStore::new(dir.join("session.json")));

    if args.iter().any(|a| a == "--logout") {
        auth::clear_stored_token()?;
        session.sign_out()?;
        println!("Signed out. Session and stored token cleared.");
        return Ok(());
    }

    if args.iter().any(|a| a == "--set-token") {
        let mut token = prompt("API token: ")?;
        auth::store_api_token(token.trim())?;
        token.zeroize();
        println!("Token stored securely.");
        return Ok(());
    }

    let token = auth::load_api_token()?.or_else(|| config.api_token.clone());
    let chat = ChatClient::new(&config.api_base_url, token);
    info!(base_url = chat.base_url(), "starting");

    if let Some(pos) = args.iter().position(|a| a == "--login") {
        let Some(user_id) = args.get(pos + 1).and_then(|s| s.parse::<UserId>().ok()) else {
            eprintln!("Usage: roomchat --login <user-id>");
            return Ok(());
        };
        match auth::sign_in(&chat, &session, user_id).await {
            Ok(user) => println!("Signed in as {}.", user.username),
            Err(e) => eprintln!("Sign-in failed: {}", e),
        }
        return Ok(());
    }

    if args.iter().any(|a| a == "--register") {
        register_interactive(&chat, &session).await?;
        return Ok(());
    }

    if !session.is_logged_in() {
        eprintln!("Not signed in.\n");
        config::print_setup_guide();
        return Ok(());
    }

    // Restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &config, chat, session).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    match result {
        Ok(Exit::SignedOut) => println!("Signed out."),
        Ok(Exit::Quit) => {}
        Err(ref e) => {
            error!("fatal: {}", e);
            eprintln!("Error: {}", e);
        }
    }

    result.map(|_| ())
}

enum Exit {
    Quit,
    SignedOut,
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &config::Config,
    chat: ChatClient,
    session: Session,
) -> Result<Exit> {
    let mut app = App::new(session, config);
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

    app.screen = AppScreen::Loading {
        message: "Loading your rooms...".to_string(),
    };
    terminal.draw(|f| ui::draw(f, &app))?;

    if let Err(e) = app.directory.fetch_rooms(&chat).await {
        app.screen = AppScreen::Error {
            message: format!("Failed to load rooms: {}", e),
        };
        terminal.draw(|f| ui::draw(f, &app))?;
        wait_for_key();
        return Ok(Exit::Quit);
    }
    app.screen = AppScreen::Main;

    // Open the first room
    if let Some(first) = app.filtered_rooms().first() {
        app.select_room(Some(first.id));
        refresh_members(&chat, &mut app).await;
    }
    sync_thread(&chat, &mut app, &tx);

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        while let Ok(ev) = rx.try_recv() {
            handle_app_event(&mut app, ev);
        }

        if let Some(Dialog::Invite(ref mut dialog)) = app.dialog {
            if let Some(query) = dialog.poll_fired() {
                spawn_search(&chat, query, dialog.participants.clone(), &tx);
            }
        }

        app.expire_notice();

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Ctrl+C always quits
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(Exit::Quit);
        }

        // Dialogs intercept all keys when open
        if let Some(dialog) = app.dialog.take() {
            app.dialog = handle_dialog_key(&chat, &mut app, dialog, key).await;
            sync_thread(&chat, &mut app, &tx);
            continue;
        }

        if app.filtering {
            match key.code {
                KeyCode::Esc => {
                    app.room_filter.clear();
                    app.filtering = false;
                }
                KeyCode::Enter => app.filtering = false,
                _ => {
                    edit_text(&mut app.room_filter, key);
                }
            }
            continue;
        }

        match app.active_panel {
            Panel::RoomList => match key.code {
                KeyCode::Char('q') => return Ok(Exit::Quit),
                KeyCode::Char('x') => {
                    if let Err(e) = app.sign_out() {
                        error!("Sign-out did not clear the session store: {}", e);
                    }
                    return Ok(Exit::SignedOut);
                }
                KeyCode::Char('/') => app.filtering = true,
                KeyCode::Char('n') => app.open_create_room(),
                KeyCode::Char('e') => report_validation(&mut app, |a| a.open_rename()),
                KeyCode::Char('d') => report_validation(&mut app, |a| a.open_delete()),
                KeyCode::Char('i') => report_validation(&mut app, |a| a.open_invite()),
                KeyCode::Char('p') => report_validation(&mut app, |a| a.open_profile()),
                KeyCode::Tab => app.next_panel(),
                KeyCode::BackTab => app.prev_panel(),
                KeyCode::Up | KeyCode::Char('k') => {
                    app.select_prev_room();
                    refresh_members(&chat, &mut app).await;
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    app.select_next_room();
                    refresh_members(&chat, &mut app).await;
                }
                KeyCode::Enter => app.active_panel = Panel::Input,
                KeyCode::Char('r') => refresh_directory(&chat, &mut app).await,
                _ => {}
            },
            Panel::Messages => match key.code {
                KeyCode::Char('q') => return Ok(Exit::Quit),
                KeyCode::Tab => app.next_panel(),
                KeyCode::BackTab => app.prev_panel(),
                KeyCode::Up | KeyCode::Char('k') => app.thread.scroll_up(),
                KeyCode::Down | KeyCode::Char('j') => app.thread.scroll_down(),
                KeyCode::Char('o') => open_newest_attachment(&chat, &mut app),
                KeyCode::Char('r') => {
                    if let Some(ticket) = app.reload_thread() {
                        spawn_thread_load(&chat, ticket, &tx);
                    }
                }
                _ => {}
            },
            Panel::Input => match key.code {
                KeyCode::Esc => app.active_panel = Panel::RoomList,
                KeyCode::Tab => app.next_panel(),
                KeyCode::BackTab => app.prev_panel(),
                KeyCode::Enter => send_message(&chat, &mut app).await,
                KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    report_validation(&mut app, |a| a.open_attach())
                }
                KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    app.composer.detach()
                }
                _ => {
                    edit_text(&mut app.composer.text, key);
                }
            },
        }

        sync_thread(&chat, &mut app, &tx);
    }
}

/// Applies a single-line editing key. Returns true if the text changed.
fn edit_text(input: &mut TextInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            input.insert_char(c);
            true
        }
        KeyCode::Backspace => {
            let before = input.value.len();
            input.delete_char();
            before != input.value.len()
        }
        KeyCode::Left => {
            input.move_cursor_left();
            false
        }
        KeyCode::Right => {
            input.move_cursor_right();
            false
        }
        _ => false,
    }
}

fn report_validation(app: &mut App, open: impl FnOnce(&mut App) -> roomchat::Result<()>) {
    if let Err(e) = open(app) {
        app.notify(NoticeLevel::Error, e.to_string());
    }
}

fn handle_app_event(app: &mut App, ev: AppEvent) {
    match ev {
        AppEvent::ThreadLoaded { ticket, result } => match result {
            Ok(entries) => {
                app.thread.apply_load(ticket, entries);
            }
            Err(e) => {
                if app.thread.fail_load(ticket) {
                    app.notify_error("Could not load messages", &e);
                }
            }
        },
        AppEvent::SearchDone { query, result } => {
            let Some(Dialog::Invite(ref mut dialog)) = app.dialog else {
                return;
            };
            match result {
                Ok(users) => {
                    dialog.apply_results(&query, users);
                }
                Err(e) => {
                    dialog.search_failed(&query);
                    app.notify_error("User search failed", &e);
                }
            }
        }
    }
}

/// Starts a thread load when the selected room changed since the last one.
fn sync_thread(chat: &ChatClient, app: &mut App, tx: &Events) {
    if let Some(ticket) = app.sync_thread() {
        spawn_thread_load(chat, ticket, tx);
    }
}

fn spawn_thread_load(chat: &ChatClient, ticket: LoadTicket, tx: &Events) {
    let bg = chat.clone_for_background();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = thread::load_thread(&bg, ticket.room_id).await;
        let _ = tx.send(AppEvent::ThreadLoaded { ticket, result });
    });
}

fn spawn_search(chat: &ChatClient, query: String, participants: Vec<UserId>, tx: &Events) {
    let bg = chat.clone_for_background();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = invite::search_candidates(&bg, &query, &participants).await;
        let _ = tx.send(AppEvent::SearchDone { query, result });
    });
}

async fn refresh_members(chat: &ChatClient, app: &mut App) {
    if let Err(e) = app.directory.refresh_members(chat).await {
        app.notify_error("Could not load members", &e);
    }
}

async fn refresh_directory(chat: &ChatClient, app: &mut App) {
    app.notify(NoticeLevel::Info, "Refreshing...");
    match app.directory.fetch_rooms(chat).await {
        Ok(()) => app.notify(NoticeLevel::Success, "Refreshed"),
        Err(e) => app.notify_error("Refresh failed", &e),
    }
}

async fn send_message(chat: &ChatClient, app: &mut App) {
    let Some(room_id) = app.directory.selected_room_id() else {
        app.notify(NoticeLevel::Error, "Select a room first");
        return;
    };
    let Some(user) = app.current_user() else {
        return;
    };
    match thread::submit_message(chat, &mut app.thread, &mut app.composer, room_id, &user).await {
        Ok(()) => app.notify(NoticeLevel::Success, "Message sent"),
        Err(e) if e.is_validation() => app.notify(NoticeLevel::Error, e.to_string()),
        Err(e) => app.notify_error("Send failed", &e),
    }
}

fn open_newest_attachment(chat: &ChatClient, app: &mut App) {
    let Some(url) = app.thread.newest_attachment().map(String::from) else {
        app.notify(NoticeLevel::Info, "No attachments in this room");
        return;
    };
    let absolute = match reqwest::Url::parse(&url) {
        Ok(u) => u,
        Err(_) => match reqwest::Url::parse(chat.base_url()).and_then(|base| base.join(&url)) {
            Ok(u) => u,
            Err(e) => {
                app.notify(NoticeLevel::Error, format!("Bad attachment URL: {}", e));
                return;
            }
        },
    };
    if let Err(e) = open::that(absolute.as_str()) {
        app.notify(NoticeLevel::Error, format!("Could not open file: {}", e));
    }
}

/// Reports a committed mutation: the success text, or the refresh failure
/// that followed it.
fn report_committed<T>(app: &mut App, committed: &Committed<T>, success: String) {
    match committed.refresh_error {
        Some(ref e) => app.notify_error("Saved, but refreshing rooms failed", e),
        None => app.notify(NoticeLevel::Success, success),
    }
}

/// Returns the dialog if it stays open.
async fn handle_dialog_key(
    chat: &ChatClient,
    app: &mut App,
    dialog: Dialog,
    key: KeyEvent,
) -> Option<Dialog> {
    match dialog {
        Dialog::CreateRoom(mut d) => match key.code {
            KeyCode::Esc => None,
            KeyCode::Tab | KeyCode::BackTab => {
                d.form.toggle_focus();
                Some(Dialog::CreateRoom(d))
            }
            KeyCode::Enter => {
                let user_id = app.current_user_id()?;
                match rooms::create_room(chat, &app.directory, &mut d, user_id).await {
                    Ok(committed) => {
                        let text = format!("Room \"{}\" created", committed.value.name);
                        report_committed(app, &committed, text);
                        None
                    }
                    Err(e) => {
                        keep_open_on_error(app, "Could not create room", &e);
                        Some(Dialog::CreateRoom(d))
                    }
                }
            }
            _ => {
                edit_text(d.form.focused_mut(), key);
                Some(Dialog::CreateRoom(d))
            }
        },
        Dialog::Rename(mut d) => match key.code {
            KeyCode::Esc => None,
            KeyCode::Tab | KeyCode::BackTab => {
                d.form.toggle_focus();
                Some(Dialog::Rename(d))
            }
            KeyCode::Enter => match rooms::rename_room(chat, &app.directory, &mut d).await {
                Ok(committed) => {
                    report_committed(app, &committed, "Room updated".to_string());
                    None
                }
                Err(e) => {
                    keep_open_on_error(app, "Could not update room", &e);
                    Some(Dialog::Rename(d))
                }
            },
            _ => {
                edit_text(d.form.focused_mut(), key);
                Some(Dialog::Rename(d))
            }
        },
        Dialog::Delete(d) => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match rooms::delete_room(chat, &app.directory, &d).await {
                    Ok(committed) => {
                        let text = format!("Room \"{}\" deleted", d.room_name);
                        report_committed(app, &committed, text);
                        None
                    }
                    Err(e) => {
                        app.notify_error("Could not delete room", &e);
                        Some(Dialog::Delete(d))
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => None,
            _ => Some(Dialog::Delete(d)),
        },
        Dialog::Invite(mut d) => match key.code {
            KeyCode::Esc => {
                d.cancel();
                None
            }
            KeyCode::Up => {
                d.highlight_prev();
                Some(Dialog::Invite(d))
            }
            KeyCode::Down => {
                d.highlight_next();
                Some(Dialog::Invite(d))
            }
            KeyCode::Tab => {
                d.select_highlighted();
                Some(Dialog::Invite(d))
            }
            KeyCode::Delete => {
                d.unselect_last();
                Some(Dialog::Invite(d))
            }
            KeyCode::Enter => {
                if d.selected.is_empty() {
                    d.select_highlighted();
                }
                if d.selected.is_empty() {
                    app.notify(NoticeLevel::Error, "Pick someone to invite");
                    return Some(Dialog::Invite(d));
                }
                match invite::invite_members(chat, &app.directory, &mut d).await {
                    Ok(committed) => {
                        report_committed(app, &committed, "Members invited".to_string());
                        None
                    }
                    Err(e) => {
                        app.notify_error("Could not invite members", &e);
                        Some(Dialog::Invite(d))
                    }
                }
            }
            _ => {
                if edit_text(&mut d.query, key) {
                    d.on_query_changed();
                }
                Some(Dialog::Invite(d))
            }
        },
        Dialog::Profile(mut d) => match key.code {
            KeyCode::Esc => None,
            KeyCode::Tab | KeyCode::BackTab => {
                if d.focus == profile::ProfileField::AvatarPath {
                    let _ = d.choose_avatar_from_path();
                }
                d.toggle_focus();
                Some(Dialog::Profile(d))
            }
            KeyCode::Enter => {
                if d.choose_avatar_from_path().is_err() {
                    return Some(Dialog::Profile(d));
                }
                match profile::update_profile(chat, &app.session, &mut d).await {
                    Ok(update) => {
                        match update.save_error {
                            Some(e) => app.notify_error("Profile updated but not saved", &e),
                            None => app.notify(
                                NoticeLevel::Success,
                                format!("Profile updated, hello {}", update.user.username),
                            ),
                        }
                        None
                    }
                    Err(e) => {
                        keep_open_on_error(app, "Profile update failed", &e);
                        Some(Dialog::Profile(d))
                    }
                }
            }
            _ => {
                edit_text(d.focused_mut(), key);
                Some(Dialog::Profile(d))
            }
        },
        Dialog::Attach(mut input) => match key.code {
            KeyCode::Esc => None,
            KeyCode::Enter => {
                let path = input.as_str().trim().to_string();
                match Attachment::from_path(std::path::Path::new(&path)) {
                    Ok(file) => {
                        app.composer.attach(file);
                        app.active_panel = Panel::Input;
                        None
                    }
                    Err(e) => {
                        app.notify(NoticeLevel::Error, format!("Cannot read {}: {}", path, e));
                        Some(Dialog::Attach(input))
                    }
                }
            }
            _ => {
                edit_text(&mut input, key);
                Some(Dialog::Attach(input))
            }
        },
    }
}

/// Validation errors are already shown inline by the dialog.
fn keep_open_on_error(app: &mut App, context: &str, err: &ChatError) {
    if !err.is_validation() {
        app.notify_error(context, err);
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    line.zeroize();
    Ok(value)
}

async fn register_interactive(chat: &ChatClient, session: &Session) -> Result<()> {
    println!("\n  Create a roomchat account\n");
    let mut form = auth::RegisterForm {
        email: prompt("  Email: ")?,
        username: prompt("  Username: ")?,
        password: prompt("  Password: ")?,
        confirm_password: prompt("  Repeat password: ")?,
        avatar: None,
    };
    let avatar_path = prompt("  Avatar image path (optional): ")?;
    if !avatar_path.trim().is_empty() {
        form.avatar = Some(Attachment::from_path(std::path::Path::new(avatar_path.trim()))?);
    }
    match auth::register(chat, session, &form).await {
        Ok(user) => println!("\n  Welcome, {}! Run roomchat to start chatting.\n", user.username),
        Err(e) => eprintln!("\n  Registration failed: {}\n", e),
    }
    Ok(())
}

fn wait_for_key() {
    loop {
        if let Ok(true) = event::poll(std::time::Duration::from_millis(100)) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind == KeyEventKind::Press {
                    break;
                }
            }
        }
    }
}

fn print_help() {
    println!("roomchat - Terminal client for room-based chat servers");
    println!();
    println!("USAGE: roomchat [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --login <id>  Sign in as an existing user");
    println!("  --register    Create an account and sign in");
    println!("  --set-token   Store the server's API token securely");
    println!("  --logout      Clear the session and stored token");
    println!("  --help, -h    Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("  {}  Override api_base_url from config", config::API_URL_ENV);
    println!("  RUST_LOG          Log filter for roomchat.log");
    println!();
    println!("KEYBOARD SHORTCUTS:");
    println!("  Tab / Shift+Tab  Switch panels (Rooms → Messages → Input)");
    println!("  Up/Down or j/k   Navigate rooms / scroll messages");
    println!("  /                Search rooms by name");
    println!("  Enter            Send message / open room");
    println!("  n                New room");
    println!("  e / d            Edit / delete the open room");
    println!("  i                Invite members");
    println!("  p                Edit your profile");
    println!("  Ctrl+A / Ctrl+X  Attach / drop a file in the composer");
    println!("  o                Open the newest attachment");
    println!("  r                Refresh rooms / reload messages");
    println!("  x                Sign out");
    println!("  q                Quit");
    println!("  Ctrl+C           Force quit");
}
