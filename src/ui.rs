use std::io;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tracing::warn;

use crate::backend::TaskBackend;
use crate::details::{row_values, RowValue};
use crate::errors::{Result, TaskboardError};
use crate::login::LoginFlow;
use crate::session::SessionStorage;
use crate::task::{Task, TaskStatus};
use crate::task_form::TaskForm;
use crate::tasks_view::{TasksView, TABLE_COLUMNS};
use crate::user::Credentials;

enum Screen {
    Login,
    Tasks(TasksView),
}

struct Popup {
    title: String,
    rows: Vec<RowValue>,
}

pub struct App {
    backend: Arc<dyn TaskBackend>,
    session: SessionStorage,
    screen: Screen,
    table_state: TableState,
    popup: Option<Popup>,
    message: String,
    app_version: String,
}

impl App {
    /// Starts on the task table when the session already holds a user.
    pub async fn new(
        backend: Arc<dyn TaskBackend>,
        session: SessionStorage,
        app_version: impl Into<String>,
    ) -> Self {
        let mut app = Self {
            backend,
            session,
            screen: Screen::Login,
            table_state: TableState::default(),
            popup: None,
            message: String::new(),
            app_version: app_version.into(),
        };
        app.open_tasks().await;
        app
    }

    async fn open_tasks(&mut self) {
        match TasksView::open(self.backend.clone(), &self.session).await {
            Ok(view) => {
                self.screen = Screen::Tasks(view);
                self.table_state.select(None);
                self.clamp_selection();
            }
            Err(TaskboardError::NotLoggedIn) => self.screen = Screen::Login,
            Err(e) => {
                self.report(e);
                self.screen = Screen::Login;
            }
        }
    }

    fn report(&mut self, e: TaskboardError) {
        warn!(error = %e, "action failed");
        self.message = e.to_string();
    }

    /// The highlighted row itself; ids alone can point at another row.
    fn selected_task(&self) -> Option<Task> {
        let Screen::Tasks(view) = &self.screen else {
            return None;
        };
        self.table_state
            .selected()
            .and_then(|i| view.table_data().get(i))
            .cloned()
    }

    fn row_count(&self) -> usize {
        match &self.screen {
            Screen::Tasks(view) => view.table_data().len(),
            Screen::Login => 0,
        }
    }

    fn select(&mut self, delta: isize) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.table_state.select(Some(next as usize));
    }

    fn clamp_selection(&mut self) {
        let len = self.row_count();
        let selected = match (len, self.table_state.selected()) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(i)) => Some(i.min(len - 1)),
        };
        self.table_state.select(selected);
    }

    /// Returns `false` when the user asked to quit.
    pub async fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.popup.is_some() {
            if matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                self.popup = None;
            }
            return true;
        }
        if matches!(self.screen, Screen::Login) {
            self.handle_login_key(code).await
        } else {
            self.handle_tasks_key(code).await
        }
    }

    async fn handle_login_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('l') | KeyCode::Enter => {
                let defaults = Credentials::default();
                let Some(email) = prompt("Email", &defaults.email) else {
                    return true;
                };
                let Some(password) = prompt("Password", &defaults.password) else {
                    return true;
                };
                let flow = LoginFlow::new(self.backend.clone());
                let credentials = Credentials::new(email, password);
                match flow.login(&mut self.session, &credentials).await {
                    Ok(Some(user)) => {
                        self.message = format!("{} logged in", user.user_name);
                        self.open_tasks().await;
                    }
                    Ok(None) => self.message = "No user matches those credentials".to_string(),
                    Err(e) => self.report(e),
                }
            }
            _ => {}
        }
        true
    }

    async fn handle_tasks_key(&mut self, code: KeyCode) -> bool {
        let selected = self.selected_task();
        let result = match (code, selected) {
            (KeyCode::Char('q'), _) => return false,
            (KeyCode::Up, _) => {
                self.select(-1);
                Ok(())
            }
            (KeyCode::Down, _) => {
                self.select(1);
                Ok(())
            }
            (KeyCode::Char('a'), _) => self.add_task().await,
            (KeyCode::Char('e'), Some(task)) => self.edit_task(&task).await,
            (KeyCode::Char('d'), Some(task)) => self.delete_task(task.task_id).await,
            (KeyCode::Left, Some(task)) => self.move_task(&task, -1).await,
            (KeyCode::Right, Some(task)) => self.move_task(&task, 1).await,
            (KeyCode::Enter, Some(task)) => self.show_details(&task),
            (KeyCode::Char('p'), _) => self.show_profile(),
            (KeyCode::Char('r'), _) => self.refresh().await,
            (KeyCode::Char('o'), _) => self.logout(),
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.report(e);
        }
        self.clamp_selection();
        true
    }

    async fn add_task(&mut self) -> Result<()> {
        let Screen::Tasks(view) = &mut self.screen else {
            return Ok(());
        };
        let mut form = view.add_form();
        match fill_form(&mut form) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                self.message = e;
                return Ok(());
            }
        }
        if view.submit(&form).await? {
            self.message = format!("Added \"{}\"", form.values.name);
            let last = self.row_count().saturating_sub(1);
            self.table_state.select(Some(last));
        }
        Ok(())
    }

    async fn edit_task(&mut self, task: &Task) -> Result<()> {
        let Screen::Tasks(view) = &mut self.screen else {
            return Ok(());
        };
        let mut form = view.edit_form_for(task);
        match fill_form(&mut form) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                self.message = e;
                return Ok(());
            }
        }
        if view.submit(&form).await? {
            self.message = format!("Updated \"{}\"", form.values.name);
        }
        Ok(())
    }

    async fn delete_task(&mut self, task_id: u32) -> Result<()> {
        let Screen::Tasks(view) = &mut self.screen else {
            return Ok(());
        };
        if view.delete(task_id).await? {
            self.message = format!("Deleted task #{task_id}");
        }
        Ok(())
    }

    async fn move_task(&mut self, task: &Task, direction: isize) -> Result<()> {
        let Screen::Tasks(view) = &mut self.screen else {
            return Ok(());
        };
        view.move_task_for(task, direction).await?;
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        if let Screen::Tasks(view) = &mut self.screen {
            view.refresh().await?;
        }
        Ok(())
    }

    fn show_details(&mut self, task: &Task) -> Result<()> {
        let popup = Popup {
            title: format!("Task #{}", task.task_id),
            rows: row_values(task, "rowData")?,
        };
        self.popup = Some(popup);
        Ok(())
    }

    fn show_profile(&mut self) -> Result<()> {
        let Screen::Tasks(view) = &self.screen else {
            return Ok(());
        };
        let popup = Popup {
            title: "Profile".to_string(),
            rows: row_values(view.user(), "user")?,
        };
        self.popup = Some(popup);
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        LoginFlow::logout(&mut self.session)?;
        self.screen = Screen::Login;
        self.table_state.select(None);
        self.message = "Logged out".to_string();
        Ok(())
    }
}

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key.code).await {
                return Ok(());
            }
        }
    }
}

fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(f.area());

    draw_navbar(f, chunks[0], app);
    match &app.screen {
        Screen::Login => draw_login(f, chunks[1]),
        Screen::Tasks(view) => draw_table(f, chunks[1], view, &mut app.table_state),
    }
    draw_footer(f, chunks[2], app);

    if let Some(popup) = &app.popup {
        draw_popup(f, popup);
    }
}

fn draw_navbar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        "taskboard",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    match &app.screen {
        Screen::Tasks(view) => {
            spans.push(Span::raw(format!("  {}  ", view.user().user_name)));
            for status in TaskStatus::ALL {
                spans.push(Span::styled(
                    format!("[{} {}] ", status, view.tasks_by_status(status).len()),
                    status_style(status),
                ));
            }
        }
        Screen::Login => spans.push(Span::raw("  not logged in")),
    }
    let navbar = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(navbar, area);
}

fn draw_login(f: &mut Frame, area: Rect) {
    let defaults = Credentials::default();
    let text = vec![
        Line::from(Span::styled("Login", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(format!("Press l to enter email and password (default {}).", defaults.email)),
        Line::from("Press q to quit."),
    ];
    let login = Paragraph::new(text).block(Block::default().title("Login").borders(Borders::ALL));
    f.render_widget(login, area);
}

fn draw_table(f: &mut Frame, area: Rect, view: &TasksView, state: &mut TableState) {
    let header = Row::new(TABLE_COLUMNS.iter().map(|c| Cell::from(*c)))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = view.table_data().iter().map(|t| {
        Row::new(vec![
            Cell::from(t.name.clone()),
            Cell::from(t.description.clone()),
            Cell::from(format_stamp(t.added)),
            Cell::from(format_stamp(t.updated)),
            Cell::from(Span::styled(t.status.as_str(), status_style(t.status))),
        ])
    });
    let widths = [
        Constraint::Percentage(20),
        Constraint::Percentage(35),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(6),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!("Tasks of {}", view.user().user_name))
                .borders(Borders::ALL),
        )
        .row_highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    f.render_stateful_widget(table, area, state);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let hints = match app.screen {
        Screen::Login => "l log in  q quit",
        Screen::Tasks(_) => {
            "a add  e edit  d delete  ←/→ move  enter details  p profile  r refresh  o logout  q quit"
        }
    };
    let text = vec![
        Line::from(vec![
            Span::raw(format!("© {} taskboard v{}  ", Local::now().year(), app.app_version)),
            Span::styled(app.message.clone(), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(hints),
    ];
    let footer = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

fn draw_popup(f: &mut Frame, popup: &Popup) {
    let area = centered(f.area(), 60, 60);
    let lines: Vec<Line> = popup
        .rows
        .iter()
        .map(|r| {
            Line::from(vec![
                Span::styled(format!("{}: ", r.key), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(r.value.clone()),
            ])
        })
        .collect();
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(popup.title.clone())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn status_style(status: TaskStatus) -> Style {
    match status {
        TaskStatus::Do => Style::default().fg(Color::White),
        TaskStatus::Doing => Style::default().fg(Color::Yellow),
        TaskStatus::Done => Style::default().fg(Color::Green),
    }
}

fn format_stamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Prompts for each form field; an empty answer keeps the current value.
/// `Ok(false)` when input was cut off, `Err` with the reason when an answer
/// is rejected.
fn fill_form(form: &mut TaskForm) -> std::result::Result<bool, String> {
    let title = form.title();
    let Some(name) = prompt(&format!("{title}: name"), &form.values.name) else {
        return Ok(false);
    };
    let Some(description) = prompt(&format!("{title}: description"), &form.values.description)
    else {
        return Ok(false);
    };
    let Some(status) = prompt(
        &format!("{title}: status (do/doing/done)"),
        form.values.status.as_str(),
    ) else {
        return Ok(false);
    };
    apply_answers(form, name, description, &status)?;
    Ok(true)
}

/// Leaves the form untouched if the status doesn't parse.
fn apply_answers(
    form: &mut TaskForm,
    name: String,
    description: String,
    status: &str,
) -> std::result::Result<(), String> {
    let status = status.parse::<TaskStatus>()?;
    form.values.name = name;
    form.values.description = description;
    form.values.status = status;
    Ok(())
}

fn prompt(message: &str, default: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{} [{}]", message, default);
    let mut input = String::new();
    let answer = if io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim();
        Some(if input.is_empty() { default } else { input }.to_string())
    } else {
        None
    };
    enable_raw_mode().ok();
    answer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::data;
    use crate::task_board::TaskBoard;
    use crate::user::UserStore;
    use ratatui::backend::TestBackend;

    async fn logged_in_app(dir: &tempfile::TempDir) -> App {
        let backend: Arc<dyn TaskBackend> = Arc::new(LocalBackend::new(
            UserStore::new(data::seed_users()),
            TaskBoard::new(data::seed_tasks()),
        ));
        let mut session = SessionStorage::open(dir.path().join("session.json")).unwrap();
        session.set_user(&data::seed_users()[0]).unwrap();
        App::new(backend, session, "0.1.0").await
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_renders_own_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = logged_in_app(&dir).await;
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Tasks of jonnygold"));
        assert!(text.contains("Groceries"));
        assert!(!text.contains("Tax return"));
        assert!(text.contains("taskboard v0.1.0"));
    }

    #[tokio::test]
    async fn test_navigation_and_popups() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = logged_in_app(&dir).await;
        assert_eq!(app.selected_task().map(|t| t.task_id), Some(1));

        assert!(app.handle_key(KeyCode::Down).await);
        assert_eq!(app.selected_task().map(|t| t.task_id), Some(2));

        assert!(app.handle_key(KeyCode::Enter).await);
        assert_eq!(app.popup.as_ref().unwrap().title, "Task #2");
        assert!(app.handle_key(KeyCode::Esc).await);
        assert!(app.popup.is_none());

        assert!(app.handle_key(KeyCode::Right).await);
        let Screen::Tasks(view) = &app.screen else {
            panic!("expected task screen");
        };
        assert_eq!(view.find(2).unwrap().status, TaskStatus::Done);

        assert!(app.handle_key(KeyCode::Char('p')).await);
        let rows = &app.popup.as_ref().unwrap().rows;
        assert_eq!(rows[0].value, "\"jonnygold\"");
        assert!(app.handle_key(KeyCode::Char('q')).await);

        assert!(!app.handle_key(KeyCode::Char('q')).await);
    }

    #[tokio::test]
    async fn test_logout_returns_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = logged_in_app(&dir).await;
        assert!(app.handle_key(KeyCode::Char('o')).await);
        assert!(matches!(app.screen, Screen::Login));
        assert!(app.session.user().is_none());
        assert!(app.selected_task().is_none());
    }

    #[tokio::test]
    async fn test_added_row_with_repeated_id_acts_on_itself() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = logged_in_app(&dir).await;
        let Screen::Tasks(view) = &mut app.screen else {
            panic!("expected task screen");
        };
        let mut form = view.add_form();
        form.values.name = "Pay rent".into();
        assert!(view.submit(&form).await.unwrap());
        assert_eq!(view.find(4).unwrap().name, "Dentist");

        app.clamp_selection();
        for _ in 0..3 {
            assert!(app.handle_key(KeyCode::Down).await);
        }
        let selected = app.selected_task().unwrap();
        assert_eq!((selected.task_id, selected.name.as_str()), (4, "Pay rent"));

        assert!(app.handle_key(KeyCode::Enter).await);
        let popup = app.popup.as_ref().unwrap();
        assert_eq!(popup.title, "Task #4");
        let name = popup.rows.iter().find(|r| r.key == "name").unwrap();
        assert_eq!(name.value, "\"Pay rent\"");
        assert!(app.handle_key(KeyCode::Esc).await);

        let Screen::Tasks(view) = &app.screen else {
            panic!("expected task screen");
        };
        let form = view.edit_form_for(&selected);
        assert_eq!(form.values.name, "Pay rent");
        assert_eq!(form.values.status, TaskStatus::Do);
    }

    #[test]
    fn test_rejected_status_keeps_form_and_reports() {
        let mut form = TaskForm::add("jonnygold");
        let err = apply_answers(&mut form, "Pay rent".into(), "June".into(), "later").unwrap_err();
        assert!(err.contains("later"));
        assert_eq!(form.values.name, "New Task");
        assert_eq!(form.values.status, TaskStatus::Do);

        apply_answers(&mut form, "Pay rent".into(), "June".into(), "Doing").unwrap();
        assert_eq!(form.values.name, "Pay rent");
        assert_eq!(form.values.status, TaskStatus::Doing);
    }
}
