use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, Control, InputMode, Notice};
use crate::store::KeyValueStore;
use crate::view::{Row, View};

const NOTICE_WIDTH: u16 = 44;

pub fn run<S: KeyValueStore>(mut app: App<S>, tick_rate: Duration) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut last_tick = Instant::now();
    let res = loop {
        app.expire_notices(Instant::now());
        terminal.draw(|f| draw(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(&mut app, key.code) {
                        break Ok(());
                    }
                }
                // Terminal came back to the foreground: pick up whatever was
                // persisted meanwhile, possibly by another instance.
                Event::FocusGained => {
                    app.reload();
                    app.set_status("Reloaded");
                }
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    };

    cleanup_terminal(&mut terminal)?;
    res
}

/// Returns true when the user asked to quit.
fn handle_key<S: KeyValueStore>(app: &mut App<S>, code: KeyCode) -> bool {
    match app.mode {
        InputMode::Normal => match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('j') | KeyCode::Down => app.focus_next(),
            KeyCode::Char('k') | KeyCode::Up => app.focus_previous(),
            KeyCode::Tab
            | KeyCode::BackTab
            | KeyCode::Left
            | KeyCode::Right
            | KeyCode::Char('h')
            | KeyCode::Char('l') => app.switch_control(),
            KeyCode::Enter | KeyCode::Char(' ') => app.activate(),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_focused(),
            KeyCode::Char('a') | KeyCode::Char('n') => app.start_editing(),
            KeyCode::Char('r') => {
                app.reload();
                app.set_status("Reloaded");
            }
            _ => {}
        },
        InputMode::Editing => match code {
            KeyCode::Esc => app.cancel_editing(),
            KeyCode::Enter => app.submit_input(),
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => app.input.push(c),
            _ => {}
        },
    }

    false
}

fn draw<S: KeyValueStore>(f: &mut ratatui::Frame, app: &App<S>) {
    let size = f.area();
    let view = app.view();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(size);

    f.render_widget(render_header(&view), chunks[0]);

    if view.is_empty() {
        f.render_widget(render_empty_state(), chunks[1]);
    } else {
        let mut list_state = ListState::default();
        list_state.select(Some(app.focus.row));
        let list = render_list(&view, app.focus.row, app.focus.control);
        f.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    f.render_widget(render_footer(app), chunks[2]);

    if !app.notices().is_empty() {
        draw_notices(f, app.notices(), size);
    }
}

fn render_header(view: &View<'_>) -> Paragraph<'static> {
    let line = Line::from(vec![
        Span::styled("tasklist", Style::default().fg(Color::Cyan)),
        Span::raw("  |  "),
        Span::styled(view.stats.total_label(), Style::default().fg(Color::Yellow)),
        Span::raw("  |  "),
        Span::styled(
            view.stats.completed_label(),
            Style::default().fg(Color::Green),
        ),
    ]);
    Paragraph::new(line)
        .block(Block::default().title("Overview").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn render_empty_state() -> Paragraph<'static> {
    Paragraph::new("No tasks yet. Press 'a' to add one.")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title("Tasks").borders(Borders::ALL))
}

fn render_list<'a>(view: &View<'a>, focused: usize, control: Control) -> List<'a> {
    let items: Vec<ListItem> = view
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| render_row(row, (idx == focused).then_some(control)))
        .collect();

    List::new(items)
        .block(
            Block::default()
                .title("Tasks (j/k move ; Tab switch control ; Enter/Space activate ; a add ; d delete)")
                .borders(Borders::ALL),
        )
        .highlight_symbol("➤ ")
}

fn render_row<'a>(row: &Row<'a>, focused: Option<Control>) -> ListItem<'a> {
    let focus_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD | Modifier::REVERSED);
    let control_style = |c: Control| {
        if focused == Some(c) {
            focus_style
        } else {
            Style::default()
        }
    };

    let checkbox = if row.completed() { "[x]" } else { "[ ]" };
    let text_style = if row.completed() {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else if focused.is_some() {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    ListItem::new(Line::from(vec![
        Span::styled(checkbox, control_style(Control::Toggle)),
        Span::raw(" "),
        Span::styled(row.text(), text_style),
        Span::raw("  "),
        Span::styled("[del]", control_style(Control::Delete)),
    ]))
}

fn render_footer<S: KeyValueStore>(app: &App<S>) -> Paragraph<'_> {
    match app.mode {
        InputMode::Normal => {
            let msg = app
                .status
                .as_deref()
                .unwrap_or("q quit ; a add ; r reload");
            Paragraph::new(msg).block(Block::default().title("Normal").borders(Borders::ALL))
        }
        InputMode::Editing => {
            let line = Line::from(vec![
                Span::raw("New task: "),
                Span::styled(&app.input, Style::default().fg(Color::Yellow)),
                Span::raw("█"),
            ]);
            Paragraph::new(line).block(
                Block::default()
                    .title("Input (Enter to add / Esc to cancel)")
                    .borders(Borders::ALL),
            )
        }
    }
}

/// Fixed overlay in the top-right corner, drawn over everything else.
fn draw_notices(f: &mut ratatui::Frame, notices: &[Notice], area: Rect) {
    let lines: Vec<Line> = notices
        .iter()
        .map(|n| Line::from(n.message.as_str()))
        .collect();
    let width = NOTICE_WIDTH.min(area.width);
    let inner_width = width.saturating_sub(2).max(1) as usize;
    let wrapped: usize = notices
        .iter()
        .map(|n| n.message.chars().count().div_ceil(inner_width).max(1))
        .sum();
    let height = (wrapped as u16 + 2).min(area.height);
    let rect = Rect {
        x: area.x + area.width - width,
        y: area.y,
        width,
        height,
    };

    let style = Style::default().fg(Color::Red).bg(Color::Black);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines)
            .style(style)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Error").borders(Borders::ALL).style(style)),
        rect,
    );
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use ratatui::backend::TestBackend;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|line| line.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn keys_drive_the_dispatcher() {
        let mut app = App::new(MemoryStore::default());
        assert!(!handle_key(&mut app, KeyCode::Char('a')));
        for c in "buy bread".chars() {
            handle_key(&mut app, KeyCode::Char(c));
        }
        handle_key(&mut app, KeyCode::Enter);
        assert_eq!(app.tasks().len(), 1);
        assert_eq!(app.mode, InputMode::Normal);

        handle_key(&mut app, KeyCode::Enter);
        assert_eq!(app.tasks().completed_count(), 1);

        handle_key(&mut app, KeyCode::Tab);
        handle_key(&mut app, KeyCode::Char(' '));
        assert!(app.tasks().is_empty());

        assert!(handle_key(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn draws_empty_state_and_stats() {
        let app = App::new(MemoryStore::default());
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("No tasks yet"));
        assert!(text.contains("0 tasks"));
        assert!(text.contains("0 completed"));
    }

    #[test]
    fn draws_rows_and_notice_overlay() {
        let mut app = App::new(MemoryStore::default());
        app.dispatch(crate::app::Command::Add("<b>literal</b>".into()));
        app.raise_notice("Failed to save");
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("<b>literal</b>"));
        assert!(text.contains("1 task "));
        assert!(text.contains("Failed to save"));
    }
}
