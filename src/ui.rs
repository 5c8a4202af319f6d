use crate::{
    app::{App, DialogChoice, Focus, InputMode, InputPurpose, LogLevel, ToastLevel},
    plugins::{self, PluginEntry},
    starfield,
};
use anyhow::Result;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph},
};
use std::{collections::HashSet, io, time::{Duration, Instant}};

#[derive(Clone)]
struct Theme {
    accent: Color,
    accent_soft: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
    log_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(240, 176, 72),
            accent_soft: Color::Rgb(150, 110, 55),
            border: Color::Rgb(60, 66, 80),
            text: Color::Rgb(226, 228, 235),
            muted: Color::Rgb(128, 136, 150),
            success: Color::Rgb(110, 210, 170),
            warning: Color::Rgb(235, 190, 90),
            error: Color::Rgb(230, 95, 100),
            header_bg: Color::Rgb(18, 22, 32),
            log_bg: Color::Rgb(12, 15, 22),
        }
    }

    fn block(&self, title: String, focused: bool) -> Block<'static> {
        let border = if focused { self.accent_soft } else { self.border };
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: impl Into<String>, focused: bool) -> Block<'static> {
        self.block(title.into(), focused).padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(200))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    handle_key(app, key)?;
                }
                Event::Paste(text) => handle_paste(app, text),
                _ => {}
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    if app.dialog.is_some() {
        handle_dialog_mode(app, key);
        return Ok(());
    }

    let mode = std::mem::replace(&mut app.input_mode, InputMode::Normal);
    match mode {
        InputMode::Normal => {
            handle_normal_mode(app, key);
            Ok(())
        }
        InputMode::Editing {
            prompt,
            mut buffer,
            purpose,
        } => handle_input_mode(app, key, &mut buffer, purpose, prompt),
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H') => {
            app.dialog_choice_left();
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Tab => {
            app.dialog_choice_right();
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.dialog_set_choice(DialogChoice::Yes);
        }
        KeyCode::Char('n') | KeyCode::Char('N') => {
            app.dialog_set_choice(DialogChoice::No);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            app.dialog_confirm();
        }
        KeyCode::Esc => {
            app.dialog_set_choice(DialogChoice::No);
            app.dialog_confirm();
        }
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Char('f') | KeyCode::Char('F') => app.start_fix(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.request_create_reference(),
        KeyCode::Char('c') | KeyCode::Char('C') => app.check_now(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.open_plugins_file(),
        KeyCode::Char('e') | KeyCode::Char('E') => app.open_reference_file(),
        KeyCode::Char('a') | KeyCode::Char('A') => app.open_app_data_folder(),
        KeyCode::Char('g') | KeyCode::Char('G') => app.open_game_folder(),
        KeyCode::Char('s') | KeyCode::Char('S') => app.enter_settings(),
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_up(1),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_down(1),
        KeyCode::Home => app.scroll_up(usize::MAX),
        KeyCode::PageUp => app.scroll_log_up(3),
        KeyCode::PageDown => app.scroll_log_down(3),
        _ => {}
    }
}

fn handle_input_mode(
    app: &mut App,
    key: KeyEvent,
    buffer: &mut String,
    purpose: InputPurpose,
    prompt: String,
) -> Result<()> {
    let mut keep_editing = true;
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            keep_editing = false;
            app.status = "Settings unchanged.".to_string();
            app.show_toast("Settings cancelled", ToastLevel::Warn);
        }
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            keep_editing = false;
            if let Err(err) = app.handle_submit(purpose.clone(), buffer.clone()) {
                app.status = format!("Saving settings failed: {err}");
                app.log_error(format!("Saving settings failed: {err}"));
            }
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                if c == 'u' {
                    buffer.clear();
                }
            } else {
                buffer.push(c);
            }
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        _ => {}
    }

    if keep_editing {
        app.input_mode = InputMode::Editing {
            prompt,
            buffer: buffer.clone(),
            purpose,
        };
    }

    Ok(())
}

fn handle_paste(app: &mut App, text: String) {
    if let InputMode::Editing { buffer, .. } = &mut app.input_mode {
        let pasted = text.lines().next().unwrap_or_default().trim();
        buffer.push_str(strip_quotes(pasted));
    }
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| {
            value
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
        })
        .unwrap_or(value)
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let theme = Theme::new();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(8), Constraint::Length(11)])
        .split(area);

    frame.render_widget(header(app, &theme), chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(chunks[1]);

    let live_title = format!(
        "Plugins.txt ({})",
        app.files.live.as_ref().map_or(0, |_| app.files.live_entries().len())
    );
    draw_lines_panel(
        frame,
        &theme,
        body_chunks[0],
        live_title,
        app.files.live.as_deref(),
        "Plugins.txt not found.",
        app.plugins_scroll,
        app.focus == Focus::Plugins,
    );

    let reference_title = format!(
        "Reference ({})",
        app.files
            .reference
            .as_ref()
            .map_or(0, |_| app.files.reference_entries().len())
    );
    draw_lines_panel(
        frame,
        &theme,
        body_chunks[1],
        reference_title,
        app.files.reference.as_deref(),
        "No reference yet. Press r to create one.",
        app.reference_scroll,
        app.focus == Focus::Reference,
    );

    draw_preview_panel(frame, app, &theme, body_chunks[2]);

    let footer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(7)])
        .split(chunks[2]);

    let status_block = theme.panel("Status", false);
    let status_inner = status_block.inner(footer_chunks[0]);
    let status_style = if app.status.starts_with("ERROR") {
        Style::default().fg(theme.error)
    } else if app.monitor.changed_externally() {
        Style::default().fg(theme.warning)
    } else {
        Style::default().fg(theme.text)
    };
    let footer = Paragraph::new(status_bar_line(app, status_inner.width))
        .style(status_style)
        .block(status_block);
    frame.render_widget(footer, footer_chunks[0]);

    let log_area = footer_chunks[1];
    let log_block = theme.panel("Log", false).style(Style::default().bg(theme.log_bg));
    let log_inner = log_block.inner(log_area);
    let log_lines = build_log_lines(app, &theme, log_inner.height as usize);
    let log = Paragraph::new(log_lines)
        .style(Style::default().fg(theme.text).bg(theme.log_bg))
        .block(log_block);
    frame.render_widget(log, log_area);

    if app.dialog.is_some() {
        draw_dialog(frame, app, &theme);
    }
    draw_toast(frame, app, &theme, chunks[1]);
}

fn header(app: &App, theme: &Theme) -> Paragraph<'static> {
    let (config_label, config_color) = if app.config.is_valid() {
        ("valid", theme.success)
    } else {
        ("needs setup", theme.error)
    };
    let (reference_label, reference_color) = if app.ref_exists {
        ("present", theme.success)
    } else {
        ("missing", theme.warning)
    };
    let (monitor_label, monitor_color) = if let Some(operation) = app.busy {
        (operation.label().trim_end_matches("...").to_string(), theme.accent)
    } else if app.monitor.is_checking() {
        ("checking".to_string(), theme.accent)
    } else if !app.monitor.is_enabled() {
        ("off".to_string(), theme.muted)
    } else if app.monitor.changed_externally() {
        ("changed externally".to_string(), theme.warning)
    } else {
        (
            format!("in sync (every {}s)", app.monitor.interval().as_secs()),
            theme.success,
        )
    };

    Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "Load Order Keeper",
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(starfield::GAME_NAME, Style::default().fg(theme.text)),
            Span::raw("   "),
            Span::styled(
                format!("r: {}", app.reference_action_label()),
                Style::default().fg(theme.muted),
            ),
        ]),
        Line::from(vec![
            Span::styled("Config: ", Style::default().fg(theme.muted)),
            Span::styled(config_label, Style::default().fg(config_color)),
            Span::raw("   "),
            Span::styled("Reference: ", Style::default().fg(theme.muted)),
            Span::styled(reference_label, Style::default().fg(reference_color)),
            Span::raw("   "),
            Span::styled("Monitor: ", Style::default().fg(theme.muted)),
            Span::styled(
                monitor_label,
                Style::default().fg(monitor_color).add_modifier(Modifier::BOLD),
            ),
        ]),
    ])
    .style(Style::default().bg(theme.header_bg))
    .alignment(Alignment::Center)
}

#[allow(clippy::too_many_arguments)]
fn draw_lines_panel(
    frame: &mut Frame<'_>,
    theme: &Theme,
    area: Rect,
    title: String,
    lines: Option<&[String]>,
    empty_message: &'static str,
    scroll: usize,
    focused: bool,
) {
    let block = theme.panel(title, focused);
    let Some(lines) = lines else {
        let empty = Paragraph::new(empty_message)
            .style(Style::default().fg(theme.muted))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    };

    let styled: Vec<Line<'static>> = lines.iter().map(|line| raw_line(line, theme)).collect();
    let scroll = scroll.min(styled.len().saturating_sub(1));
    let paragraph = Paragraph::new(styled)
        .block(block)
        .scroll((scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

fn raw_line(line: &str, theme: &Theme) -> Line<'static> {
    if plugins::is_ignored_line(line) {
        return Line::from(Span::styled(line.to_string(), Style::default().fg(theme.muted)));
    }
    match plugins::parse_line(line) {
        Some(entry) if entry.enabled => Line::from(vec![
            Span::styled(
                plugins::ENABLED_MARKER.to_string(),
                Style::default().fg(theme.success).add_modifier(Modifier::BOLD),
            ),
            Span::styled(entry.name, Style::default().fg(theme.text)),
        ]),
        Some(entry) => Line::from(vec![
            Span::raw(" "),
            Span::styled(entry.name, Style::default().fg(theme.muted)),
        ]),
        None => Line::from(""),
    }
}

fn draw_preview_panel(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let focused = app.focus == Focus::Preview;
    let Some(preview) = &app.preview else {
        let message = app
            .view_error
            .clone()
            .unwrap_or_else(|| "Preview needs a valid configuration and both files.".to_string());
        let empty = Paragraph::new(message)
            .style(Style::default().fg(theme.muted))
            .block(theme.panel("Fix preview", focused))
            .alignment(Alignment::Center)
            .wrap(ratatui::widgets::Wrap { trim: true });
        frame.render_widget(empty, area);
        return;
    };

    let report = &preview.report;
    let title = format!(
        "Fix preview (+{} -{} ~{})",
        report.added, report.pruned, report.recased
    );
    let reference_keys: HashSet<String> = app
        .files
        .reference_entries()
        .iter()
        .map(PluginEntry::key)
        .collect();

    let lines: Vec<Line<'static>> = preview
        .order
        .iter()
        .map(|entry| {
            let novel = !reference_keys.contains(&entry.key());
            let (marker, color) = if novel {
                ("+ ", theme.accent)
            } else {
                ("  ", theme.muted)
            };
            Line::from(vec![
                Span::styled(marker, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(entry.to_line(), Style::default().fg(theme.text)),
            ])
        })
        .collect();
    let scroll = app.preview_scroll.min(lines.len().saturating_sub(1));
    let paragraph = Paragraph::new(lines)
        .block(theme.panel(title, focused))
        .scroll((scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

fn status_bar_line(app: &App, width: u16) -> String {
    let width = width as usize;
    let (left, right) = match &app.input_mode {
        InputMode::Normal => (format!("Status: {}", app.status), app.hint().to_string()),
        InputMode::Editing { prompt, buffer, .. } => (
            format!("{prompt}: {buffer}"),
            "Enter confirm | Esc cancel | Ctrl+U clear".to_string(),
        ),
    };

    let left_len = left.chars().count();
    let right_len = right.chars().count();
    if left_len + right_len < width {
        let gap = width - left_len - right_len;
        return format!("{left}{:gap$}{right}", "");
    }
    // The status text wins; the hint is cut from the right.
    let room = width.saturating_sub(left_len + 1);
    let hint: String = right.chars().take(room).collect();
    if hint.is_empty() {
        left.chars().take(width).collect()
    } else {
        format!("{left} {hint}")
    }
}

fn build_log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if height == 0 {
        return Vec::new();
    }
    if app.logs.is_empty() {
        return vec![Line::from(Span::styled(
            "Nothing logged yet.",
            Style::default().fg(theme.muted),
        ))];
    }

    let scroll = app.log_scroll.min(app.logs.len().saturating_sub(height));
    let skip = app.logs.len().saturating_sub(height + scroll);
    app.logs
        .iter()
        .skip(skip)
        .take(height)
        .map(|entry| {
            let (tag, color) = match entry.level {
                LogLevel::Info => ("info ", theme.success),
                LogLevel::Warn => ("warn ", theme.warning),
                LogLevel::Error => ("error", theme.error),
            };
            Line::from(vec![
                Span::styled(tag, Style::default().fg(color)),
                Span::styled(" | ", Style::default().fg(theme.border)),
                Span::raw(entry.message.clone()),
            ])
        })
        .collect()
}

fn centered(area: Rect, width: u16, height: u16, top: Option<u16>) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = match top {
        Some(offset) => area.y + offset.min(area.height - height),
        None => area.y + (area.height - height) / 2,
    };
    Rect::new(x, y, width, height)
}

fn popup_block(theme: &Theme, border: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.header_bg).fg(theme.text))
}

fn draw_dialog(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let button = |label: &'static str, selected: bool, color: Color| {
        if selected {
            Span::styled(
                format!("[ {label} ]"),
                Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!("  {label}  "), Style::default().fg(theme.muted))
        }
    };
    let yes = dialog.choice == DialogChoice::Yes;

    let mut lines = vec![
        Line::from(Span::styled(
            dialog.title.clone(),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(dialog.message.lines().map(|line| Line::from(line.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        button("Yes", yes, theme.accent),
        Span::raw("  "),
        button("No", !yes, theme.warning),
    ]));
    lines.push(Line::from(Span::styled(
        "y/n or arrows, Enter to confirm",
        Style::default().fg(theme.muted),
    )));

    let longest = lines.iter().map(Line::width).max().unwrap_or(0) as u16;
    let area = centered(
        frame.size(),
        (longest + 6).max(40),
        lines.len() as u16 + 2,
        None,
    );
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .block(popup_block(theme, theme.accent_soft))
            .alignment(Alignment::Center),
        area,
    );
}

fn render_toast(
    frame: &mut Frame<'_>,
    theme: &Theme,
    body_area: Rect,
    message: &str,
    level: ToastLevel,
) {
    let max_text = body_area.width.saturating_sub(8) as usize;
    let mut text: String = message.chars().take(max_text).collect();
    if text.len() < message.len() && max_text > 3 {
        text = text.chars().take(max_text - 3).collect::<String>() + "...";
    }
    let border = match level {
        ToastLevel::Info => theme.success,
        ToastLevel::Warn => theme.warning,
        ToastLevel::Error => theme.error,
    };

    let width = (text.chars().count() as u16 + 4).max(24);
    let area = centered(body_area, width, 3, Some(1));
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text)
            .block(popup_block(theme, border))
            .alignment(Alignment::Center),
        area,
    );
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    if app.dialog.is_some() {
        return;
    }
    if let Some(toast) = app
        .toast
        .as_ref()
        .filter(|toast| toast.expires_at > Instant::now())
    {
        render_toast(frame, theme, body_area, &toast.message, toast.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn strips_matching_quotes_only() {
        assert_eq!(strip_quotes("\"/games/Starfield\""), "/games/Starfield");
        assert_eq!(strip_quotes("'/games/Star field'"), "/games/Star field");
        assert_eq!(strip_quotes("\"/games/Starfield"), "\"/games/Starfield");
    }

    #[test]
    fn status_line_pads_hint_to_width() {
        let mut app = App::with_config(AppConfig::default());
        app.status = "Ready".to_string();
        let line = status_bar_line(&app, 60);
        assert_eq!(line.len(), 60);
        assert!(line.starts_with("Status: Ready"));
        assert!(line.ends_with(app.hint()));
    }

    #[test]
    fn paste_only_lands_in_editor() {
        let mut app = App::with_config(AppConfig::default());
        handle_paste(&mut app, "/tmp/ignored".to_string());
        assert_eq!(app.input_mode, InputMode::Normal);

        app.enter_settings();
        if let InputMode::Editing { buffer, .. } = &mut app.input_mode {
            buffer.clear();
        }
        handle_paste(&mut app, "\"/games/AppData\"\n".to_string());
        let InputMode::Editing { buffer, .. } = &app.input_mode else {
            panic!("expected editor");
        };
        assert_eq!(buffer, "/games/AppData");
    }

    #[test]
    fn log_view_shows_latest_entries() {
        let mut app = App::with_config(AppConfig::default());
        for index in 0..10 {
            app.log_info(format!("line {index}"));
        }
        let lines = build_log_lines(&app, &Theme::new(), 3);
        assert_eq!(lines.len(), 3);
        let last: String = lines[2].spans.iter().map(|span| span.content.as_ref()).collect();
        assert!(last.ends_with("line 9"));
        assert!(last.starts_with("info "));
    }
}
