use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{
    App, AppState, FormField, FormFocus, FormState, HealthStatus, Route, Screen, ToastVariant,
};

use super::styles;

/// Width of the visible part of an input box
const INPUT_WIDTH: usize = 28;

/// Width of the label column in forms
const LABEL_WIDTH: usize = 18;

const FORM_WIDTH: u16 = 56;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  SmartContact API";
    let who = match app.session.user() {
        Some(user) => format!("Signed in as {}", user.email),
        None => "Not signed in".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + who.chars().count() + 2),
        )),
        Span::styled(who, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.screen() {
        Screen::Loading => render_loading(frame, area),
        Screen::Page(Route::Home) => render_home(frame, app, area),
        Screen::Page(Route::Dashboard) => render_dashboard(frame, app, area),
        Screen::Page(route) => {
            if let Some(form) = app.form.as_ref() {
                render_form(frame, route, form, area);
            }
        }
    }
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let area = centered_rect_fixed(30, 3, area);
    let paragraph = Paragraph::new(Line::from(Span::styled(
        "  Loading session...",
        styles::muted_style(),
    )))
    .block(Block::default().borders(Borders::ALL).border_style(styles::border_style(false)));
    frame.render_widget(paragraph, area);
}

fn key_line(keys: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = vec![Span::raw("   ")];
    for (key, desc) in keys {
        spans.push(Span::styled(*key, styles::help_key_style()));
        spans.push(Span::styled(format!(" {}   ", desc), styles::muted_style()));
    }
    Line::from(spans)
}

fn render_home(frame: &mut Frame, app: &App, area: Rect) {
    let area = centered_rect_fixed(64, 12, area);

    let mut lines = vec![
        Line::from(Span::styled("   Smart Contact API", styles::title_style())),
        Line::from(""),
        Line::from(Span::raw(
            "   Manage your SmartContact account from the terminal.",
        )),
        Line::from(""),
    ];

    match app.session.user() {
        Some(user) => {
            lines.push(Line::from(vec![
                Span::raw("   Welcome back, "),
                Span::styled(user.name.clone(), styles::highlight_style()),
            ]));
            lines.push(Line::from(""));
            lines.push(key_line(&[("[d]", "Dashboard"), ("[o]", "Log out"), ("[q]", "Quit")]));
        }
        None => {
            lines.push(Line::from(Span::styled(
                "   Sign in or create an account to get started.",
                styles::muted_style(),
            )));
            lines.push(Line::from(""));
            lines.push(key_line(&[("[l]", "Sign in"), ("[r]", "Register"), ("[q]", "Quit")]));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let area = centered_rect_fixed(70, 14, area);

    let mut lines = Vec::new();
    if let Some(user) = app.session.user() {
        lines.push(Line::from(vec![
            Span::raw("  Welcome back, "),
            Span::styled(user.name.clone(), styles::highlight_style()),
        ]));
        lines.push(Line::from(""));
        lines.push(detail_line("Email", user.email.clone()));
        lines.push(detail_line("User ID", user.id.clone()));
    }
    lines.push(Line::from(""));
    lines.push(detail_line("API URL", app.api_url.clone()));
    lines.push(detail_line("Resolved", app.session.api().base_url().to_string()));

    let (status, style) = match &app.health {
        HealthStatus::Untested => ("not tested".to_string(), styles::muted_style()),
        HealthStatus::Connected => ("connected".to_string(), styles::success_style()),
        HealthStatus::Failed(message) => (message.clone(), styles::error_style()),
    };
    lines.push(Line::from(vec![
        Span::styled(format!("  {:<10}", "Backend"), styles::muted_style()),
        Span::styled(status, style),
    ]));
    lines.push(Line::from(""));
    lines.push(key_line(&[
        ("[t]", "Test connection"),
        ("[o]", "Log out"),
        ("[h]", "Home"),
        ("[q]", "Quit"),
    ]));

    let block = Block::default()
        .title(Span::styled(" Dashboard ", styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn detail_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", label), styles::muted_style()),
        Span::raw(value),
    ])
}

/// What an input box shows: secrets masked, long values scrolled to the end.
fn display_value(field: &FormField) -> String {
    let shown: String = if field.secret {
        "*".repeat(field.value.chars().count())
    } else {
        field.value.clone()
    };
    let len = shown.chars().count();
    shown.chars().skip(len.saturating_sub(INPUT_WIDTH)).collect()
}

fn render_form(frame: &mut Frame, route: Route, form: &FormState, area: Rect) {
    let errors = form.fields.iter().filter(|f| form.error(f.name).is_some()).count();
    let height = (form.fields.len() + errors + form.links.len() + 6) as u16;
    let area = centered_rect_fixed(FORM_WIDTH, height, area);

    frame.render_widget(Clear, area);

    let focus = form.focus();
    let mut lines = vec![Line::from("")];

    for (i, field) in form.fields.iter().enumerate() {
        let focused = focus == FormFocus::Field(i);
        let value_style = if focused {
            styles::selected_style()
        } else if field.read_only {
            styles::muted_style()
        } else {
            styles::input_style()
        };
        let cursor = if focused { "▌" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {:>width$}: [", field.label, width = LABEL_WIDTH),
                styles::muted_style(),
            ),
            Span::styled(
                format!("{:<width$}{}", display_value(field), cursor, width = INPUT_WIDTH),
                value_style,
            ),
            Span::styled("]", styles::muted_style()),
        ]));
        if let Some(error) = form.error(field.name) {
            lines.push(Line::from(Span::styled(
                format!("  {}", error),
                styles::error_style(),
            )));
        }
    }

    // Submit button
    lines.push(Line::from(""));
    let button_focused = focus == FormFocus::Button;
    let (label, style) = if button_focused {
        (format!(" ▶ {} ◀ ", form.submit_label), styles::selected_style())
    } else {
        (format!("   {}   ", form.submit_label), styles::input_style())
    };
    let pad = (FORM_WIDTH as usize).saturating_sub(label.chars().count() + 4) / 2;
    lines.push(Line::from(vec![
        Span::raw(format!("{}[", " ".repeat(pad))),
        Span::styled(label, style),
        Span::raw("]"),
    ]));

    lines.push(Line::from(""));
    for (i, (text, _)) in form.links.iter().enumerate() {
        let focused = focus == FormFocus::Link(i);
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(*text, styles::link_style(focused)),
        ]));
    }

    let block = Block::default()
        .title(Span::styled(format!(" {} ", route.title()), styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.toast {
        Some(toast) => {
            let style = match toast.variant {
                ToastVariant::Default => styles::success_style(),
                ToastVariant::Destructive => styles::error_style(),
            };
            Line::from(vec![
                Span::styled(format!(" {}", toast.title), style),
                Span::raw(format!("  {}", toast.description)),
            ])
        }
        None => {
            let hints = match app.screen() {
                Screen::Loading => " [q]uit",
                Screen::Page(Route::Home) | Screen::Page(Route::Dashboard) => " [q]uit",
                Screen::Page(_) => " [Tab] next field | [Enter] submit | [Esc] back",
            };
            Line::from(Span::styled(hints, styles::muted_style()))
        }
    };

    let paragraph = Paragraph::new(line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());

    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
