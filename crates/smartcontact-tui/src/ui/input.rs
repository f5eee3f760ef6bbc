//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, FormFocus, Route, Screen};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return true;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return false;
    }

    match app.screen() {
        Screen::Loading => {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                app.state = AppState::ConfirmingQuit;
            }
        }
        Screen::Page(Route::Home) => handle_home_input(app, key).await,
        Screen::Page(Route::Dashboard) => handle_dashboard_input(app, key).await,
        Screen::Page(_) => handle_form_input(app, key).await,
    }
    false
}

async fn handle_home_input(app: &mut App, key: KeyEvent) {
    let signed_in = app.session.is_authenticated();
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('d') | KeyCode::Enter if signed_in => app.navigate(Route::Dashboard),
        KeyCode::Char('o') if signed_in => app.logout().await,
        KeyCode::Char('l') | KeyCode::Enter => app.navigate(Route::Login),
        KeyCode::Char('r') => app.navigate(Route::Register),
        // Protected; the guard sends anonymous users to login
        KeyCode::Char('d') => app.navigate(Route::Dashboard),
        _ => {}
    }
}

async fn handle_dashboard_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('h') | KeyCode::Esc => app.navigate(Route::Home),
        KeyCode::Char('t') => app.test_connection().await,
        KeyCode::Char('o') => app.logout().await,
        _ => {}
    }
}

async fn handle_form_input(app: &mut App, key: KeyEvent) {
    let Some(form) = app.form.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => app.navigate(Route::Home),
        KeyCode::Down | KeyCode::Tab => form.focus_next(),
        KeyCode::Up | KeyCode::BackTab => form.focus_prev(),
        KeyCode::Enter => match form.focus() {
            FormFocus::Link(i) => {
                if let Some(&(_, route)) = form.links.get(i) {
                    app.navigate(route);
                }
            }
            // Enter moves through the fields, submitting from the last one
            FormFocus::Field(i) if i + 1 < form.fields.len() => form.focus_next(),
            FormFocus::Field(_) | FormFocus::Button => {
                form.focus_button();
                app.submit().await;
            }
        },
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
}
