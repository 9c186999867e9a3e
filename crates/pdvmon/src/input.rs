//! Keyboard input handling for the pdvmon board.
//!
//! Keys either change local state (selection, text editing) or produce an
//! [`Action`] that the main loop forwards to the session handle through
//! [`dispatch`].
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use pdvmon_core::{MediaState, QualityPreset, SlotId};
use pdvmon_session::{SessionError, SessionHandle};

use crate::app::{App, EditField};

// ============================================================================
// Event Types
// ============================================================================

/// Events driving the main loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input from the user.
    Key(KeyEvent),

    /// Terminal window resize event.
    Resize(u16, u16),

    /// The session changed something worth redrawing.
    SessionChanged,
}

// ============================================================================
// Action Types
// ============================================================================

/// Session commands requested by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    ConnectServer,
    DisconnectServer,
    Register(SlotId),
    StartFeed(SlotId),
    StopFeed(SlotId),
    ChangeQuality(SlotId, QualityPreset),
    DismissAlert(SlotId),
}

// ============================================================================
// Input Handler
// ============================================================================

/// Handles a keyboard event and returns what the main loop should do.
///
/// # Key Bindings
///
/// | Key            | Action                                   |
/// |----------------|------------------------------------------|
/// | `1`-`9`        | Select slot                              |
/// | `Tab`/`BackTab`| Next / previous slot                     |
/// | `s`            | Edit server address                      |
/// | `u`            | Edit selected slot's source URL          |
/// | `t`            | Edit selected slot's PDV address         |
/// | `c` / `d`      | Connect / disconnect the backend         |
/// | `r`            | Register the selected slot's PDV         |
/// | `v` / `x`      | Start / stop the selected slot's feed    |
/// | `Q`            | Cycle the selected slot's quality        |
/// | `a`            | Dismiss the selected slot's alert        |
/// | `q`, `Ctrl+C`  | Quit                                     |
///
/// While editing, printable keys go to the buffer, `Enter` commits and
/// `Esc` cancels.
#[must_use]
pub fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return Action::Quit;
    }

    if app.edit.is_some() {
        handle_edit_key(key, app);
        return Action::None;
    }

    let slot = app.selected;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit();
            Action::Quit
        }

        KeyCode::Char(c @ '1'..='9') => {
            if let Some(n) = c.to_digit(10) {
                app.select(n as u8);
            }
            Action::None
        }
        KeyCode::Tab | KeyCode::Right => {
            app.select_next();
            Action::None
        }
        KeyCode::BackTab | KeyCode::Left => {
            app.select_previous();
            Action::None
        }

        KeyCode::Char('s') => {
            app.begin_edit(EditField::Server);
            Action::None
        }
        KeyCode::Char('u') => {
            app.begin_edit(EditField::Source);
            Action::None
        }
        KeyCode::Char('t') => {
            app.begin_edit(EditField::Terminal);
            Action::None
        }

        KeyCode::Char('c') => Action::ConnectServer,
        KeyCode::Char('d') => Action::DisconnectServer,
        KeyCode::Char('r') => Action::Register(slot),
        KeyCode::Char('v') => Action::StartFeed(slot),
        KeyCode::Char('x') => Action::StopFeed(slot),
        KeyCode::Char('Q') => {
            if app.media_state(slot) == MediaState::Connected {
                Action::ChangeQuality(slot, app.cycle_quality())
            } else {
                app.notice = Some(format!("Camera {slot}: quality needs a connected feed"));
                Action::None
            }
        }
        KeyCode::Char('a') => Action::DismissAlert(slot),

        _ => Action::None,
    }
}

fn handle_edit_key(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Backspace => app.edit_backspace(),
        KeyCode::Char(c) => app.edit_push(c),
        _ => {}
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Forwards an action to the session.
///
/// # Errors
///
/// Returns the session's error for the command.
pub async fn dispatch(action: Action, handle: &SessionHandle) -> Result<(), SessionError> {
    debug!(?action, "Dispatching action");
    match action {
        Action::None | Action::Quit => Ok(()),
        Action::ConnectServer => handle.connect_server().await,
        Action::DisconnectServer => handle.disconnect_server().await,
        Action::Register(slot) => handle.register_terminal(slot).await,
        Action::StartFeed(slot) => handle.start_feed(slot).await,
        Action::StopFeed(slot) => handle.stop_feed(slot).await,
        Action::ChangeQuality(slot, preset) => handle.change_quality(slot, preset).await,
        Action::DismissAlert(slot) => handle.dismiss_alert(slot).await,
    }
}

// ============================================================================
// Tests
// ============================================================================
