//! Interactive menu loop.
//!
//! Each action maps to one core operation. Input mistakes are printed and the
//! menu is shown again; only the exit action (or end of input) leaves the loop.

use crate::display;
use lift_core::config::DisplayConfig;
use lift_core::service;
use lift_core::{Error, Result, Store, User, UserId};
use std::io::{self, Write};

const MENU_TEXT: &str = "
Select from the following options:
    1) Start new session
    2) Add sets to active session
    3) View active session
    4) View exercise stats
    5) List sessions
    6) End active session
    7) Exit
> ";

/// Print `message` and read one line; `None` once stdin is exhausted
pub fn prompt(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Ask until the answer is y or n; end of input counts as `default`
pub fn prompt_yes_no(message: &str, default: bool) -> Result<bool> {
    let mut message = message;
    loop {
        match prompt(message)?.map(|a| a.to_lowercase()).as_deref() {
            Some("y") => return Ok(true),
            Some("n") => return Ok(false),
            None => return Ok(default),
            Some(_) => message = "y/n: ",
        }
    }
}

/// Ask for a username until a non-blank one is entered
pub fn login_interactive(store: &mut Store) -> Result<Option<User>> {
    loop {
        let Some(raw) = prompt("Enter username: ")? else {
            return Ok(None);
        };
        match service::login(store, &raw) {
            Err(Error::InvalidUsername) => println!("Empty string not accepted."),
            other => return other.map(Some),
        }
    }
}

/// Run the menu until the user exits
pub fn run(store: &mut Store, username: Option<&str>, display: &DisplayConfig) -> Result<()> {
    let user = match username {
        Some(name) => service::login(store, name)?,
        None => match login_interactive(store)? {
            Some(user) => user,
            None => return Ok(()),
        },
    };
    println!("Logged in as: {}; user id: {}", user.username, user.id);

    let unit = display.weight_unit.as_str();
    loop {
        let Some(choice) = menu_choice()? else {
            break;
        };

        let outcome = match choice {
            1 => start_session(store, user.id),
            2 => add_sets(store, user.id, unit),
            3 => view_active_session(store, user.id, unit),
            4 => view_stats(store, user.id, unit),
            5 => service::list_sessions(store, user.id).map(|s| display::sessions(&s)),
            6 => service::end_active_session(store, user.id).map(|e| display::ended(e.as_ref())),
            _ => {
                if closeout(store, user.id)? {
                    break;
                }
                Ok(())
            }
        };
        report(outcome)?;
    }

    Ok(())
}

/// Print errors the user can act on; propagate the rest
fn report(outcome: Result<()>) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(e) if e.is_recoverable() => {
            println!("{}", e);
            Ok(())
        }
        Err(e @ Error::StorageConstraintViolation(_)) => {
            tracing::warn!("Write rolled back: {}", e);
            println!("{}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn menu_choice() -> Result<Option<u8>> {
    loop {
        let Some(choice) = prompt(MENU_TEXT)? else {
            return Ok(None);
        };
        match choice.parse::<u8>() {
            Ok(n @ 1..=7) => return Ok(Some(n)),
            _ => println!("Choice must be 1-7."),
        }
    }
}

fn start_session(store: &mut Store, user_id: UserId) -> Result<()> {
    let notes = prompt("Session notes (optional): ")?.unwrap_or_default();
    let started = service::start_session(store, user_id, Some(&notes))?;
    display::started(&started);
    Ok(())
}

fn add_sets(store: &mut Store, user_id: UserId, unit: &str) -> Result<()> {
    if service::active_session(store, user_id)?.is_none() {
        return Err(Error::NoActiveSession);
    }

    let Some(raw) = prompt("Enter sets (e.g., bench press: 135x5, 155x3): ")? else {
        return Ok(());
    };

    let added = service::add_sets_from_entry(store, user_id, &raw, |exercise, weight| {
        ask_one_rep_max(exercise, weight, unit)
    })?;
    display::added(&added);
    Ok(())
}

/// 1RM confirmation used by both the menu and `add --one-rm ask`
pub fn ask_one_rep_max(exercise: &str, weight: f64, unit: &str) -> bool {
    let question = format!(
        "Mark {} at {} {} as tested 1RM? (y/n): ",
        exercise, weight, unit
    );
    prompt_yes_no(&question, false).unwrap_or_else(|e| {
        tracing::warn!("Could not read 1RM answer: {}", e);
        false
    })
}

fn view_active_session(store: &mut Store, user_id: UserId, unit: &str) -> Result<()> {
    match service::current_session_sets(store, user_id)? {
        Some((session_id, sets)) => display::session_sets(session_id, &sets, unit),
        None => println!("No active session."),
    }
    Ok(())
}

fn view_stats(store: &mut Store, user_id: UserId, unit: &str) -> Result<()> {
    let exercise = prompt("Exercise to view stats for: ")?.unwrap_or_default();
    if exercise.is_empty() {
        println!("No exercise provided.");
        return Ok(());
    }

    let stats = lift_core::exercise_stats(store.conn(), user_id, &exercise)?;
    display::stats(&stats, unit);
    Ok(())
}

/// Offer to end the active session, then confirm quitting
fn closeout(store: &mut Store, user_id: UserId) -> Result<bool> {
    if service::active_session(store, user_id)?.is_some() {
        if prompt_yes_no("End active session before exiting? (y/n): ", false)? {
            let ended = service::end_active_session(store, user_id)?;
            display::ended(ended.as_ref());
        } else {
            println!("Session not ended.");
        }
    }

    if prompt_yes_no("Are you sure you want to quit? (y/n): ", true)? {
        println!("Goodbye!");
        Ok(true)
    } else {
        Ok(false)
    }
}
