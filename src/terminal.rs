use std::fmt::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::models::{mask_secret, AccountProfile};
use crate::presentation::{CardPosition, FormTarget, RenderState, ViewMode};

const DIVIDER: &str = "----------------------------------------";

pub fn render_text(view: &RenderState) -> String {
    let mut out = String::new();
    match view {
        RenderState::Empty => {
            out.push_str("No accounts configured.\n");
            out.push_str("Type `a` to add one.\n");
        }
        RenderState::List { accounts } => {
            out.push_str("Accounts\n");
            for (index, account) in accounts.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", index + 1, account.name);
            }
            out.push_str("a: add  e <n>: edit  d <n>: delete  s: back\n");
        }
        RenderState::Form { target, draft } => {
            let title = match target {
                FormTarget::New => "New account",
                FormTarget::Existing(_) => "Edit account",
            };
            let _ = writeln!(out, "{title}");
            let _ = writeln!(out, "  name:   {}", draft.name);
            let _ = writeln!(out, "  url:    {}", draft.endpoint_url);
            let _ = writeln!(out, "  cookie: {}", mask_secret(&draft.auth_cookie));
            let _ = writeln!(out, "  user:   {}", draft.user_id);
            out.push_str("set <name|url|cookie|user> <value>, save, cancel\n");
        }
        RenderState::Loading {
            account_name,
            position,
        } => {
            push_header(&mut out, account_name, *position);
            out.push_str("  Loading...\n");
        }
        RenderState::Error {
            account_name,
            message,
            position,
        } => {
            push_header(&mut out, account_name, *position);
            let _ = writeln!(out, "  Error: {message}");
        }
        RenderState::Data {
            account_name,
            used_today,
            balance,
            last_updated,
            position,
        } => {
            push_header(&mut out, account_name, *position);
            let _ = writeln!(out, "  Used today: {used_today}");
            let _ = writeln!(out, "  Balance:    {balance}");
            if let Some(last_updated) = last_updated {
                let _ = writeln!(out, "  Updated:    {last_updated}");
            }
        }
    }
    out
}

fn push_header(out: &mut String, account_name: &str, position: CardPosition) {
    let _ = writeln!(
        out,
        "[{}/{}] {account_name}",
        position.index + 1,
        position.total
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    ToggleSettings,
    Refresh,
    Add,
    Edit(usize),
    Delete(usize),
    Set(DraftField, String),
    Save,
    Cancel,
    Confirm,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Name,
    Url,
    Cookie,
    User,
}

/// Parses one input line. Account numbers are 1-based as shown in the list.
pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "n" | "next" => Command::Next,
        "p" | "prev" => Command::Previous,
        "s" | "settings" => Command::ToggleSettings,
        "r" | "refresh" => Command::Refresh,
        "a" | "add" => Command::Add,
        "e" | "edit" => Command::Edit(parse_position(rest)?),
        "d" | "delete" => Command::Delete(parse_position(rest)?),
        "save" => Command::Save,
        "cancel" => Command::Cancel,
        "y" | "yes" => Command::Confirm,
        "q" | "quit" => Command::Quit,
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let field = match field {
                "name" => DraftField::Name,
                "url" => DraftField::Url,
                "cookie" => DraftField::Cookie,
                "user" => DraftField::User,
                other => return Err(format!("unknown field `{other}`")),
            };
            Command::Set(field, value.trim_start().to_string())
        }
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(command)
}

fn parse_position(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(position) if position > 0 => Ok(position - 1),
        _ => Err(format!("expected an account number, got `{value}`")),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Interactive loop: reprints the view on every change and applies stdin commands.
pub async fn run_interactive(dashboard: Dashboard) -> Result<()> {
    let mut changes = dashboard.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_delete = None;
    print_view(&dashboard)?;

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let _ = changes.borrow_and_update();
                print_view(&dashboard)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        eprintln!("{message}");
                        continue;
                    }
                };
                match apply(&dashboard, command, &mut pending_delete) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(err) => eprintln!("error: {err}"),
                }
            }
        }
    }
    Ok(())
}

fn print_view(dashboard: &Dashboard) -> Result<()> {
    let view = dashboard.render()?;
    println!("{DIVIDER}");
    print!("{}", render_text(&view));
    Ok(())
}

/// Deleting takes two steps: `d <n>` in settings, then `y`. Any other command
/// drops a pending deletion.
fn apply(
    dashboard: &Dashboard,
    command: Command,
    pending_delete: &mut Option<AccountProfile>,
) -> Result<Flow> {
    let confirmed = pending_delete.take();
    match command {
        Command::Next => dashboard.next()?,
        Command::Previous => dashboard.previous()?,
        Command::ToggleSettings => {
            let mode = dashboard.toggle_settings()?;
            log::debug!("[terminal] switched to {mode:?} mode");
        }
        Command::Refresh => dashboard.refresh_now()?,
        Command::Add => dashboard.begin_add()?,
        Command::Edit(position) => {
            let Some(account) = dashboard.accounts()?.into_iter().nth(position) else {
                eprintln!("no account number {}", position + 1);
                return Ok(Flow::Continue);
            };
            dashboard.begin_edit(&account.id)?;
        }
        Command::Delete(position) => {
            let Some(account) = dashboard.accounts()?.into_iter().nth(position) else {
                eprintln!("no account number {}", position + 1);
                return Ok(Flow::Continue);
            };
            if dashboard.mode()? != ViewMode::Settings {
                eprintln!("open settings (s) to delete accounts");
                return Ok(Flow::Continue);
            }
            eprintln!("Delete {}? Type `y` to confirm.", account.name);
            *pending_delete = Some(account);
        }
        Command::Confirm => match confirmed {
            Some(account) => {
                dashboard.remove_account(&account.id)?;
                eprintln!("deleted {}", account.name);
            }
            None => eprintln!("nothing to confirm"),
        },
        Command::Set(field, value) => {
            let Some(mut session) = dashboard.editing()? else {
                eprintln!("no form is open");
                return Ok(Flow::Continue);
            };
            let draft = &mut session.draft;
            match field {
                DraftField::Name => draft.name = value,
                DraftField::Url => draft.endpoint_url = value,
                DraftField::Cookie => draft.auth_cookie = value,
                DraftField::User => draft.user_id = value,
            }
            dashboard.update_draft(session.draft)?;
        }
        Command::Save => {
            if let Some(account) = dashboard.save_form()? {
                eprintln!("saved {}", account.name);
            }
        }
        Command::Cancel => {
            dashboard.cancel_form()?;
        }
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}
