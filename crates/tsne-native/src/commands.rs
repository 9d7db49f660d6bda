use anyhow::{bail, Context, Result};
use glam::Vec2;
use std::time::Duration;

/// One line of driver input. Every command is followed by a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Pointer position in window pixels.
    Move(Vec2),
    Query(String),
    Clear,
    Next,
    Prev,
    /// Report the most recently played clip.
    Open,
    Wait(Duration),
    Status,
    Quit,
}

/// Parse a command line; blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let cmd = match word {
        "move" | "m" => {
            let mut it = rest.split_whitespace().map(str::parse::<f32>);
            match (it.next(), it.next()) {
                (Some(Ok(x)), Some(Ok(y))) => Command::Move(Vec2::new(x, y)),
                _ => bail!("usage: move <x> <y>"),
            }
        }
        // inner spaces are part of the query
        "query" | "q" => Command::Query(rest.to_owned()),
        "clear" => Command::Clear,
        "next" => Command::Next,
        "prev" => Command::Prev,
        "open" => Command::Open,
        "wait" => {
            let ms: u64 = rest.parse().context("usage: wait <ms>")?;
            Command::Wait(Duration::from_millis(ms))
        }
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command {other:?}"),
    };
    Ok(Some(cmd))
}
