//! Terminal input: line commands from stdin turned into walk state and
//! one-shot control events

use crate::scene::Walk;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Walk(Walk),
    Start,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "a" | "left" => Some(Command::Walk(Walk::Left)),
            "d" | "right" => Some(Command::Walk(Walk::Right)),
            "s" | "stop" => Some(Command::Walk(Walk::Idle)),
            "start" => Some(Command::Start),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Control events that fire once per command rather than being held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Quit,
}

/// Holds the walk direction between frames.
pub struct InputManager {
    walk: Walk,
}

impl InputManager {
    pub fn new() -> Self {
        Self { walk: Walk::Idle }
    }

    /// Applies one command. Walk changes are absorbed; control events are
    /// handed back to the caller.
    pub fn apply(&mut self, command: Command) -> Option<Control> {
        match command {
            Command::Walk(walk) => {
                if walk != self.walk {
                    debug!("Walk {:?} -> {:?}", self.walk, walk);
                }
                self.walk = walk;
                None
            }
            Command::Start => Some(Control::Start),
            Command::Quit => Some(Control::Quit),
        }
    }

    pub fn walk(&self) -> Walk {
        self.walk
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads stdin line by line on a background task. The channel closes at EOF.
pub fn spawn_stdin_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match Command::parse(&line) {
                        Some(command) => {
                            if tx.send(command).await.is_err() {
                                break;
                            }
                        }
                        None => warn!("Unknown command {:?} (try left/right/stop/start/quit)", line),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("left"), Some(Command::Walk(Walk::Left)));
        assert_eq!(Command::parse(" D \n"), Some(Command::Walk(Walk::Right)));
        assert_eq!(Command::parse("stop"), Some(Command::Walk(Walk::Idle)));
        assert_eq!(Command::parse("START"), Some(Command::Start));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("jump"), None);
    }

    #[test]
    fn test_walk_is_held_and_controls_pass_through() {
        let mut input = InputManager::new();
        assert_eq!(input.walk(), Walk::Idle);

        assert_eq!(input.apply(Command::Walk(Walk::Left)), None);
        assert_eq!(input.walk(), Walk::Left);

        assert_eq!(input.apply(Command::Start), Some(Control::Start));
        assert_eq!(input.walk(), Walk::Left);
        assert_eq!(input.apply(Command::Quit), Some(Control::Quit));
    }
}
