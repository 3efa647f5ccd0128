//! Console commands.
//!
//! A line is split into words shell-style: whitespace separates words, single
//! or double quotes group them, and a backslash escapes the next character.

use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play {
        instrument: Option<String>,
        files: Vec<PathBuf>,
    },
    CanPlay {
        instrument: Option<String>,
        files: Vec<PathBuf>,
    },
    Pause,
    Resume,
    Stop,
    Next,
    Prev,
    Instruments,
    Help,
    Quit,
}

pub const USAGE: &str = "\
commands:
  play [-i NAME] FILE...     queue MIDI files on an instrument
  canplay [-i NAME] FILE...  check that every note is reachable
  pause | resume             hold or continue the playlist
  stop                       clear the playlist
  next | prev                move through the playlist
  instruments                list instruments
  help                       show this text
  quit                       exit after the current song";

pub fn parse(line: &str) -> Result<Command> {
    let words = split(line)?;
    let (verb, args) = words
        .split_first()
        .ok_or_else(|| Error::Command("empty command".to_string()))?;

    let command = match verb.to_lowercase().as_str() {
        "play" => {
            let (instrument, files) = instrument_and_files(verb, args)?;
            Command::Play { instrument, files }
        }
        "canplay" => {
            let (instrument, files) = instrument_and_files(verb, args)?;
            Command::CanPlay { instrument, files }
        }
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "stop" => Command::Stop,
        "next" => Command::Next,
        "prev" => Command::Prev,
        "instruments" => Command::Instruments,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(Error::Command(format!("unknown command '{}'", other))),
    };

    let takes_args = matches!(command, Command::Play { .. } | Command::CanPlay { .. });
    if !takes_args && !args.is_empty() {
        return Err(Error::Command(format!("'{}' takes no arguments", verb)));
    }

    Ok(command)
}

fn instrument_and_files(verb: &str, args: &[String]) -> Result<(Option<String>, Vec<PathBuf>)> {
    let mut instrument = None;
    let mut files = Vec::new();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-i" | "--instrument" => {
                let name = args
                    .next()
                    .ok_or_else(|| Error::Command(format!("{} needs an instrument name", arg)))?;
                instrument = Some(name.clone());
            }
            _ => files.push(PathBuf::from(arg)),
        }
    }

    if files.is_empty() {
        return Err(Error::Command(format!("'{}' needs at least one file", verb)));
    }
    Ok((instrument, files))
}

/// Splits `line` into words.
pub fn split(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match (c, quote) {
            ('\\', _) => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| Error::Command("trailing backslash".to_string()))?;
                word.push(escaped);
                in_word = true;
            }
            (q, None) if q == '"' || q == '\'' => {
                quote = Some(q);
                in_word = true;
            }
            (q, Some(open)) if q == open => quote = None,
            (c, None) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (c, _) => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(Error::Command(format!("unterminated {} quote", q)));
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}
