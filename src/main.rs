use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use crossbeam::channel::Receiver;
use structopt::StructOpt;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use autobard::command::{self, Command};
use autobard::{
    Config, InputBackend, Instrument, LogBackend, Performer, PlayerCommand, PlayerHandle,
    PlayerState, PlayerUpdate, PlaylistEntry, RecordingBackend, Result, Timeline, midi,
    spawn_player,
};

#[derive(Debug, StructOpt)]
#[structopt(name = "autobard", about = "Plays MIDI files on in-game instruments")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// Configuration file (RON). Defaults apply if it does not exist.
    #[structopt(short, long, parse(from_os_str), default_value = "autobard.ron")]
    config: PathBuf,

    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, StructOpt)]
enum Cmd {
    /// Play files in order, then keep taking commands from stdin.
    Play {
        #[structopt(short, long)]
        instrument: Option<String>,
        #[structopt(parse(from_os_str), required = true)]
        files: Vec<PathBuf>,
    },
    /// Check whether every note of each file is reachable.
    Check {
        #[structopt(short, long)]
        instrument: Option<String>,
        #[structopt(parse(from_os_str), required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the key presses a file would produce, without waiting.
    Simulate {
        #[structopt(short, long)]
        instrument: Option<String>,
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
    /// List available instruments.
    Instruments,
    /// Read commands from stdin.
    Console,
}

fn main() {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(opt) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    let config = Config::load_or_default(&opt.config)?;

    match opt.cmd {
        Cmd::Play { instrument, files } => {
            play(&config, LogBackend, instrument, files, spawn_stdin_reader())
        }
        Cmd::Check { instrument, files } => check(&config, instrument.as_deref(), &files),
        Cmd::Simulate { instrument, file } => {
            let performer = config.performer(instrument.as_deref())?;
            simulate(&performer, &file)
        }
        Cmd::Instruments => {
            list_instruments(&config);
            Ok(())
        }
        Cmd::Console => {
            println!("{}", command::USAGE);
            console(&config, spawn_player(LogBackend), spawn_stdin_reader(), false)
        }
    }
}

/// Plays `files` and returns once they are done. Returns at once if none of
/// them could be loaded.
fn play<B>(
    config: &Config,
    backend: B,
    instrument: Option<String>,
    files: Vec<PathBuf>,
    lines: Receiver<String>,
) -> Result<()>
where
    B: InputBackend + Send + 'static,
{
    let player = spawn_player(backend);
    if !dispatch(config, &player, Command::Play { instrument, files })? {
        player.shutdown();
        return Ok(());
    }
    console(config, player, lines, true)
}

/// Runs the command loop until `quit`, or until `lines` closes and the
/// player has nothing left. With `exit_when_idle` it also stops once the
/// playlist runs out, and expects a playlist to be queued already.
fn console(
    config: &Config,
    player: PlayerHandle,
    mut lines: Receiver<String>,
    exit_when_idle: bool,
) -> Result<()> {
    enum Input {
        Line(Option<String>),
        Update(Option<PlayerUpdate>),
    }

    let mut stdin_closed = false;
    // a playlist was handed over and the player has yet to report it done
    let mut awaiting_idle = exit_when_idle;

    loop {
        let input = crossbeam::select! {
            recv(lines) -> line => Input::Line(line.ok()),
            recv(player.update_rx) -> update => Input::Update(update.ok()),
        };

        match input {
            Input::Line(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(cmd) => match dispatch(config, &player, cmd) {
                        Ok(queued) => awaiting_idle |= queued,
                        Err(e) => eprintln!("{}", e),
                    },
                    Err(e) => eprintln!("{}", e),
                }
            }
            Input::Line(None) => {
                stdin_closed = true;
                lines = crossbeam::channel::never();
                if !awaiting_idle && player.state() == PlayerState::Idle {
                    break;
                }
            }
            Input::Update(Some(update)) => match update {
                PlayerUpdate::Started { title } => println!("playing {}", title),
                PlayerUpdate::Finished { title, report } => {
                    println!("finished {}: {}", title, report)
                }
                PlayerUpdate::Paused => println!("paused"),
                PlayerUpdate::Stopped => {
                    println!("stopped");
                    // a song still playing reports idle once it ends
                    awaiting_idle = player.state() == PlayerState::Playing;
                    if stdin_closed && !awaiting_idle {
                        break;
                    }
                }
                PlayerUpdate::Error { message } => eprintln!("{}", message),
                PlayerUpdate::Idle => {
                    awaiting_idle = false;
                    if exit_when_idle || stdin_closed {
                        break;
                    }
                }
            },
            Input::Update(None) => break,
        }
    }

    player.shutdown();
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam::channel::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Carries out one command. Returns whether a playlist was queued.
fn dispatch(config: &Config, player: &PlayerHandle, cmd: Command) -> Result<bool> {
    match cmd {
        Command::Play { instrument, files } => {
            let performer = config.performer(instrument.as_deref())?;
            let mut entries = Vec::new();
            for file in &files {
                match load(performer.instrument(), file) {
                    Ok(timeline) => entries.push(PlaylistEntry {
                        title: title(file),
                        timeline,
                    }),
                    Err(e) => eprintln!("{}", e),
                }
            }
            if entries.is_empty() {
                return Ok(false);
            }
            player.send(PlayerCommand::Play {
                performer: Arc::new(performer),
                entries,
            });
            return Ok(true);
        }
        Command::CanPlay { instrument, files } => check(config, instrument.as_deref(), &files)?,
        Command::Pause => player.send(PlayerCommand::Pause),
        Command::Resume => player.send(PlayerCommand::Resume),
        Command::Stop => player.send(PlayerCommand::Stop),
        Command::Next => player.send(PlayerCommand::Next),
        Command::Prev => player.send(PlayerCommand::Prev),
        Command::Instruments => list_instruments(config),
        Command::Help => println!("{}", command::USAGE),
        Command::Quit => player.send(PlayerCommand::Quit),
    }
    Ok(false)
}

fn title(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

/// Loads a file and warns about notes the instrument will skip.
fn load(instrument: &Instrument, file: &Path) -> Result<Timeline> {
    let timeline = midi::load_timeline(file)?;
    if !instrument.can_play(&timeline) {
        warn!(
            file = %file.display(),
            instrument = instrument.name(),
            missing = ?instrument.unplayable_pitches(&timeline),
            "some notes are out of range and will be skipped"
        );
    }
    Ok(timeline)
}

fn check(config: &Config, instrument: Option<&str>, files: &[PathBuf]) -> Result<()> {
    let instrument = config.catalog().find(instrument.unwrap_or(&config.default_instrument))?;

    for file in files {
        match midi::load_timeline(file) {
            Ok(timeline) if instrument.can_play(&timeline) => {
                println!("{}: playable on {}", file.display(), instrument.name())
            }
            Ok(timeline) => println!(
                "{}: not playable on {}, missing pitches {:?}",
                file.display(),
                instrument.name(),
                instrument.unplayable_pitches(&timeline)
            ),
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

fn simulate(performer: &Performer, file: &Path) -> Result<()> {
    let timeline = load(performer.instrument(), file)?;
    let backend = RecordingBackend::new();
    let report = performer.play(&timeline, &backend)?;

    for action in backend.actions() {
        println!("{}", action);
    }
    println!("{} ({}ms)", report, backend.elapsed_ms());
    Ok(())
}

fn list_instruments(config: &Config) {
    for spec in config.catalog().specs() {
        match spec.build() {
            Ok(inst) => println!(
                "{:<24} pitches {:>3}-{:<3} {} keybars{}",
                inst.name(),
                inst.lowest_pitch(),
                inst.highest_pitch(),
                inst.keybars().len(),
                if inst.can_hold() { ", holds notes" } else { "" }
            ),
            Err(e) => println!("{:<24} invalid: {}", spec.name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::Sender;
    use std::time::Duration;

    fn closed_input(lines: &[&str]) -> Receiver<String> {
        let (tx, rx): (Sender<String>, _) = crossbeam::channel::unbounded();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        rx
    }

    fn returns_promptly<F>(run: F)
    where
        F: FnOnce(&Config) -> Result<()> + Send + 'static,
    {
        let (done_tx, done_rx) = crossbeam::channel::bounded(1);
        std::thread::spawn(move || {
            let _ = done_tx.send(run(&Config::default()).is_ok());
        });
        let ok = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("still waiting for input");
        assert!(ok);
    }

    #[test]
    fn play_with_nothing_loadable_exits() {
        returns_promptly(|config| {
            play(
                config,
                RecordingBackend::new(),
                None,
                vec![PathBuf::from("/nonexistent/song.mid")],
                closed_input(&[]),
            )
        });
    }

    #[test]
    fn console_exits_when_input_closes() {
        returns_promptly(|config| {
            console(config, spawn_player(RecordingBackend::new()), closed_input(&[]), false)
        });
    }

    #[test]
    fn failed_play_command_does_not_keep_console_open() {
        returns_promptly(|config| {
            let lines = closed_input(&["play /nonexistent/song.mid"]);
            console(config, spawn_player(RecordingBackend::new()), lines, false)
        });
    }

    #[test]
    fn dispatch_reports_nothing_queued_for_missing_files() {
        let player = spawn_player(RecordingBackend::new());
        let cmd = Command::Play {
            instrument: None,
            files: vec![PathBuf::from("/nonexistent/song.mid")],
        };
        assert!(!dispatch(&Config::default(), &player, cmd).unwrap());
        assert!(!dispatch(&Config::default(), &player, Command::Pause).unwrap());
        player.shutdown();
    }
}
