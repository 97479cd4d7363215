//! Headless session runner.
//!
//! Starts one terminal session, pumps it until the child exits (or a
//! timeout fires), then prints the final screen. Exercises the whole
//! pipeline — PTY, ring, parser, grid — without a window.

use std::process;
use std::thread;
use std::time::{Duration, Instant};

use anko_term::{Session, SessionConfig, SessionState};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HELP: &str = r#"anko - headless terminal session runner

USAGE:
    anko [OPTIONS] [-- ARGS...]

OPTIONS:
    -s, --shell <PATH>      Program to run (default: $SHELL)
    -r, --rows <N>          Terminal rows (default: 25)
    -c, --cols <N>          Terminal columns (default: 80)
    -d, --dir <PATH>        Working directory
    -t, --timeout <SECS>    Give up after this many seconds (default: 30)
    -h, --help              Print help
    -V, --version           Print version

Arguments after `--` are passed to the program. The final screen is
printed on exit and the child's exit code is propagated.
"#;

struct CliOptions {
    config: SessionConfig,
    timeout: Duration,
}

fn next_value(args: &mut impl Iterator<Item = String>, name: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{name} requires a value"))
}

fn parse_args() -> Result<CliOptions, String> {
    let mut config = SessionConfig::default();
    let mut timeout = Duration::from_secs(30);
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{HELP}");
                process::exit(0);
            }
            "-V" | "--version" => {
                println!("anko {VERSION}");
                process::exit(0);
            }
            "-s" | "--shell" => config.shell = next_value(&mut args, "--shell")?,
            "-r" | "--rows" => {
                config.rows = next_value(&mut args, "--rows")?
                    .parse()
                    .map_err(|_| "invalid --rows value".to_string())?;
            }
            "-c" | "--cols" => {
                config.cols = next_value(&mut args, "--cols")?
                    .parse()
                    .map_err(|_| "invalid --cols value".to_string())?;
            }
            "-d" | "--dir" => config.working_dir = next_value(&mut args, "--dir")?,
            "-t" | "--timeout" => {
                let secs: u64 = next_value(&mut args, "--timeout")?
                    .parse()
                    .map_err(|_| "invalid --timeout value".to_string())?;
                timeout = Duration::from_secs(secs);
            }
            "--" => {
                let rest: Vec<String> = args.collect();
                config.args = rest.join(" ");
                break;
            }
            other => return Err(format!("unknown option: {other}")),
        }
    }

    Ok(CliOptions { config, timeout })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}\n\n{HELP}");
            process::exit(2);
        }
    };

    let mut session = Session::new(options.config);
    session.set_title_callback(|title| log::info!("title changed: {title}"));

    if let Err(e) = session.start() {
        eprintln!("session failed to start: {e}");
        process::exit(1);
    }
    log::info!("session started: {}", session.config().shell);

    let deadline = Instant::now() + options.timeout;
    loop {
        session.process_output();
        match session.state() {
            SessionState::Exited => break,
            _ if Instant::now() >= deadline => {
                log::warn!("timeout reached, stopping session");
                session.stop();
                break;
            }
            _ => thread::sleep(Duration::from_millis(10)),
        }
    }
    // Catch anything still in flight from the reader thread.
    session.process_output();

    if let Some(grid) = session.grid() {
        let text = grid.all_text();
        let trimmed = text.trim_end_matches('\n');
        if !trimmed.is_empty() {
            println!("{trimmed}");
        }
    }

    let code = session.exit_code();
    if code != 0 {
        eprintln!("process exited with code {code}");
    }
    process::exit(code as i32);
}
