mod core_cli;

use crate::core_cli::Cli;
use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use rouilleftpc::{Config, FtpcError, GetMode, PutMode, Session, TransferType};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Initialize the logger with a custom format
    let default_level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();

    // Load configuration from the TOML file, if one was given
    let mut config = if args.config.is_empty() {
        Config::default()
    } else {
        Config::load_from_file(&args.config).map_err(anyhow::Error::msg)?
    };
    if args.port != rouilleftpc::constants::DEFAULT_FTP_PORT {
        config.client.port = args.port;
    }

    let mut session = Session::connect(&args.host, config.client)
        .await
        .with_context(|| format!("Failed to connect to {}", args.host))?;
    println!("{}", session.reply_text().trim_end());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Some(user) = args.user.as_deref() {
        let pass = prompt(&mut lines, "Password: ").await?;
        if let Err(e) = session.login(user, &pass).await {
            eprintln!("Login failed: {}", e);
        }
    }

    run_shell(&mut session, &mut lines).await?;
    session.quit().await.ok();
    Ok(())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> Result<String> {
    print!("{}", text);
    std::io::stdout().flush()?;
    let line = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
        .unwrap_or_default();
    Ok(line.trim().to_string())
}

async fn run_shell(session: &mut Session, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
    loop {
        print!("ftpc> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = tokens.split_first() else {
            continue;
        };

        if verb == "quit" || verb == "exit" {
            return Ok(());
        }
        match dispatch(session, verb, args, lines).await {
            Ok(()) => {}
            Err(FtpcError::ServiceClosing) => {
                eprintln!("Server closed the connection");
                return Ok(());
            }
            Err(e) => eprintln!("{}", e),
        }
    }
}

async fn dispatch(
    session: &mut Session,
    verb: &str,
    args: &[&str],
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<(), FtpcError> {
    match verb {
        "login" => {
            let user = match args.first() {
                Some(u) => u.to_string(),
                None => prompt(lines, "User: ")
                    .await
                    .map_err(|e| FtpcError::Transport(e.to_string()))?,
            };
            let pass = prompt(lines, "Password: ")
                .await
                .map_err(|e| FtpcError::Transport(e.to_string()))?;
            session.login(&user, &pass).await?;
        }
        "anonymous" => session.login_anonymous().await?,
        "cd" => {
            let path = args.first().ok_or(FtpcError::Protocol(String::from(
                "usage: cd <directory>",
            )))?;
            session.chdir(path).await?;
        }
        "up" => session.cdup().await?,
        "pwd" => println!("{}", session.pwd().await?),
        "ls" => {
            let listing = session.list_directory(args.first().copied(), true).await?;
            print!("{}", listing);
        }
        "mkdir" => {
            let path = usage(args, "mkdir <directory>")?;
            session.mkdir(path).await?;
        }
        "rmdir" => {
            let path = usage(args, "rmdir <directory>")?;
            session.rmdir(path).await?;
        }
        "rm" => {
            let path = usage(args, "rm <file>")?;
            session.unlink(path).await?;
        }
        "rename" => {
            let [from, to] = args else {
                return Err(FtpcError::Protocol(String::from("usage: rename <from> <to>")));
            };
            session.rename(from, to).await?;
        }
        "chmod" => {
            let [mode, path] = args else {
                return Err(FtpcError::Protocol(String::from("usage: chmod <mode> <file>")));
            };
            session.chmod(path, mode).await?;
        }
        "size" => {
            let path = usage(args, "size <file>")?;
            println!("{}", session.filesize(path).await?);
        }
        "time" => {
            let path = usage(args, "time <file>")?;
            println!("{}", session.filetime(path).await?);
        }
        "idle" => {
            let seconds = match args.first() {
                Some(s) => Some(s.parse::<u32>().map_err(|_| {
                    FtpcError::Protocol(String::from("usage: idle [<seconds>]"))
                })?),
                None => None,
            };
            println!("{}", session.idle(seconds).await?);
        }
        "get" => {
            let (ty, mode, rest) = transfer_flags(args, GetMode::Normal, |f| match f {
                "-r" => Some(GetMode::Resume),
                _ => None,
            });
            let rname = rest
                .first()
                .ok_or(FtpcError::Protocol(String::from(
                    "usage: get [-a|-b] [-r] <remote> [<local>]",
                )))?;
            let bytes = session
                .get_file(rname, rest.get(1).copied(), mode, ty)
                .await?;
            println!("{} bytes received", bytes);
        }
        "put" => {
            let (ty, mode, rest) = transfer_flags(args, PutMode::Normal, |f| match f {
                "-r" => Some(PutMode::Resume),
                "-u" => Some(PutMode::Unique),
                _ => None,
            });
            let lname = rest
                .first()
                .ok_or(FtpcError::Protocol(String::from(
                    "usage: put [-a|-b] [-r|-u] <local> [<remote>]",
                )))?;
            let bytes = session
                .put_file(lname, rest.get(1).copied(), mode, ty)
                .await?;
            if let Some(name) = session.unique_remote_name() {
                println!("Stored as {}", name);
            }
            println!("{} bytes sent", bytes);
        }
        "noop" => session.noop().await?,
        "rhelp" => println!("{}", session.remote_help(args.first().copied()).await?),
        "quote" => {
            let line = args.join(" ");
            if line.is_empty() {
                return Err(FtpcError::Protocol(String::from("usage: quote <command>")));
            }
            println!("{}", session.raw_command(&line).await?);
        }
        "help" | "?" => print_help(),
        other => eprintln!("Unknown command: {} (try \"help\")", other),
    }
    Ok(())
}

fn usage<'a>(args: &[&'a str], usage: &str) -> Result<&'a str, FtpcError> {
    args.first()
        .copied()
        .ok_or_else(|| FtpcError::Protocol(format!("usage: {}", usage)))
}

/// Splits leading `-a`/`-b` type flags and a mode flag off a transfer
/// command line. The type defaults to binary.
fn transfer_flags<'a, M: Copy>(
    args: &'a [&'a str],
    default_mode: M,
    mode_flag: impl Fn(&str) -> Option<M>,
) -> (TransferType, M, &'a [&'a str]) {
    let mut ty = TransferType::Binary;
    let mut mode = default_mode;
    let mut rest = args;

    while let Some((&flag, tail)) = rest.split_first() {
        match flag {
            "-a" => ty = TransferType::Ascii,
            "-b" => ty = TransferType::Binary,
            f => match mode_flag(f) {
                Some(m) => mode = m,
                None => break,
            },
        }
        rest = tail;
    }
    (ty, mode, rest)
}

fn print_help() {
    println!(
        "\
Commands:
  login [<user>]          authenticate (prompts for the password)
  anonymous               anonymous login
  cd <dir>  up  pwd  ls [<dir>]
  mkdir <dir>  rmdir <dir>  rm <file>  rename <from> <to>
  chmod <mode> <file>  size <file>  time <file>  idle [<secs>]
  get [-a|-b] [-r] <remote> [<local>]
  put [-a|-b] [-r|-u] <local> [<remote>]
  noop  rhelp [<cmd>]  quote <raw command>
  help  quit"
    );
}
