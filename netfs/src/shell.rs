//! The client shell: reads commands from the user or a script, performs the
//! remote call and prints the reply.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::path::Path;

use anyhow::{bail, Context, Result};
use blockfs::Status;

use crate::proto::{self, Request, Response};

const PROMPT: &str = "NFS> ";

pub struct Shell {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

/// Client-side view of a command line: a request to send, a quit, or a
/// usage problem worth telling the user about. Empty lines are skipped.
enum Command {
    Call(Request),
    Quit,
    Invalid(String),
    Empty,
}

impl Shell {
    /// Connects to the server given as `server:port`.
    pub fn connect(addr: &str) -> Result<Shell> {
        let stream =
            TcpStream::connect(addr).with_context(|| format!("could not connect to {addr}"))?;
        Ok(Shell {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
        })
    }

    /// Prompts and executes until the user quits or stdin ends.
    pub fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        loop {
            print!("{PROMPT}");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            if self.execute(&line)? {
                break;
            }
        }
        Ok(())
    }

    /// Executes each line of a script, echoing it after the prompt.
    pub fn run_script(&mut self, path: &Path) -> Result<()> {
        let script = File::open(path).with_context(|| format!("could not open script {path:?}"))?;
        for line in BufReader::new(script).lines() {
            let line = line?;
            println!("{PROMPT}{line}");
            if self.execute(&line)? {
                break;
            }
        }
        Ok(())
    }

    /// Runs one command line. Returns `true` when the user asked to quit.
    fn execute(&mut self, line: &str) -> Result<bool> {
        match parse_command(line) {
            Command::Empty => Ok(false),
            Command::Quit => Ok(true),
            Command::Invalid(reason) => {
                eprintln!("Invalid command line: {reason}");
                Ok(false)
            }
            Command::Call(request) => {
                proto::write_frame(&mut self.writer, request.encode().as_bytes())?;
                let Some(frame) = proto::read_frame(&mut self.reader)? else {
                    bail!("server closed the connection");
                };
                self.print_response(&Response::decode(&frame)?)?;
                Ok(false)
            }
        }
    }

    fn print_response(&self, response: &Response) -> Result<()> {
        if let Some(message) = status_message(response.status) {
            eprintln!("{message}");
        }
        if !response.body.is_empty() {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&response.body)?;
            stdout.flush()?;
        }
        Ok(())
    }
}

/// Tokenizes and validates one command line, mirroring the arity table of
/// the wire protocol so mistakes are caught before anything is sent.
fn parse_command(line: &str) -> Command {
    let argv: Vec<&str> = line.split_whitespace().collect();
    match argv.as_slice() {
        [] => Command::Empty,
        ["quit"] => Command::Quit,
        ["head", _, size] if size.parse::<usize>().is_err() => {
            Command::Invalid(format!("{size} is not a valid number of bytes"))
        }
        _ => match Request::parse(line) {
            Some(request) => Command::Call(request),
            None => {
                let verb = argv[0];
                if matches!(
                    verb,
                    "ls" | "home"
                        | "quit"
                        | "mkdir"
                        | "cd"
                        | "rmdir"
                        | "create"
                        | "cat"
                        | "rm"
                        | "stat"
                        | "append"
                        | "head"
                ) {
                    Command::Invalid(format!("{verb} has improper number of arguments"))
                } else {
                    Command::Invalid(format!("{verb} is not a command"))
                }
            }
        },
    }
}

/// Human-readable diagnostic for each non-zero status code.
fn status_message(status: Status) -> Option<&'static str> {
    let message = match status {
        Status::Ok => return None,
        Status::FileNotDir => "File is not a directory!",
        Status::FileIsDir => "File is a directory!",
        Status::FileExists => "File exists!",
        Status::FileNotExists => "File does not exist!",
        Status::FileNameTooLong => "File name is too long!",
        Status::DiskFull => "Disk is full!",
        Status::DirFull => "Directory is full!",
        Status::DirNotEmpty => "Directory is not empty!",
        Status::AppendExceedsMaxSize => "Append exceeds maximum filesize!",
        Status::CommandNotFound => "Command not found!",
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_and_blank_lines_are_local() {
        assert!(matches!(parse_command("quit"), Command::Quit));
        assert!(matches!(parse_command("   "), Command::Empty));
    }

    #[test]
    fn arity_problems_get_usage_messages() {
        let Command::Invalid(reason) = parse_command("mkdir") else {
            panic!("expected a usage error");
        };
        assert_eq!(reason, "mkdir has improper number of arguments");

        let Command::Invalid(reason) = parse_command("head f twelve") else {
            panic!("expected a usage error");
        };
        assert_eq!(reason, "twelve is not a valid number of bytes");

        let Command::Invalid(reason) = parse_command("chmod f") else {
            panic!("expected a usage error");
        };
        assert_eq!(reason, "chmod is not a command");
    }

    #[test]
    fn well_formed_lines_become_requests() {
        assert!(matches!(
            parse_command("append f data"),
            Command::Call(Request::Append(..))
        ));
    }
}
