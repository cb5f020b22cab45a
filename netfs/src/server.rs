//! The serve loop: one engine, one TCP connection, one command at a time.

use std::io::{BufReader, ErrorKind};
use std::net::{TcpListener, TcpStream};

use anyhow::Result;
use blockfs::{BlockStorage, FileSys, FsError, Status};
use log::{debug, info, warn};

use crate::proto::{self, Request, Response};

pub struct Server<T: BlockStorage> {
    fs: FileSys<T>,
}

impl<T: BlockStorage> Server<T> {
    pub fn new(fs: FileSys<T>) -> Self {
        Server { fs }
    }

    /// Accepts a single client and serves it until it disconnects, then
    /// flushes the disk. Requests are totally ordered by their arrival on
    /// the one connection; there is no second client to race with.
    pub fn serve(&mut self, listener: &TcpListener) -> Result<()> {
        info!("Waiting for connection...");
        let (stream, peer) = listener.accept()?;
        info!("Client connected from {peer}");

        self.session(stream)?;
        self.fs.unmount()?;
        Ok(())
    }

    /// Runs the request/response loop over an established stream.
    pub fn session(&mut self, stream: TcpStream) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;

        loop {
            let frame = match proto::read_frame(&mut reader) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                    warn!("client vanished mid-request");
                    break;
                }
                Err(err) => return Err(err.into()),
            };

            let line = String::from_utf8_lossy(&frame);
            let (status, body) = match Request::parse(&line) {
                Some(request) => {
                    debug!("request: {request:?}");
                    self.dispatch(request)?;
                    (self.fs.take_status(), self.fs.take_response())
                }
                None => {
                    warn!("unrecognized request line {:?}", line.trim_end());
                    (Status::CommandNotFound, Vec::new())
                }
            };
            proto::write_frame(&mut writer, &Response::encode(status, &body))?;
        }

        info!("Client disconnected");
        Ok(())
    }

    fn dispatch(&mut self, request: Request) -> std::result::Result<(), FsError> {
        match request {
            Request::Mkdir(name) => self.fs.mkdir(&name),
            Request::Cd(name) => self.fs.cd(&name),
            Request::Home => {
                self.fs.home();
                Ok(())
            }
            Request::Rmdir(name) => self.fs.rmdir(&name),
            Request::Ls => self.fs.ls(),
            Request::Create(name) => self.fs.create(&name),
            Request::Append(name, data) => self.fs.append(&name, data.as_bytes()),
            Request::Cat(name) => self.fs.cat(&name),
            Request::Head(name, size) => self.fs.head(&name, size),
            Request::Rm(name) => self.fs.rm(&name),
            Request::Stat(name) => self.fs.stat(&name),
        }
    }
}
