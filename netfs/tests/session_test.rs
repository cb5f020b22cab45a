use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use blockfs::{BlockStorage, FileDisk, FileSys, Status, NUM_BLOCKS};
use netfs::proto::{self, Response};
use netfs::server::Server;

/// A scripted client talking to a real server over loopback, with the
/// server running against a temporary disk image in a background thread.
struct TestClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    server: Option<JoinHandle<()>>,
}

fn start_session() -> TestClient {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let tf = tempfile::NamedTempFile::new().unwrap();
        let disk = FileDisk::open_disk(tf.path(), NUM_BLOCKS).unwrap();
        let fs = FileSys::mount(disk).unwrap();
        Server::new(fs).serve(&listener).unwrap();
    });

    let stream = TcpStream::connect(addr).unwrap();
    TestClient {
        reader: BufReader::new(stream.try_clone().unwrap()),
        writer: stream,
        server: Some(server),
    }
}

impl TestClient {
    fn send(&mut self, line: &str) -> Response {
        proto::write_frame(&mut self.writer, format!("{line}\r\n").as_bytes()).unwrap();
        let frame = proto::read_frame(&mut self.reader)
            .unwrap()
            .expect("server hung up");
        Response::decode(&frame).unwrap()
    }

    fn send_ok(&mut self, line: &str) -> Vec<u8> {
        let response = self.send(line);
        assert_eq!(response.status, Status::Ok, "unexpected failure for {line:?}");
        response.body
    }

    /// Hangs up and waits for the server to wind down cleanly.
    fn finish(mut self) {
        drop(self.writer);
        drop(self.reader);
        self.server.take().unwrap().join().unwrap();
    }
}

#[test]
fn create_append_head_stat_over_the_wire() {
    let mut client = start_session();

    assert!(client.send_ok("mkdir a").is_empty());
    assert_eq!(client.send_ok("ls"), b"a/\n");

    client.send_ok("create f");
    client.send_ok("append f hello");
    assert_eq!(client.send_ok("head f 4"), b"hell\n");
    assert_eq!(client.send_ok("cat f"), b"hello\n");

    let stat = String::from_utf8(client.send_ok("stat f")).unwrap();
    assert!(stat.contains("Bytes in files: 5\n"));

    client.finish();
}

#[test]
fn the_cursor_follows_cd_and_home() {
    let mut client = start_session();

    client.send_ok("mkdir a");
    client.send_ok("cd a");
    client.send_ok("create g");
    client.send_ok("append g x");
    client.send_ok("home");
    assert_eq!(client.send_ok("ls"), b"a/\n");
    client.send_ok("cd a");
    assert_eq!(client.send_ok("ls"), b"g\n");

    client.finish();
}

#[test]
fn failures_travel_back_as_status_codes() {
    let mut client = start_session();

    client.send_ok("mkdir a");
    client.send_ok("cd a");
    client.send_ok("create g");
    client.send_ok("home");

    let response = client.send("rmdir a");
    assert_eq!(response.status, Status::DirNotEmpty);
    assert_eq!(response.status.code(), 507);
    assert!(response.body.is_empty());

    client.send_ok("create f");
    client.send_ok("rm f");
    let response = client.send("cat f");
    assert_eq!(response.status, Status::FileNotExists);

    client.finish();
}

#[test]
fn junk_requests_get_command_not_found() {
    let mut client = start_session();

    for line in ["chmod f", "mkdir", "mkdir a b", "head f lots", ""] {
        let response = client.send(line);
        assert_eq!(response.status, Status::CommandNotFound, "for {line:?}");
        assert!(response.body.is_empty());
    }

    // The session is still usable afterwards.
    client.send_ok("mkdir a");

    client.finish();
}

#[test]
fn raw_response_bytes_follow_the_frame_layout() {
    let mut client = start_session();

    proto::write_frame(&mut client.writer, b"ls\r\n").unwrap();
    let frame = proto::read_frame(&mut client.reader).unwrap().unwrap();
    assert!(frame.starts_with(b"0 OK\r\nLength: 1\r\n\r\n\n"));

    client.finish();
}

#[test]
fn disconnecting_ends_the_session_cleanly() {
    let client = start_session();
    client.finish();
}
