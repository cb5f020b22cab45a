use blockfs::{BlockStorage, FileDisk, FileSys, NUM_BLOCKS};

pub fn main() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let disk = FileDisk::open_disk(tmp.path(), NUM_BLOCKS).expect("could not open disk image");

    let mut fs = FileSys::mount(disk).expect("could not mount file system");
    fs.mkdir("docs").unwrap();
    fs.create("notes").unwrap();
    fs.append("notes", b"hello from blockfs").unwrap();
    fs.ls().unwrap();

    print!("{}", String::from_utf8_lossy(&fs.take_response()));
}
