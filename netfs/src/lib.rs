//! Network surface for the blockfs engine: the line-oriented wire protocol,
//! the single-connection server loop and the client shell.

pub mod proto;
pub mod server;
pub mod shell;
