//! Component A: the pull-based byte reader contract consumed by the Turtle
//! tokenizer (component B).
//!
//! The original tool took a `size_t (*)(void *arg, char *buffer, size_t size)`
//! function pointer plus a `void*` argument. A plain trait with a blanket
//! impl over `std::io::Read` gives the same "pull some bytes, tell me how
//! many" contract without the C-style argument threading.

use std::io;

/// Pulls up to `buf.len()` bytes into `buf`, returning the number of bytes
/// actually read. `Ok(0)` means end of input.
pub trait ByteReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<R: io::Read> ByteReader for R {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(self, buf)
    }
}
