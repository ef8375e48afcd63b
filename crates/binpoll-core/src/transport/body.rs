//! Streamed GET body: a worker thread drives the curl transfer and hands
//! chunks over a bounded channel to a `Read` implementation.
//!
//! Dropping the `Body` closes the channel; the worker's next send fails and
//! the transfer is aborted from the write callback.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, Read};
use std::str;
use std::sync::mpsc::{Receiver, SyncSender};

use curl::easy::Easy;

use super::headers::ResponseHeaders;

/// Chunks buffered between the transfer worker and the reader.
pub(crate) const CHANNEL_DEPTH: usize = 16;

pub(crate) enum Event {
    /// Final response headers; sent once, before any chunk.
    Response(ResponseHeaders),
    Chunk(Vec<u8>),
    Finished(Result<(), curl::Error>),
}

/// Run a GET transfer on a configured handle, streaming the response
/// through `tx`. The caller sends `Event::Finished` with the result once the
/// handle is released.
pub(crate) fn run_transfer(easy: &mut Easy, tx: &SyncSender<Event>) -> Result<(), curl::Error> {
    let headers = RefCell::new(ResponseHeaders::default());
    let announced = Cell::new(false);

    let result = perform(easy, tx, &headers, &announced);

    if !announced.get() && result.is_ok() {
        // Empty body: the write callback never ran.
        let _ = tx.send(Event::Response(headers.into_inner()));
    }
    result
}

fn perform(
    easy: &mut Easy,
    tx: &SyncSender<Event>,
    headers: &RefCell<ResponseHeaders>,
    announced: &Cell<bool>,
) -> Result<(), curl::Error> {
    let mut transfer = easy.transfer();
    transfer.header_function(|data| {
        if let Ok(line) = str::from_utf8(data) {
            headers.borrow_mut().push_line(line);
        }
        true
    })?;
    transfer.write_function(|data| {
        if !announced.replace(true) {
            let response = headers.borrow().clone();
            let ok = response.status() == Some(200);
            if tx.send(Event::Response(response)).is_err() || !ok {
                // Returning a short count aborts the transfer.
                return Ok(0);
            }
        }
        match tx.send(Event::Chunk(data.to_vec())) {
            Ok(()) => Ok(data.len()),
            Err(_) => Ok(0),
        }
    })?;
    transfer.perform()
}

/// Response body of a GET, readable on the caller's thread.
pub struct Body {
    rx: Receiver<Event>,
    chunk: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl Body {
    pub(crate) fn new(rx: Receiver<Event>) -> Self {
        Body {
            rx,
            chunk: Vec::new(),
            pos: 0,
            finished: false,
        }
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.chunk.len() {
                let n = buf.len().min(self.chunk.len() - self.pos);
                buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Event::Chunk(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Event::Response(_)) => {}
                Ok(Event::Finished(Ok(()))) => self.finished = true,
                Ok(Event::Finished(Err(e))) => {
                    self.finished = true;
                    return Err(io::Error::other(e));
                }
                Err(_) => {
                    self.finished = true;
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "transfer worker exited before the body completed",
                    ));
                }
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("buffered", &(self.chunk.len() - self.pos))
            .field("finished", &self.finished)
            .finish()
    }
}
