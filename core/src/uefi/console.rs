use core::fmt;

use super::bindings::{status, SimpleTextOutputProtocol};

/// `fmt::Write` over `ConOut`. `\n` goes out as `\r\n`.
pub struct ConsoleWriter {
    con_out: *mut SimpleTextOutputProtocol,
}

impl ConsoleWriter {
    /// # Safety
    /// `con_out` must be null or a live text output protocol.
    pub unsafe fn new(con_out: *mut SimpleTextOutputProtocol) -> Self {
        Self { con_out }
    }
}

impl fmt::Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.con_out.is_null() {
            return Ok(());
        }

        let con_out = self.con_out;
        let mut buf = [0u16; 129];
        let mut len = 0;
        let flush = |buf: &mut [u16; 129], len: &mut usize| -> fmt::Result {
            buf[*len] = 0;
            // SAFETY: checked non-null above; live per `new`'s contract
            let result = unsafe { ((*con_out).output_string)(con_out, buf.as_ptr()) };
            *len = 0;
            if status::is_error(result) {
                Err(fmt::Error)
            } else {
                Ok(())
            }
        };

        for unit in s.encode_utf16() {
            if unit == u16::from(b'\n') {
                if len + 2 > 128 {
                    flush(&mut buf, &mut len)?;
                }
                buf[len] = u16::from(b'\r');
                len += 1;
            } else if len + 1 > 128 {
                flush(&mut buf, &mut len)?;
            }
            buf[len] = unit;
            len += 1;
        }
        if len > 0 {
            flush(&mut buf, &mut len)?;
        }
        Ok(())
    }
}
