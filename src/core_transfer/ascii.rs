//! Streaming ASCII-mode line-ending translation.
//!
//! Wire format is CRLF. Downloads collapse `\r\n` to `\n` and keep a
//! lone `\r`; uploads insert `\r` before every `\n`. The decoder is
//! stateful because a CRLF pair can straddle two read chunks.

/// Wire → local translator (CRLF to NL).
#[derive(Debug, Default)]
pub struct CrlfDecoder {
    pending_cr: bool,
}

impl CrlfDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates `input` into `out`. A trailing CR is held back until
    /// the next chunk or `finish` decides its fate.
    pub fn push(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &b in input {
            if self.pending_cr {
                self.pending_cr = false;
                if b == b'\n' {
                    out.push(b'\n');
                    continue;
                }
                out.push(b'\r');
            }
            if b == b'\r' {
                self.pending_cr = true;
            } else {
                out.push(b);
            }
        }
    }

    /// Flushes a CR held at end of stream.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.pending_cr {
            self.pending_cr = false;
            out.push(b'\r');
        }
    }
}

/// Local → wire translation (NL to CRLF). Stateless: every `\n`
/// gains a preceding `\r`, matching the classic client.
pub fn encode_crlf(input: &[u8], out: &mut Vec<u8>) {
    for &b in input {
        if b == b'\n' {
            out.push(b'\r');
        }
        out.push(b);
    }
}
