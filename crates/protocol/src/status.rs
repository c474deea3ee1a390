//! Status reply parsing.
//!
//! Every command is answered by a single status line: `A<count>` on success,
//! `E<errno>` or `F<errno>` on failure, each terminated by `\n`. Error
//! replies are followed by a human-readable message line which is consumed
//! and discarded. Replies are read one byte at a time — the transport is a
//! pipe shared with binary payload data, so the parser must never read past
//! the line it owns.

use std::io::{self, Read};

use crate::error::ProtocolError;

/// Maximum size of a status line, including its terminating newline.
///
/// A line that fills the buffer without a newline means the peer is not
/// speaking the protocol; the session must be torn down.
pub const STATUS_LINE_LIMIT: usize = 64;

/// Reads one status reply and returns the acknowledged count.
///
/// On an `A` reply the remainder of the line is parsed with `atol` semantics
/// (leading spaces, optional sign, digits, trailing bytes ignored, empty
/// input is zero); a negative result is a framing violation. `E`/`F` replies
/// surface as [`ProtocolError::PeerError`] after their message line has been
/// discarded.
///
/// # Errors
///
/// Any framing or I/O failure, or a peer-reported error. See
/// [`ProtocolError::is_fatal`] for which of these require the caller to shut
/// the session down.
pub fn read_count(reader: &mut impl Read) -> Result<i64, ProtocolError> {
    let mut line = [0u8; STATUS_LINE_LIMIT];
    let payload = read_success_payload(reader, &mut line)?;
    let count = parse_decimal_lenient(payload);
    if count < 0 {
        return Err(ProtocolError::NegativeCount);
    }
    Ok(count)
}

/// Reads one status reply and returns the acknowledged file offset.
///
/// Unlike [`read_count`], the payload is parsed strictly: there must be at
/// least one digit, and a value that does not fit `i64` is an overflow error
/// rather than a silent saturation. The sign is preserved; interpreting a
/// negative offset is the caller's concern.
///
/// # Errors
///
/// As [`read_count`], plus [`ProtocolError::OffsetOverflow`] and
/// [`ProtocolError::MalformedOffset`], neither of which poisons the session:
/// the reply line itself was well-framed.
pub fn read_offset(reader: &mut impl Read) -> Result<i64, ProtocolError> {
    let mut line = [0u8; STATUS_LINE_LIMIT];
    let payload = read_success_payload(reader, &mut line)?;
    parse_decimal_strict(payload)
}

/// Reads a status line and returns the payload following the `A` marker.
///
/// Leading spaces before the status letter are tolerated. `E` and `F` lines
/// have their errno decoded (zero or negative values normalise to `EIO`) and
/// their message line discarded before the error is returned.
fn read_success_payload<'a>(
    reader: &mut impl Read,
    line: &'a mut [u8; STATUS_LINE_LIMIT],
) -> Result<&'a [u8], ProtocolError> {
    let len = read_reply_line(reader, line)?;
    let mut start = 0;
    while start < len && line[start] == b' ' {
        start += 1;
    }

    match line.get(start) {
        Some(b'A') => Ok(&line[start + 1..len]),
        Some(status @ (b'E' | b'F')) => {
            let fatal = *status == b'F';
            let raw = parse_decimal_lenient(&line[start + 1..len]);
            discard_message_line(reader)?;
            let errno = if raw <= 0 || raw > i64::from(i32::MAX) {
                libc::EIO
            } else {
                raw as i32
            };
            Err(ProtocolError::PeerError { errno, fatal })
        }
        Some(&byte) => Err(ProtocolError::Desynchronized { byte }),
        // An empty line (or one of spaces only) carries no status letter.
        None => Err(ProtocolError::Desynchronized { byte: b'\n' }),
    }
}

/// Reads bytes into `line` until the terminating newline.
///
/// The newline is consumed but not stored. Exhausting the buffer before a
/// newline arrives is a framing violation.
fn read_reply_line(
    reader: &mut impl Read,
    line: &mut [u8; STATUS_LINE_LIMIT],
) -> Result<usize, ProtocolError> {
    for i in 0..STATUS_LINE_LIMIT {
        let byte = read_byte(reader)?;
        if byte == b'\n' {
            return Ok(i);
        }
        line[i] = byte;
    }
    Err(ProtocolError::LineTooLong)
}

/// Consumes and discards the message line that follows an `E`/`F` status.
fn discard_message_line(reader: &mut impl Read) -> Result<(), ProtocolError> {
    loop {
        if read_byte(reader)? == b'\n' {
            return Ok(());
        }
    }
}

fn read_byte(reader: &mut impl Read) -> Result<u8, ProtocolError> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Err(ProtocolError::TruncatedReply),
            Ok(_) => return Ok(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(_) => return Err(ProtocolError::TruncatedReply),
        }
    }
}

/// `atol`-style parse: optional leading spaces and sign, then digits, with
/// anything after the digit run ignored. No digits parses as zero. Values
/// beyond `i64` saturate.
fn parse_decimal_lenient(payload: &[u8]) -> i64 {
    let mut rest = payload;
    while let [b' ' | b'\t', tail @ ..] = rest {
        rest = tail;
    }
    let negative = match rest {
        [b'-', tail @ ..] => {
            rest = tail;
            true
        }
        [b'+', tail @ ..] => {
            rest = tail;
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for &byte in rest {
        if !byte.is_ascii_digit() {
            break;
        }
        let digit = i64::from(byte - b'0');
        value = value.saturating_mul(10).saturating_add(digit);
    }
    if negative {
        -value
    } else {
        value
    }
}

/// `strtoimax`-style parse: at least one digit required, overflow detected.
fn parse_decimal_strict(payload: &[u8]) -> Result<i64, ProtocolError> {
    let mut rest = payload;
    while let [b' ' | b'\t', tail @ ..] = rest {
        rest = tail;
    }
    let negative = match rest {
        [b'-', tail @ ..] => {
            rest = tail;
            true
        }
        [b'+', tail @ ..] => {
            rest = tail;
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    let mut digits = 0usize;
    for &byte in rest {
        if !byte.is_ascii_digit() {
            break;
        }
        digits += 1;
        let digit = i64::from(byte - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| {
                if negative {
                    v.checked_sub(digit)
                } else {
                    v.checked_add(digit)
                }
            })
            .ok_or(ProtocolError::OffsetOverflow)?;
    }

    if digits == 0 {
        return Err(ProtocolError::MalformedOffset);
    }
    Ok(value)
}
