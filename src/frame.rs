// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::Cursor;
use std::string::FromUtf8Error;

use bytes::{Buf, Bytes};
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

// Upper bound on the array capacity reserved up front, the declared element count comes from the
// client and can't be trusted.
pub(crate) const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// How many arrays a frame may nest. A command is a single flat array.
pub const MAX_NESTING_DEPTH: usize = 8;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("protocol error; invalid frame data type: {0}")]
    InvalidDataType(u8),
    #[error("protocol error; invalid integer")]
    InvalidInteger,
    #[error("protocol error; invalid length {0}")]
    InvalidLength(i64),
    #[error("protocol error; bulk string data is not terminated by CRLF")]
    MissingTerminator,
    #[error("protocol error; frame exceeds the maximum size of {0} bytes")]
    FrameTooLarge(usize),
    #[error("protocol error; arrays nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    /// The null bulk string, `$-1\r\n` on the wire.
    Null,
    Array(Vec<Frame>),
}

/// The outcome of reading one type marker and its payload. Arrays only yield their header here,
/// their elements are read as further tokens.
#[derive(Debug, PartialEq)]
pub enum Token {
    Frame(Frame),
    ArrayHeader(usize),
}

// Protocol specification: https://redis.io/docs/reference/protocol-spec/
impl Frame {
    /// Parses a single frame starting at the cursor position. On success the cursor is left right
    /// after the last byte of the frame. `Error::Incomplete` means the buffer holds a prefix of a
    /// valid frame and more data has to be read before trying again.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Self::parse_nested(src, 0)
    }

    // `depth` is the number of arrays enclosing the frame at the cursor.
    fn parse_nested(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Self, Error> {
        match Self::parse_token(src)? {
            Token::Frame(frame) => Ok(frame),
            Token::ArrayHeader(_) if depth >= MAX_NESTING_DEPTH => {
                Err(Error::NestingTooDeep(MAX_NESTING_DEPTH))
            }
            Token::ArrayHeader(length) => {
                let mut frames = Vec::with_capacity(length.min(MAX_PREALLOCATED_ELEMENTS));
                for _ in 0..length {
                    frames.push(Self::parse_nested(src, depth + 1)?);
                }

                Ok(Frame::Array(frames))
            }
        }
    }

    /// Reads the next token at the cursor without descending into arrays.
    pub fn parse_token(src: &mut Cursor<&[u8]>) -> Result<Token, Error> {
        // The first byte in an RESP-serialized payload always identifies its type.
        // Subsequent bytes constitute the type's contents.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte)?;

        let frame = match data_type {
            DataType::SimpleString => {
                let bytes = get_line(src)?.to_vec();
                Frame::Simple(String::from_utf8(bytes)?)
            }
            DataType::SimpleError => {
                let bytes = get_line(src)?.to_vec();
                Frame::Error(String::from_utf8(bytes)?)
            }
            DataType::Integer => Frame::Integer(get_decimal(src)?),
            // $<length>\r\n<data>\r\n
            DataType::BulkString => {
                let length = get_decimal(src)?;
                if length == -1 {
                    return Ok(Token::Frame(Frame::Null));
                }

                let length = usize::try_from(length).map_err(|_| Error::InvalidLength(length))?;
                let data = get_exact(src, length)?;

                Frame::Bulk(Bytes::copy_from_slice(data))
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let length = get_decimal(src)?;
                if length == -1 {
                    return Ok(Token::Frame(Frame::Null));
                }

                let length = usize::try_from(length).map_err(|_| Error::InvalidLength(length))?;
                return Ok(Token::ArrayHeader(length));
            }
        };

        Ok(Token::Frame(frame))
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleString));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Error(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleError));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Integer(i) => {
                let digits = i.to_string();
                let mut bytes = Vec::with_capacity(1 + digits.len() + CRLF.len());
                bytes.push(u8::from(DataType::Integer));
                bytes.extend_from_slice(digits.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(data) => {
                let length_str = data.len().to_string();
                let mut bytes = Vec::with_capacity(
                    1 + length_str.len() + CRLF.len() + data.len() + CRLF.len(),
                );
                bytes.push(u8::from(DataType::BulkString));
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes.extend_from_slice(data);
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Null => b"$-1\r\n".to_vec(),
            Frame::Array(arr) => {
                let length_str = arr.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length_str.len() + CRLF.len());
                bytes.push(u8::from(DataType::Array));
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                for frame in arr {
                    bytes.extend(frame.serialize());
                }
                bytes
            }
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "*{}", arr.len())?;
                for frame in arr {
                    write!(f, " {}", frame)?;
                }
                Ok(())
            }
        }
    }
}

/// Returns the bytes up to the next CRLF and moves the cursor past it.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;

    let end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

/// Returns exactly `len` bytes followed by a CRLF and moves the cursor past the terminator. The
/// data itself may contain CRLF sequences.
fn get_exact<'a>(src: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8], Error> {
    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;
    let remaining = &buf[start..];

    if remaining.len() < len.saturating_add(CRLF.len()) {
        return Err(Error::Incomplete);
    }

    if &remaining[len..len + CRLF.len()] != CRLF {
        return Err(Error::MissingTerminator);
    }

    src.set_position((start + len + CRLF.len()) as u64);

    Ok(&remaining[..len])
}

fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = get_line(src)?;

    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(Error::InvalidInteger)
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}
