use bytes::Bytes;
use std::str;
use tokio::time::Duration;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Set `key` to hold the string `value`. If `key` already holds a value, it is overwritten.
///
/// Options:
///
/// * `PX milliseconds`: set the specified expire time, in milliseconds. A missing, negative or
///   non-numeric count is ignored and the key is stored without expiration.
///
/// Any other option is ignored.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    pub ttl: Option<Duration>,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        store.scalars.set(self.key, self.value, self.ttl);

        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        let mut ttl = None;
        let mut px_seen = false;

        loop {
            let option = match parser.next_bytes() {
                Ok(option) => option,
                Err(CommandParserError::EndOfStream) => break,
                Err(err) => return Err(err),
            };

            if px_seen || !option.eq_ignore_ascii_case(b"PX") {
                continue;
            }
            px_seen = true;

            ttl = match parser.next_bytes() {
                Ok(millis) => parse_millis(&millis),
                Err(CommandParserError::EndOfStream) => break,
                Err(err) => return Err(err),
            };
        }

        Ok(Self { key, value, ttl })
    }
}

fn parse_millis(bytes: &[u8]) -> Option<Duration> {
    str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
