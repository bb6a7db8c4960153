pub mod echo;
pub mod executable;
pub mod get;
pub mod llen;
pub mod lpush;
pub mod lrange;
pub mod ping;
pub mod rpush;
pub mod set;

use bytes::Bytes;
use std::str::{self, FromStr};
use std::vec;
use strum_macros::{EnumString, IntoStaticStr};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

use echo::Echo;
use get::Get;
use llen::Llen;
use lpush::Lpush;
use lrange::Lrange;
use ping::Ping;
use rpush::Rpush;
use set::Set;

#[derive(Debug, PartialEq)]
pub enum Command {
    Echo(Echo),
    Get(Get),
    Llen(Llen),
    Lpush(Lpush),
    Lrange(Lrange),
    Ping(Ping),
    Rpush(Rpush),
    Set(Set),
}

/// Names of the supported commands, matched without regard to case.
#[derive(Debug, Clone, Copy, PartialEq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum CommandName {
    Echo,
    Get,
    Llen,
    Lpush,
    Lrange,
    Ping,
    Rpush,
    Set,
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match self {
            Command::Echo(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Llen(cmd) => cmd.exec(store),
            Command::Lpush(cmd) => cmd.exec(store),
            Command::Lrange(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Rpush(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandParserError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the Redis server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                })
            }
        };

        let parser = &mut CommandParser {
            parts: frames.into_iter(),
        };

        let command_name = parser.parse_command_name()?;
        let name = CommandName::from_str(&command_name).map_err(|_| {
            CommandParserError::UnknownCommand {
                command: command_name,
            }
        })?;

        let command = match name {
            CommandName::Echo => Echo::try_from(&mut *parser).map(Command::Echo),
            CommandName::Get => Get::try_from(&mut *parser).map(Command::Get),
            CommandName::Llen => Llen::try_from(&mut *parser).map(Command::Llen),
            CommandName::Lpush => Lpush::try_from(&mut *parser).map(Command::Lpush),
            CommandName::Lrange => Lrange::try_from(&mut *parser).map(Command::Lrange),
            CommandName::Ping => Ping::try_from(&mut *parser).map(Command::Ping),
            CommandName::Rpush => Rpush::try_from(&mut *parser).map(Command::Rpush),
            CommandName::Set => Set::try_from(&mut *parser).map(Command::Set),
        };

        command
            .and_then(|command| parser.finish().map(|()| command))
            .map_err(|err| match err {
                CommandParserError::EndOfStream | CommandParserError::TrailingArguments => {
                    CommandParserError::WrongNumberOfArguments {
                        command: name.into(),
                    }
                }
                err => err,
            })
    }
}

pub struct CommandParser {
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        self.next_string()
    }

    fn next_frame(&mut self) -> Result<Frame, CommandParserError> {
        self.parts.next().ok_or(CommandParserError::EndOfStream)
    }

    fn next_string(&mut self) -> Result<String, CommandParserError> {
        match self.next_frame()? {
            // Both `Simple` and `Bulk` representation may be strings. Strings are parsed to UTF-8.
            // While errors are stored as strings, they are considered separate types.
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandParserError::InvalidUTF8String),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    fn next_integer(&mut self) -> Result<i64, CommandParserError> {
        match self.next_frame()? {
            Frame::Integer(i) => Ok(i),
            Frame::Simple(string) => string
                .parse::<i64>()
                .map_err(|_| CommandParserError::NotAnInteger),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(CommandParserError::NotAnInteger),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "integer".to_string(),
                actual: frame,
            }),
        }
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        match self.next_frame()? {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    /// Collects every remaining argument, requiring at least one.
    fn remaining_bytes(&mut self) -> Result<Vec<Bytes>, CommandParserError> {
        let mut values = vec![self.next_bytes()?];

        while self.parts.len() > 0 {
            values.push(self.next_bytes()?);
        }

        Ok(values)
    }

    /// Discards every remaining argument.
    fn skip_remaining(&mut self) {
        self.parts.by_ref().for_each(drop);
    }

    fn finish(&mut self) -> Result<(), CommandParserError> {
        if self.parts.len() > 0 {
            return Err(CommandParserError::TrailingArguments);
        }
        Ok(())
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("protocol error; invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongNumberOfArguments { command: &'static str },
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
    #[error("attempting to extract a value failed due to the frame being fully consumed")]
    EndOfStream,
    #[error("the command received more arguments than it accepts")]
    TrailingArguments,
}

impl CommandParserError {
    /// Whether the client sent something that isn't a command at all. Such a stream can't be
    /// trusted any further and the connection has to be closed.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, CommandParserError::InvalidFrame { .. })
    }
}
