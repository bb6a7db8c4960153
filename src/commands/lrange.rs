use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns the specified elements of the list stored at `key`. The offsets `start` and `stop` are
/// zero-based indexes, both inclusive. They can also be negative numbers indicating offsets from
/// the end of the list, -1 being the last element.
///
/// Out of range indexes do not produce an error: they are clamped to the list, and an empty
/// range, like a missing key, yields an empty array. An index that isn't an integer counts as 0.
///
/// Ref: <https://redis.io/docs/latest/commands/lrange/>
#[derive(Debug, PartialEq)]
pub struct Lrange {
    pub key: String,
    pub start: i64,
    pub stop: i64,
}

impl Executable for Lrange {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let values = store
            .lists
            .range(&self.key, self.start, self.stop)
            .into_iter()
            .map(Frame::Bulk)
            .collect();

        Ok(Frame::Array(values))
    }
}

impl TryFrom<&mut CommandParser> for Lrange {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let start = next_index(parser)?;
        let stop = next_index(parser)?;

        Ok(Self { key, start, stop })
    }
}

fn next_index(parser: &mut CommandParser) -> Result<i64, CommandParserError> {
    match parser.next_integer() {
        Err(CommandParserError::NotAnInteger) => Ok(0),
        index => index,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Command;

    fn lrange_frame(key: &'static str, start: &'static str, stop: &'static str) -> Frame {
        Frame::Array(vec![
            Frame::Bulk(Bytes::from("LRANGE")),
            Frame::Bulk(Bytes::from(key)),
            Frame::Bulk(Bytes::from(start)),
            Frame::Bulk(Bytes::from(stop)),
        ])
    }

    fn store_with_list() -> Store {
        let store = Store::new();
        store.lists.rpush(
            "mylist".to_string(),
            vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")],
        );
        store
    }

    fn bulks(values: &[&'static str]) -> Frame {
        Frame::Array(
            values
                .iter()
                .map(|value| Frame::Bulk(Bytes::from(*value)))
                .collect(),
        )
    }

    #[test]
    fn whole_list() {
        let cmd = Command::try_from(lrange_frame("mylist", "0", "-1")).unwrap();

        assert_eq!(
            cmd,
            Command::Lrange(Lrange {
                key: "mylist".to_string(),
                start: 0,
                stop: -1,
            })
        );

        let res = cmd.exec(store_with_list()).unwrap();

        assert_eq!(res, bulks(&["a", "b", "c"]));
        assert_eq!(
            res.serialize(),
            b"*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n"
        );
    }

    #[test]
    fn clamped_range() {
        let cmd = Command::try_from(lrange_frame("mylist", "-100", "100")).unwrap();
        let res = cmd.exec(store_with_list()).unwrap();

        assert_eq!(res, bulks(&["a", "b", "c"]));
    }

    #[test]
    fn negative_range() {
        let cmd = Command::try_from(lrange_frame("mylist", "-2", "-1")).unwrap();
        let res = cmd.exec(store_with_list()).unwrap();

        assert_eq!(res, bulks(&["b", "c"]));
    }

    #[test]
    fn start_after_stop() {
        let cmd = Command::try_from(lrange_frame("mylist", "2", "1")).unwrap();
        let res = cmd.exec(store_with_list()).unwrap();

        assert_eq!(res, Frame::Array(vec![]));
        assert_eq!(res.serialize(), b"*0\r\n");
    }

    #[test]
    fn missing_key() {
        let cmd = Command::try_from(lrange_frame("nolist", "0", "-1")).unwrap();
        let res = cmd.exec(Store::new()).unwrap();

        assert_eq!(res, Frame::Array(vec![]));
    }

    #[test]
    fn non_integer_index() {
        let cmd = Command::try_from(lrange_frame("mylist", "zero", "-1")).unwrap();

        assert_eq!(
            cmd,
            Command::Lrange(Lrange {
                key: "mylist".to_string(),
                start: 0,
                stop: -1,
            })
        );

        let res = cmd.exec(store_with_list()).unwrap();

        assert_eq!(res, bulks(&["a", "b", "c"]));
    }

    #[test]
    fn non_integer_indexes() {
        let cmd = Command::try_from(lrange_frame("mylist", "one", "1.5")).unwrap();
        let res = cmd.exec(store_with_list()).unwrap();

        assert_eq!(res, bulks(&["a"]));
    }
}
