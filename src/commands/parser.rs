use bytes::Bytes;
use std::str;

use super::{Command, CommandKind, GlobPattern, ScanArgs};
use crate::error::CommandError;

pub const DEFAULT_SCAN_COUNT: usize = 10;

// Longest prefix of an unrecognized command name quoted back in the error.
const MAX_ECHOED_NAME_LEN: usize = 128;

pub struct CommandParser;

impl CommandParser {
    /// Turn a decoded frame into a command, checking name and arity.
    ///
    /// Operands beyond what a command uses are ignored, except for SCAN whose
    /// options are validated.
    pub fn parse(args: Vec<Bytes>) -> Result<Command, CommandError> {
        let Some((name, operands)) = args.split_first() else {
            return Err(CommandError::Empty);
        };

        let kind = CommandKind::from_name(name).ok_or_else(|| {
            let shown = &name[..name.len().min(MAX_ECHOED_NAME_LEN)];
            CommandError::Unknown(String::from_utf8_lossy(shown).into_owned())
        })?;

        let command = match (kind, operands) {
            (CommandKind::Get, [key, ..]) => Command::Get(key.clone()),
            (CommandKind::Set, [key, value, ..]) => Command::Set(key.clone(), value.clone()),
            (CommandKind::Del, keys) => Command::Del(keys.to_vec()),
            (CommandKind::Exists, keys) => Command::Exists(keys.to_vec()),
            (CommandKind::Strlen, [key, ..]) => Command::Strlen(key.clone()),
            (CommandKind::Scan, options) => Command::Scan(Self::parse_scan(options)?),
            (CommandKind::Ping, _) => Command::Ping,
            (CommandKind::Hello, _) => Command::Hello,
            (CommandKind::Cluster, _) => Command::Cluster,
            (CommandKind::Get | CommandKind::Set | CommandKind::Strlen, _) => {
                return Err(CommandError::WrongArity(kind.name()));
            }
        };

        Ok(command)
    }

    // SCAN cursor [MATCH pattern] [COUNT count], in exactly that order.
    fn parse_scan(options: &[Bytes]) -> Result<ScanArgs, CommandError> {
        let (cursor, mut rest) = match options.split_first() {
            Some((raw, rest)) => (parse_usize(raw).ok_or(CommandError::InvalidCursor)?, rest),
            None => (0, options),
        };

        let mut pattern = None;
        if let [keyword, value, tail @ ..] = rest {
            if keyword.eq_ignore_ascii_case(b"MATCH") {
                let glob = GlobPattern::new(value.clone()).map_err(|_| CommandError::InvalidPattern)?;
                if !glob.is_match_all() {
                    pattern = Some(glob);
                }
                rest = tail;
            }
        }

        let mut count = DEFAULT_SCAN_COUNT;
        if let [keyword, value, tail @ ..] = rest {
            if keyword.eq_ignore_ascii_case(b"COUNT") {
                count = parse_usize(value)
                    .filter(|&n| n > 0)
                    .ok_or(CommandError::InvalidCount)?;
                rest = tail;
            }
        }

        if !rest.is_empty() {
            return Err(CommandError::Syntax);
        }

        Ok(ScanArgs {
            cursor,
            pattern,
            count,
        })
    }
}

fn parse_usize(raw: &[u8]) -> Option<usize> {
    str::from_utf8(raw).ok()?.parse().ok()
}
