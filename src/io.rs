use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::memory::Word;
use crate::translation::Mmu;

/// One memory operation from a trace file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read(u64),
    Write(u64, Word),
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Parse a trace. One operation per line: `r <addr>` or `w <addr> <value>`.
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_trace(content: &str) -> Result<Vec<Op>, TraceError> {
    let mut ops = Vec::new();

    for (number, raw_line) in content.lines().enumerate() {
        let line = number + 1;
        let tokens: Vec<&str> = raw_line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => continue,
            [first, ..] if first.starts_with('#') => continue,
            ["r", addr] => ops.push(Op::Read(parse_addr(addr, line)?)),
            ["w", addr, value] => {
                let value = value.parse().map_err(|_| TraceError::Malformed {
                    line,
                    reason: format!("invalid value: {value}"),
                })?;
                ops.push(Op::Write(parse_addr(addr, line)?, value));
            }
            _ => {
                return Err(TraceError::Malformed {
                    line,
                    reason: format!("expected 'r <addr>' or 'w <addr> <value>', got: {raw_line}"),
                });
            }
        }
    }

    Ok(ops)
}

fn parse_addr(token: &str, line: usize) -> Result<u64, TraceError> {
    token.parse().map_err(|_| TraceError::Malformed {
        line,
        reason: format!("invalid virtual address: {token}"),
    })
}

pub fn read_trace<P: AsRef<Path>>(path: P) -> Result<Vec<Op>, TraceError> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_trace(&content)
}

/// Execute a trace, producing one token per operation: the value for a read,
/// `ok` for a write, `err` for an operation on an out-of-range address.
pub fn run_trace(mmu: &mut Mmu, ops: &[Op]) -> Vec<String> {
    ops.iter()
        .map(|&op| match op {
            Op::Read(addr) => match mmu.read(addr) {
                Ok(value) => value.to_string(),
                Err(_) => "err".to_string(),
            },
            Op::Write(addr, value) => match mmu.write(addr, value) {
                Ok(()) => "ok".to_string(),
                Err(_) => "err".to_string(),
            },
        })
        .collect()
}

pub fn write_results<P: AsRef<Path>>(path: P, results: &[String]) -> Result<(), std::io::Error> {
    fs::write(path.as_ref(), results.join(" "))
}
