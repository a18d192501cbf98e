//! Multi-value diagnostic printer
//!
//! Every argument becomes one line on the output. Nested sequences are flattened
//! depth first, so `[["x", "y"], "z"]` prints `x`, `y`, `z`.

use std::fmt;
use std::io::{self, Write};

/// Nesting allowed before emission is abandoned
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// One value handed to the emitter
pub enum DiagnosticArg {
    /// Written verbatim
    Text(String),
    /// Each element is emitted in turn, recursively
    Sequence(Vec<DiagnosticArg>),
    /// Rendered with `Display` at write time
    Other(Box<dyn fmt::Display + Send + Sync>),
}

impl DiagnosticArg {
    pub fn text(text: impl Into<String>) -> Self {
        DiagnosticArg::Text(text.into())
    }

    pub fn other<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        DiagnosticArg::Other(Box::new(value))
    }
}

impl fmt::Debug for DiagnosticArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticArg::Text(text) => f.debug_tuple("Text").field(text).finish(),
            DiagnosticArg::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            DiagnosticArg::Other(value) => f.debug_tuple("Other").field(&value.to_string()).finish(),
        }
    }
}

impl From<&str> for DiagnosticArg {
    fn from(text: &str) -> Self {
        DiagnosticArg::Text(text.to_string())
    }
}

impl From<String> for DiagnosticArg {
    fn from(text: String) -> Self {
        DiagnosticArg::Text(text)
    }
}

impl<T: Into<DiagnosticArg>> From<Vec<T>> for DiagnosticArg {
    fn from(items: Vec<T>) -> Self {
        DiagnosticArg::Sequence(items.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("diagnostic arguments nested deeper than {max_depth} levels")]
    DepthExceeded { max_depth: usize },

    #[error("failed to write diagnostic line")]
    Io(#[from] io::Error),
}

/// Writes one newline-terminated line per argument, flushing after each line
#[derive(Debug)]
pub struct DiagnosticEmitter<W> {
    out: W,
    max_depth: usize,
    line: Vec<u8>,
}

impl DiagnosticEmitter<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> DiagnosticEmitter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            max_depth: DEFAULT_MAX_DEPTH,
            line: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Emit every argument in order and return the number of lines written.
    ///
    /// On error, lines written before the failure stay written.
    pub fn emit(&mut self, args: &[DiagnosticArg]) -> Result<usize, EmitError> {
        self.emit_nested(args, 0)
    }

    fn emit_nested(&mut self, args: &[DiagnosticArg], depth: usize) -> Result<usize, EmitError> {
        if depth > self.max_depth {
            return Err(EmitError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }

        let mut lines = 0;
        for arg in args {
            match arg {
                DiagnosticArg::Text(text) => {
                    self.write_line(text)?;
                    lines += 1;
                }
                DiagnosticArg::Sequence(items) => {
                    lines += self.emit_nested(items, depth + 1)?;
                }
                DiagnosticArg::Other(value) => {
                    self.write_line(&value.to_string())?;
                    lines += 1;
                }
            }
        }
        Ok(lines)
    }

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        // Single write per line keeps lines whole when the stream is shared
        self.line.clear();
        self.line.extend_from_slice(text.as_bytes());
        self.line.push(b'\n');
        self.out.write_all(&self.line)?;
        self.out.flush()
    }
}

/// Emit to stderr, reporting failures through tracing rather than to the caller
pub fn warn(args: &[DiagnosticArg]) {
    warn_with_depth(args, DEFAULT_MAX_DEPTH);
}

pub fn warn_with_depth(args: &[DiagnosticArg], max_depth: usize) {
    if let Err(err) = DiagnosticEmitter::stderr()
        .with_max_depth(max_depth)
        .emit(args)
    {
        tracing::warn!(target: "metronome", %err, "diagnostic output incomplete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted(args: &[DiagnosticArg]) -> String {
        let mut emitter = DiagnosticEmitter::new(Vec::new());
        emitter.emit(args).unwrap();
        String::from_utf8(emitter.into_inner()).unwrap()
    }

    #[test]
    fn test_nested_sequences_flatten_in_order() {
        let args = vec![DiagnosticArg::from(vec!["x", "y"]), "z".into()];
        assert_eq!(emitted(&args), "x\ny\nz\n");
    }

    #[test]
    fn test_other_values_use_display() {
        let args = vec![DiagnosticArg::other(42), DiagnosticArg::other(1.5)];
        assert_eq!(emitted(&args), "42\n1.5\n");
    }

    #[test]
    fn test_line_count_and_empty_sequences() {
        let mut emitter = DiagnosticEmitter::new(Vec::new());
        let args = vec![
            DiagnosticArg::Sequence(vec![]),
            DiagnosticArg::text(""),
            DiagnosticArg::Sequence(vec![DiagnosticArg::Sequence(vec!["deep".into()])]),
        ];
        assert_eq!(emitter.emit(&args).unwrap(), 2);
        assert_eq!(emitter.into_inner(), b"\ndeep\n");
    }

    #[test]
    fn test_depth_limit_stops_runaway_nesting() {
        let mut nested = DiagnosticArg::text("bottom");
        for _ in 0..3 {
            nested = DiagnosticArg::Sequence(vec![nested]);
        }

        let mut emitter = DiagnosticEmitter::new(Vec::new()).with_max_depth(2);
        let err = emitter.emit(&["top".into(), nested]).unwrap_err();
        assert!(matches!(err, EmitError::DepthExceeded { max_depth: 2 }));
        assert_eq!(emitter.into_inner(), b"top\n");

        let mut nested = DiagnosticArg::text("bottom");
        for _ in 0..3 {
            nested = DiagnosticArg::Sequence(vec![nested]);
        }
        let mut emitter = DiagnosticEmitter::new(Vec::new()).with_max_depth(3);
        assert_eq!(emitter.emit(&[nested]).unwrap(), 1);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut emitter = DiagnosticEmitter::new(BrokenPipe);
        assert!(matches!(
            emitter.emit(&["x".into()]),
            Err(EmitError::Io(_))
        ));
    }
}
