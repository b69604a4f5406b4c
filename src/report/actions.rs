//! Per-file scan output.
//!
//! Each file the index changes produces one line on the output stream:
//!
//! ```text
//! A /data/new.txt
//! U /data/edited.txt
//! D /data/removed.txt
//! ```
//!
//! Files that could not be indexed produce `E <path>: <error>` on the
//! error stream. Unchanged files produce nothing.

use std::io::{self, Write};
use std::path::Path;

use yansi::Paint;

use crate::indexer::{FileAction, ScanObserver};
use crate::scanner::ScanError;

/// [`ScanObserver`] that prints one line per change.
///
/// Write failures do not stop the scan; the first one is kept and
/// returned by [`ActionPrinter::finish`].
#[derive(Debug)]
pub struct ActionPrinter<O: Write, E: Write> {
    out: O,
    err: E,
    color: bool,
    failure: Option<io::Error>,
}

impl<O: Write, E: Write> ActionPrinter<O, E> {
    /// Create a printer writing changes to `out` and failures to `err`.
    #[must_use]
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            color: false,
            failure: None,
        }
    }

    /// Enable ANSI colors for the action codes.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn remember(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if self.failure.is_none() {
                self.failure = Some(e);
            }
        }
    }

    /// Flush both streams.
    ///
    /// # Errors
    ///
    /// Returns the first write error seen during the scan, or the flush error.
    pub fn finish(mut self) -> io::Result<(O, E)> {
        if let Some(e) = self.failure.take() {
            return Err(e);
        }
        self.out.flush()?;
        self.err.flush()?;
        Ok((self.out, self.err))
    }
}

impl<O: Write, E: Write> ScanObserver for ActionPrinter<O, E> {
    fn on_file(&mut self, action: FileAction, path: &Path) {
        let code = action.code();
        let result = if self.color {
            let painted = match action {
                FileAction::Added => code.green(),
                FileAction::Updated => code.yellow(),
                FileAction::Deleted => code.red(),
            };
            writeln!(self.out, "{} {}", painted, path.display())
        } else {
            writeln!(self.out, "{} {}", code, path.display())
        };
        self.remember(result);
    }

    fn on_error(&mut self, error: &ScanError) {
        let result = if self.color {
            writeln!(
                self.err,
                "{} {}: {}",
                'E'.red().bold(),
                error.path().display(),
                error
            )
        } else {
            writeln!(self.err, "E {}: {}", error.path().display(), error)
        };
        self.remember(result);
    }
}
