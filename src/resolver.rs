use std::io::{self, BufRead, Write};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    TimedOut,
}

/// Human-in-the-loop step used while the page sits behind an interstitial.
pub trait HumanResolver {
    /// Block until an operator says the interstitial is cleared. `attempt`
    /// starts at 1.
    fn await_resolution(&mut self, attempt: u32) -> Resolution;
}

/// Prompts on stdout and waits for Enter on stdin.
pub struct ConsoleResolver<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl ConsoleResolver<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        ConsoleResolver {
            input: io::stdin().lock(),
            output: io::stdout(),
        }
    }
}

impl<R: BufRead, W: Write> ConsoleResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsoleResolver { input, output }
    }

    fn prompt(&mut self, attempt: u32) -> io::Result<()> {
        writeln!(
            self.output,
            "You are not signed in or the page is asking for verification (attempt {}).",
            attempt
        )?;
        write!(self.output, "Please clear the check in the browser, then press Enter to continue... ")?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> HumanResolver for ConsoleResolver<R, W> {
    fn await_resolution(&mut self, attempt: u32) -> Resolution {
        if let Err(e) = self.prompt(attempt) {
            warn!(attempt, error = %e, "failed to write operator prompt");
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                warn!(attempt, "no operator input (EOF)");
                Resolution::TimedOut
            }
            Ok(_) => {
                info!(attempt, "operator signalled resolution");
                Resolution::Resolved
            }
            Err(e) => {
                warn!(attempt, error = %e, "failed to read operator input");
                Resolution::TimedOut
            }
        }
    }
}

/// Resolver for unattended runs: nobody is there to clear anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl HumanResolver for NonInteractive {
    fn await_resolution(&mut self, _attempt: u32) -> Resolution {
        Resolution::TimedOut
    }
}
