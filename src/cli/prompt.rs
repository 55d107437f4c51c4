//! Line-based prompts for interactive mode

use std::io::{self, BufRead, Write};

/// Reads answers to prompts from `input`, writing the prompts to `output`
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl Prompter<io::StdinLock<'static>, io::Stderr> {
    /// Prompts on stderr, leaving stdout for output meant to be piped
    pub fn stderr() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `prompt` and read one line; `None` at end of input
    pub fn line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut input = String::new();
        if self.input.read_line(&mut input)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(input.trim_end_matches(['\n', '\r']).to_string()))
    }

    /// Ask a yes/no question; anything but `y`/`yes` is no
    pub fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let answer = self.line(prompt)?.unwrap_or_default();
        let answer = answer.trim();
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Write a line of output
    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }
}
