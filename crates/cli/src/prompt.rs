//! Line-oriented interactive prompts.

use anyhow::Result;
use mouse_rebind_core::payload::parse_u16;
use std::io::{BufRead, Write};
use thiserror::Error;

/// Input ended (Ctrl-D) before a prompt was answered.
#[derive(Debug, Error)]
#[error("input closed")]
pub struct Interrupted;

/// Reads answers from `input`, writing prompts to `output`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Show `prompt` and return the trimmed answer.
    pub fn line(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Err(Interrupted.into());
        }
        Ok(answer.trim().to_string())
    }

    /// Ask a yes/no question. Only `token`, in any case, counts as yes.
    pub fn confirm(&mut self, prompt: &str, token: &str) -> Result<bool> {
        Ok(self.line(prompt)?.to_lowercase() == token)
    }

    /// Ask for a 16-bit number, re-asking until the answer parses.
    ///
    /// An empty answer selects `default`, shown to the operator as `shown`.
    pub fn number(
        &mut self,
        prompt: &str,
        default: u16,
        shown: &str,
        invalid: &str,
    ) -> Result<u16> {
        loop {
            let answer = self.line(&format!("{prompt} [{shown}]: "))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match parse_u16(&answer) {
                Ok(v) => return Ok(v),
                Err(_) => writeln!(self.output, "{invalid}")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn number_accepts_hex_and_default() {
        let mut p = prompter("0x046D\n\n");
        assert_eq!(p.number("VID", 0x25A7, "9639", "bad").unwrap(), 0x046D);
        assert_eq!(p.number("PID", 0xFA08, "64008", "bad").unwrap(), 0xFA08);
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("VID [9639]: "));
    }

    #[test]
    fn number_reprompts_on_garbage() {
        let mut p = prompter("mouse\n70000\n12\n");
        assert_eq!(p.number("Interface", 0, "0", "try again").unwrap(), 12);
        let shown = String::from_utf8(p.output).unwrap();
        assert_eq!(shown.matches("try again").count(), 2);
    }

    #[test]
    fn closed_input_is_interrupted() {
        let mut p = prompter("");
        let err = p.line("Payload: ").unwrap_err();
        assert!(err.downcast_ref::<Interrupted>().is_some());
    }
}
