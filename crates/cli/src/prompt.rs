//! Interactive prompts for values not given on the command line.

use std::io::{BufRead, Write};

use anyhow::{Context, bail};
use ticket_report_core::LocationType;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one trimmed answer. Fails when input is closed.
    fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        write!(self.output, "{}", question).context("Failed to write prompt")?;
        self.output.flush().context("Failed to write prompt")?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("Failed to read answer")?;
        if read == 0 {
            bail!("Input closed before an answer was given");
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, message: &str) -> anyhow::Result<()> {
        writeln!(self.output, "{}", message).context("Failed to write prompt")
    }

    pub fn work_item_id(&mut self) -> anyhow::Result<u64> {
        loop {
            let answer = self.ask("Enter the work item ID: ")?;
            match answer.parse::<u64>() {
                Ok(id) => return Ok(id),
                Err(_) => self.say(&format!("'{}' is not a work item ID. Enter a number.", answer))?,
            }
        }
    }

    pub fn client_name(&mut self) -> anyhow::Result<String> {
        loop {
            let answer = self.ask("Enter the client name: ")?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say("The client name cannot be empty.")?;
        }
    }

    pub fn location(&mut self) -> anyhow::Result<LocationType> {
        loop {
            self.say("Select location type:\n1: Onsite\n2: Offsite/Remote")?;
            let answer = self.ask("Enter 1 or 2: ")?;
            match answer.as_str() {
                "1" => return Ok(LocationType::Onsite),
                "2" => return Ok(LocationType::Offsite),
                _ => self.say("Invalid choice. Please enter 1 or 2.")?,
            }
        }
    }

    /// Asks whether to create another report; only `y` continues.
    pub fn another(&mut self) -> anyhow::Result<bool> {
        let answer = self.ask("Do you want to create another report? (y/n): ")?;
        Ok(answer.eq_ignore_ascii_case("y"))
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
    fn test_work_item_id_reprompts() {
        let mut prompter = prompter("abc\n\n 4321 \n");
        assert_eq!(prompter.work_item_id().unwrap(), 4321);

        let transcript = String::from_utf8(prompter.output).unwrap();
        assert_eq!(transcript.matches("Enter the work item ID: ").count(), 3);
        assert!(transcript.contains("'abc' is not a work item ID"));
    }

    #[test]
    fn test_location_menu() {
        let mut prompter = prompter("3\nonsite\n2\n");
        assert_eq!(prompter.location().unwrap(), LocationType::Offsite);

        let transcript = String::from_utf8(prompter.output).unwrap();
        assert!(transcript.contains("1: Onsite\n2: Offsite/Remote"));
        assert_eq!(transcript.matches("Invalid choice").count(), 2);
    }

    #[test]
    fn test_client_name_not_empty() {
        let mut prompter = prompter("\n  Corner Market  \n");
        assert_eq!(prompter.client_name().unwrap(), "Corner Market");
    }

    #[test]
    fn test_another() {
        assert!(prompter("y\n").another().unwrap());
        assert!(prompter("Y\n").another().unwrap());
        assert!(!prompter("yes\n").another().unwrap());
        assert!(!prompter("n\n").another().unwrap());
    }

    #[test]
    fn test_closed_input() {
        assert!(prompter("").work_item_id().is_err());
        assert!(prompter("").another().is_err());
    }
}
