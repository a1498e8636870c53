// ABOUTME: Interactive confirmation gate for production deploys and rollbacks.
// ABOUTME: Refuses to prompt without a terminal; --force skips the prompt entirely.

use heckx_deploy::error::{Error, Result};
use std::io::{self, BufRead, IsTerminal, Write};

/// Ask the operator to confirm `action`.
///
/// Returns `ConfirmationRequired` when stdin is not a terminal, and
/// `Aborted` for any answer other than yes.
pub fn confirm(action: &str, force: bool) -> Result<()> {
    if force {
        return Ok(());
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(Error::ConfirmationRequired(action.to_string()));
    }

    print!("{}? [y/N] ", action);
    io::stdout().flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    if is_yes(&answer) {
        Ok(())
    } else {
        Err(Error::Aborted)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[test]
    fn force_skips_the_prompt() {
        assert!(confirm("Deploy to production", true).is_ok());
    }
}
