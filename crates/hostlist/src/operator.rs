//! Interactive confirmation on the terminal

use hostlist_core::{ChangeSet, Operator};
use std::io::{BufRead, Write};
use std::sync::{Mutex, PoisonError};

/// Prints the change set and asks for a yes/no answer
pub struct TerminalOperator<R> {
    input: Mutex<R>,
}

impl<R: BufRead + Send> TerminalOperator<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }

    fn read_answer(&self) -> Option<String> {
        let mut line = String::new();
        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_lowercase()),
        }
    }
}

impl<R: BufRead + Send> Operator for TerminalOperator<R> {
    fn present(&self, changes: &ChangeSet) {
        print!("{}", changes.render());
    }

    /// Repeats the question until it gets `y` or `n`; end of input declines
    fn confirm(&self, _changes: &ChangeSet) -> bool {
        loop {
            print!("Apply changes? [y/n] ");
            let _ = std::io::stdout().flush();
            match self.read_answer().as_deref() {
                Some("y") | Some("yes") => return true,
                Some("n") | Some("no") | None => return false,
                Some(_) => continue,
            }
        }
    }
}
