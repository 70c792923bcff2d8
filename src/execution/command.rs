//! Command-line tokenization.

use std::fmt;

/// A command line split into program and arguments.
///
/// Always holds at least one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argv(Vec<String>);

impl Argv {
    /// The program to run.
    pub fn program(&self) -> &str {
        &self.0[0]
    }

    /// Arguments after the program, in order. Empty for a single token.
    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    /// All tokens, program first.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Whether the command is submitted without arguments.
    pub fn is_bare(&self) -> bool {
        self.0.len() == 1
    }
}

impl fmt::Display for Argv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Split `command_line` on single spaces.
///
/// There is no quoting or escaping: `"a  b"` yields `["a", "", "b"]`, and
/// empty tokens are passed through as-is.
pub fn tokenize(command_line: &str) -> Argv {
    Argv(command_line.split(' ').map(str::to_string).collect())
}
