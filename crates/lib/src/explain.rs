use crate::ids::DataId;
use crate::program::Program;

/// Sink for plan explanation text.
///
/// Nodes append fragments; `push_no_newline`/`pop_no_newline` let a composite
/// node keep its operands on one line the way the planner prints them.
#[derive(Debug, Default)]
pub struct Explain {
    buffer: String,
    indent: usize,
    no_newline: usize,
    with_data: bool,
}

impl Explain {
    pub fn new() -> Explain {
        Explain::default()
    }

    /// Also print the variables a node reads and writes.
    pub fn with_data() -> Explain {
        Explain {
            with_data: true,
            ..Explain::default()
        }
    }

    pub fn is_data_on(&self) -> bool {
        self.with_data
    }

    pub fn put(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn put_data(&mut self, program: &Program, data: DataId) {
        if self.with_data {
            program.explain_variable(data, self);
        }
    }

    pub fn newline(&mut self) {
        if self.no_newline == 0 {
            self.buffer.push('\n');
            for _ in 0..self.indent {
                self.buffer.push_str("  ");
            }
        } else {
            self.buffer.push(' ');
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn unindent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn push_no_newline(&mut self) {
        self.no_newline += 1;
    }

    pub fn pop_no_newline(&mut self) {
        self.no_newline = self.no_newline.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}
