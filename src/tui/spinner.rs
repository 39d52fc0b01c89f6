//! Progress spinner for parse sessions

use indicatif::{ProgressBar, ProgressStyle};

/// A spinner shown while a document is being parsed
pub struct ParseSpinner {
    bar: ProgressBar,
    active: bool,
}

impl ParseSpinner {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&[
                "\u{2800}", "\u{2801}", "\u{2803}", "\u{2807}", "\u{280f}",
                "\u{281f}", "\u{283f}", "\u{287f}", "\u{28ff}", "\u{28fe}",
                "\u{28fc}", "\u{28f8}", "\u{28f0}", "\u{28e0}", "\u{28c0}",
                "\u{2880}", "\u{2800}",
            ]);
        bar.set_style(style);
        Self { bar, active: false }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, msg: &str) {
        self.bar.set_message(msg.to_string());
        self.bar.enable_steady_tick(std::time::Duration::from_millis(80));
        self.active = true;
    }

    /// Replace the message, e.g. with the current parse stage
    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Print a line above the spinner without tearing it
    pub fn println(&self, line: &str) {
        if self.active {
            self.bar.println(line);
        } else {
            println!("{}", line);
        }
    }

    /// Stop and clear the spinner
    pub fn stop(&mut self) {
        if self.active {
            self.bar.finish_and_clear();
            self.active = false;
        }
    }
}

impl Default for ParseSpinner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ParseSpinner {
    fn drop(&mut self) {
        self.stop();
    }
}
