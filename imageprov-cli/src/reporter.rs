use imageprov::Reporter;

/// Prints progress lines to stdout.
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Reporter for ConsoleReporter {
    fn say(&self, message: &str) {
        if !self.quiet {
            println!("==> imageprov: {}", message);
        }
    }
}
