//! Colored terminal output for the command-line front end.
//!
//! Diagnostics go through `log`; this is for what the user asked to see.

use std::io::{self, Write};
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    /// Writes `marker` in `spec`, then the message, as one line.
    fn marked(&self, marker: &str, spec: &ColorSpec, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        write_marked(&mut buffer, marker, spec, message)?;
        self.bufwtr.print(&buffer)
    }

    /// Print an info message (normal output)
    pub fn info(&self, message: &str) -> io::Result<()> {
        self.marked("ℹ", ColorSpec::new().set_fg(Some(Color::Cyan)), message)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.marked("✓", ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true), message)
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> io::Result<()> {
        self.marked("⚠", ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true), message)
    }

    /// Print an error message to stderr (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let spec = ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true).clone();
        if write_marked(&mut buffer, "✗", &spec, message).is_err() || bufwtr.print(&buffer).is_err() {
            println!("[STDERR ERROR] ✗ {}", message);
        }
    }

    /// Print a verbose message (only in verbose mode)
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        self.marked("→", ColorSpec::new().set_fg(Some(Color::Blue)), message)
    }

    /// Print a conversion progress line
    pub fn progress(&self, percent: u8, message: &str) -> io::Result<()> {
        self.marked(
            &format!("[{percent:>3}%]"),
            ColorSpec::new().set_fg(Some(Color::Magenta)),
            message,
        )
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer)?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(&mut buffer, "═══ {} ═══", title)?;
        buffer.reset()?;
        self.bufwtr.print(&buffer)
    }

    /// Print an aligned `key: value` line under a section
    pub fn field(&self, key: &str, value: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(&mut buffer, "    {:<12}", format!("{key}:"))?;
        buffer.reset()?;
        writeln!(&mut buffer, " {}", value)?;
        self.bufwtr.print(&buffer)
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> io::Result<()> {
        self.println(&format!("    {message}"))
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer, "{}", message)?;
        self.bufwtr.print(&buffer)
    }

    /// Print data the user asked for, even in quiet mode
    pub fn data(&self, message: &str) -> io::Result<()> {
        let mut buffer = self.bufwtr.buffer();
        writeln!(&mut buffer, "{}", message)?;
        self.bufwtr.print(&buffer)
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

fn write_marked(buffer: &mut Buffer, marker: &str, spec: &ColorSpec, message: &str) -> io::Result<()> {
    buffer.set_color(spec)?;
    write!(buffer, "{}", marker)?;
    buffer.reset()?;
    writeln!(buffer, " {}", message)
}
