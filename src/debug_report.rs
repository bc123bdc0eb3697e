use glossa::{ChangeTrace, WordTrace};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_word(number: usize, trace: &WordTrace, color: bool) {
    let palette = ansi::Palette::new(color);
    println!(
        "\n{} {}",
        palette.paint(format!("[{number}]"), ansi::GRAY),
        palette.bold(palette.paint(&trace.word, ansi::GREEN))
    );

    println!("{}", palette.paint("━━━ Syllables ━━━", ansi::GRAY));
    let syllables: Vec<String> = trace.syllables.iter().map(|s| palette.paint(display(s), ansi::YELLOW)).collect();
    println!(
        "  {}  {} {}",
        syllables.join(&palette.dim(" · ")),
        palette.dim("→"),
        palette.bold(display(&trace.raw))
    );

    println!("{}", palette.paint("━━━ Changes ━━━", ansi::GRAY));
    if trace.changes.is_empty() {
        println!("{}", palette.dim("  No changes configured"));
    }
    for change in &trace.changes {
        print_change(change, &palette);
    }

    println!("  {} {}", palette.dim("elapsed:"), palette.paint(format!("{:?}", trace.elapsed), ansi::CYAN));
}

pub fn print_applied(word: &str, changes: &[ChangeTrace], color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Applying changes to \"{word}\""), ansi::CYAN)));
    for change in changes {
        print_change(change, &palette);
    }
}

pub fn print_failure(number: usize, message: &str, color: bool) {
    let palette = ansi::Palette::new(color);
    eprintln!("{} {}", palette.paint(format!("[{number}]"), ansi::GRAY), palette.paint(message, ansi::RED));
}

fn print_change(change: &ChangeTrace, palette: &ansi::Palette) {
    let marker = if change.output != change.input {
        palette.paint("✓", ansi::GREEN)
    } else {
        palette.dim("·")
    };
    println!(
        "  {} {} {} {} {}",
        marker,
        palette.paint(&change.name, ansi::BLUE),
        palette.dim(display(&change.input)),
        palette.dim("→"),
        palette.bold(display(&change.output)),
    );

    let mut previous = change.input.as_str();
    for step in &change.steps {
        if step.changed(previous) {
            println!(
                "      {} {} {}",
                palette.paint(&step.rule, ansi::CYAN),
                palette.dim("⇒"),
                palette.paint(display(&step.output), ansi::YELLOW)
            );
        }
        previous = &step.output;
    }
}

fn display(s: &str) -> &str {
    if s.is_empty() { "∅" } else { s }
}
