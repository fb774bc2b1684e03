//! Terminal styling shared by the prompts and the console reporter

use colored::Colorize;
use inquire::ui::{Color, RenderConfig, StyleSheet, Styled};

const MIN_WIDTH: usize = 30;
const MAX_WIDTH: usize = 72;

/// Prompt theme: cyan cursor, green checkboxes, grey help line
pub fn prompt_render_config() -> RenderConfig<'static> {
    RenderConfig::default()
        .with_prompt_prefix(Styled::new("?").with_fg(Color::LightCyan))
        .with_highlighted_option_prefix(Styled::new("›").with_fg(Color::LightCyan))
        .with_selected_checkbox(Styled::new("[x]").with_fg(Color::LightGreen))
        .with_unselected_checkbox(Styled::new("[ ]").with_fg(Color::DarkGrey))
        .with_help_message(StyleSheet::new().with_fg(Color::DarkGrey))
}

/// Plain lines of a step banner: a titled rule followed by the description
/// wrapped to `width`
pub fn step_banner(step: u8, name: &str, description: &str, width: usize) -> Vec<String> {
    let width = width.clamp(MIN_WIDTH, MAX_WIDTH);
    let title = format!("── {}. {} ", step, name);
    let rule = "─".repeat(width.saturating_sub(title.chars().count()));

    let mut lines = vec![format!("{}{}", title, rule)];
    lines.extend(
        textwrap::wrap(description, width - 3)
            .into_iter()
            .map(|line| format!("   {}", line)),
    );
    lines
}

/// Print a step banner sized to the terminal
pub fn print_step_banner(step: u8, name: &str, description: &str) {
    let width = term_size::dimensions().map_or(MAX_WIDTH, |(w, _)| w);
    let mut lines = step_banner(step, name, description, width).into_iter();

    println!();
    if let Some(title) = lines.next() {
        println!("{}", title.bright_cyan());
    }
    for line in lines {
        println!("{}", line.dimmed());
    }
}

/// `✓` or `✗`
pub fn outcome_mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// `<count> <label>` with non-zero counts highlighted
pub fn counted(count: usize, label: &str) -> String {
    let count = if count > 0 {
        count.to_string().cyan()
    } else {
        count.to_string().dimmed()
    };
    format!("{} {}", count, label.dimmed())
}
