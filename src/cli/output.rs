//! CLI output formatting utilities.

use crate::cache::RecentFile;
use crate::session::SubtitleView;
use crate::sync::SpeakerTone;
use crate::transcript::format_time;
use console::{style, Style};
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one recent-files entry.
    pub fn recent_file(file: &RecentFile) {
        let updated = file
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} ({}, {})",
            style("*").cyan(),
            style(file.display_name()).bold(),
            style(&file.hash).dim(),
            updated
        );
    }

    /// Print the subtitle that just became active, with the spoken word
    /// emphasized.
    pub fn subtitle(view: &SubtitleView<'_>) {
        let tone = Self::speaker_style(SpeakerTone::for_speaker(&view.utterance.speaker));
        let words: Vec<String> = if view.utterance.words.is_empty() {
            vec![view.utterance.text.clone()]
        } else {
            view.utterance
                .words
                .iter()
                .map(|w| {
                    if view.word.is_some_and(|active| std::ptr::eq(active, w)) {
                        style(&w.text).reverse().to_string()
                    } else {
                        w.text.clone()
                    }
                })
                .collect()
        };

        println!(
            "{} {} {}",
            style(format_time(view.utterance.start_time)).dim(),
            tone.apply_to(format!("{}:", view.utterance.speaker)),
            words.join(" ")
        );
        if let Some(translation) = view.translation.filter(|t| !t.text.is_empty()) {
            println!("      {}", style(&translation.text).italic());
        }
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    fn speaker_style(tone: SpeakerTone) -> Style {
        match tone {
            SpeakerTone::Primary => Style::new().blue().bold(),
            SpeakerTone::Secondary => Style::new().magenta().bold(),
        }
    }
}
