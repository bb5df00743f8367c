use anyhow::{bail, Result};
use numvox_core::tts::Voice;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Print the voices as a numbered list and read a choice from the terminal.
/// Returns the chosen voice id.
pub fn select_voice(voices: &[Voice]) -> Result<String> {
    if voices.is_empty() {
        bail!("No voices available for this account");
    }

    println!("\nAvailable voices:");
    for (i, voice) in voices.iter().enumerate() {
        println!(
            "{}. {} ({})",
            i + 1,
            voice.name,
            voice.category.as_deref().unwrap_or("unknown")
        );
    }

    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("\nSelect a voice number: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                bail!("Voice selection cancelled")
            }
            Err(e) => return Err(e.into()),
        };

        match parse_selection(&line, voices.len()) {
            Some(i) => {
                println!("Selected voice: {}", voices[i].name);
                return Ok(voices[i].id.clone());
            }
            None => println!("Please enter a number between 1 and {}", voices.len()),
        }
    }
}

/// 1-based menu entry to 0-based index.
fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let choice: usize = input.trim().parse().ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}
