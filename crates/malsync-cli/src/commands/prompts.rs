use crate::output::Output;
use color_eyre::Result;
use dialoguer::{Input, Password};

/// Prompt for a secret (masked input)
pub fn prompt_password(prompt: &str) -> Result<String> {
    Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read {}: {}", prompt, e))
}

/// Prompt for a number of seconds, re-asking on bad input
pub fn prompt_seconds(prompt: &str, default: u64, output: &Output) -> Result<u64> {
    loop {
        let input_str = Input::<String>::new()
            .with_prompt(prompt)
            .default(default.to_string())
            .interact()
            .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))?;

        match input_str.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => return Ok(secs),
            _ => output.error("Invalid input. Please enter a positive number of seconds."),
        }
    }
}
