//! Human decision seam for captcha codes.
//!
//! The orchestrator never reads stdin itself; it asks a
//! [`CaptchaPrompt`] to turn a challenge into a code. Interactive runs
//! use [`StdinPrompt`]; unattended runs use [`AutoPrompt`]; tests use
//! [`ScriptedPrompt`].

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use console::style;

/// Resolves one captcha challenge to a submittable code.
pub trait CaptchaPrompt {
    /// Return the code to submit, or `None` to skip this attempt.
    /// `image_path` points at the saved captcha image when one exists;
    /// `guess` carries the OCR result when one passed the filter.
    fn resolve(&self, image_path: Option<&Path>, guess: Option<&str>) -> io::Result<Option<String>>;
}

/// Interactive prompt on stdin. The OCR guess, when present, is the
/// default accepted by an empty line; with no guess an empty line
/// skips the attempt.
pub struct StdinPrompt;

impl CaptchaPrompt for StdinPrompt {
    fn resolve(&self, image_path: Option<&Path>, guess: Option<&str>) -> io::Result<Option<String>> {
        if let Some(path) = image_path {
            println!(
                "{} Captcha image saved to {}",
                style("→").cyan(),
                style(path.display()).bold()
            );
        } else {
            println!(
                "{} No captcha image could be fetched for this attempt",
                style("!").yellow()
            );
        }

        match guess {
            Some(guess) => print!("Captcha [{}]: ", style(guess).green()),
            None => print!("Captcha (empty to skip): "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            Ok(guess.map(|g| g.to_string()))
        } else {
            Ok(Some(input.to_string()))
        }
    }
}

/// Accepts whatever the OCR produced, never asking a human. Attempts
/// without a guess are skipped. For unattended runs.
pub struct AutoPrompt;

impl CaptchaPrompt for AutoPrompt {
    fn resolve(&self, _image_path: Option<&Path>, guess: Option<&str>) -> io::Result<Option<String>> {
        Ok(guess.map(|g| g.to_string()))
    }
}

/// Replays a fixed sequence of responses. Once the queue is drained
/// every further attempt is skipped.
pub struct ScriptedPrompt {
    responses: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedPrompt {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }
}

impl CaptchaPrompt for ScriptedPrompt {
    fn resolve(&self, _image_path: Option<&Path>, _guess: Option<&str>) -> io::Result<Option<String>> {
        let mut responses = self.responses.lock().expect("prompt lock");
        Ok(responses.pop_front().flatten())
    }
}
