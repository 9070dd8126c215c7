use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::error::Error;

pub const INPUT_PROMPT: &str = "Enter the path to a video: ";
pub const OUTPUT_PROMPT: &str = "Enter the path to save the output video: ";

/// Writes `question`, reads one line and returns it trimmed.
pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &'static str,
) -> Result<String, Error> {
    output.write_all(question.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let answer = line.trim();
    if answer.is_empty() {
        return Err(Error::EmptyAnswer(question));
    }

    Ok(answer.to_string())
}

/// Asks for the input video and the output destination, in that order.
pub fn ask_paths<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<(PathBuf, PathBuf), Error> {
    let src = ask(input, output, INPUT_PROMPT)?;
    let dst = ask(input, output, OUTPUT_PROMPT)?;

    Ok((src.into(), dst.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_both_paths_in_order() {
        let mut stdin = "  clips/street.mp4 \nout/annotated.mp4\n".as_bytes();
        let mut stdout = Vec::new();

        let (src, dst) = ask_paths(&mut stdin, &mut stdout).unwrap();

        assert_eq!(src, PathBuf::from("clips/street.mp4"));
        assert_eq!(dst, PathBuf::from("out/annotated.mp4"));
        assert_eq!(
            String::from_utf8(stdout).unwrap(),
            format!("{}{}", INPUT_PROMPT, OUTPUT_PROMPT)
        );
    }

    #[test]
    fn last_line_without_newline_is_accepted() {
        let mut stdin = "a.mp4\nb.mp4".as_bytes();
        let (_, dst) = ask_paths(&mut stdin, &mut std::io::sink()).unwrap();

        assert_eq!(dst, PathBuf::from("b.mp4"));
    }

    #[test]
    fn closed_stdin_is_an_empty_answer() {
        let mut stdin = "a.mp4\n".as_bytes();

        assert!(matches!(
            ask_paths(&mut stdin, &mut std::io::sink()),
            Err(Error::EmptyAnswer(OUTPUT_PROMPT))
        ));
    }
}
