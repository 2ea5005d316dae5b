//! The plain-text line reader: one `String` per line, with the same metrics,
//! progress and error plumbing as the structured readers.

use crate::input::Input;
use crate::ReadError;
use ops::{ErrorFlow, ErrorKind, Origin, ProgressTracker, ReadOptions};
use std::io::{self, BufRead};

pub fn read(mut input: Input, options: ReadOptions) -> Result<TextIter, ReadError> {
    input.skip_bom()?;
    let (reader, _, file) = input.into_parts();
    Ok(TextIter {
        reader,
        options,
        file,
        progress: ProgressTracker::new(),
        line_no: 0,
        finished: false,
    })
}

pub struct TextIter {
    reader: Box<dyn BufRead + Send>,
    options: ReadOptions,
    file: Option<String>,
    progress: ProgressTracker,
    line_no: u64,
    finished: bool,
}

impl Iterator for TextIter {
    type Item = Result<String, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if self.options.cancellation.is_cancelled() {
                tracing::debug!("text read cancelled");
                self.finished = true;
                return None;
            }

            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    ops::complete(&self.options, &mut self.progress, None);
                    self.finished = true;
                    return None;
                }
                Ok(_) => {
                    self.line_no += 1;
                    if line.ends_with('\n') {
                        line.pop();
                        if line.ends_with('\r') {
                            line.pop();
                        }
                        self.options.metrics.add_lines(1);
                    }
                    self.options.metrics.add_raw_record();
                    self.options.metrics.add_emitted();
                    self.progress.maybe_emit(&self.options, None);
                    return Some(Ok(line));
                }
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    // The offending bytes are already consumed, so Skip can
                    // resume at the next line.
                    self.line_no += 1;
                    match ops::handle_error(
                        &self.options,
                        Origin::Text,
                        self.file.as_deref(),
                        self.line_no,
                        self.line_no,
                        ErrorKind::Io,
                        format!("line is not valid UTF-8: {}", err),
                        None,
                    ) {
                        Ok(ErrorFlow::Continue) => continue,
                        Ok(ErrorFlow::Stop) => {
                            self.finished = true;
                            return None;
                        }
                        Err(fatal) => {
                            self.finished = true;
                            return Some(Err(fatal.into()));
                        }
                    }
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn yields_lines_without_terminators() {
        let input = Input::from_string("one\r\ntwo\nthree");
        let lines: Vec<String> = read(input, ReadOptions::default())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn completion_is_stamped_and_metrics_advance() {
        let options = ReadOptions::default();
        let metrics = options.metrics.clone();
        let input = Input::from_string("a\nb\n");
        read(input, options).unwrap().for_each(drop);
        assert_eq!(metrics.records_emitted(), 2);
        assert_eq!(metrics.lines_read(), 2);
        assert!(metrics.completed().is_some());
    }

    #[test]
    fn an_empty_input_completes_with_nothing() {
        let options = ReadOptions::default();
        let metrics = options.metrics.clone();
        assert_eq!(read(Input::from_string(""), options).unwrap().count(), 0);
        assert_eq!(metrics.records_emitted(), 0);
        assert!(metrics.completed().is_some());
    }
}
