use std::fs;
use std::path::Path;

use desk_core::error::AppError;
use tracing::debug;

/// Ordered FAQ question/answer pairs with case-folded question keys.
///
/// Precedence is an explicit contract: entries are inserted in load order,
/// and a repeated question keeps its original position but takes the latest
/// answer (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaqSet {
    entries: Vec<(String, String)>,
}

impl FaqSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-folds the question and applies last-write-wins on duplicates.
    pub fn insert(&mut self, question: &str, answer: &str) {
        let key = question.trim().to_lowercase();
        if key.is_empty() || answer.trim().is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(q, _)| *q == key) {
            Some((_, existing)) => *existing = answer.trim().to_string(),
            None => self.entries.push((key, answer.trim().to_string())),
        }
    }

    /// `(question, answer)` pairs in insertion order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Load FAQ files in precedence order (later files override earlier
    /// ones). Missing files are skipped; unreadable files are errors.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, AppError> {
        let mut set = FaqSet::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                debug!(path = %path.display(), "faq file missing; skipped");
                continue;
            }
            let text = fs::read_to_string(path).map_err(|e| {
                AppError::new("FAQ_LOAD_FAILED", "Failed to read FAQ file")
                    .with_details(format!("path={}; err={}", path.display(), e))
            })?;
            parse_into(&text, &mut set);
        }
        Ok(set)
    }
}

/// Parse the `Q:` / `A:` line format. A pair is committed when both parts
/// have been seen; blank questions or answers are dropped.
fn parse_into(text: &str, set: &mut FaqSet) {
    let mut question: Option<String> = None;
    for line in text.lines() {
        let line = line.trim();
        if let Some(q) = line.strip_prefix("Q:") {
            question = Some(q.trim().to_string());
        } else if let Some(a) = line.strip_prefix("A:") {
            if let Some(q) = question.take() {
                set.insert(&q, a.trim());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> FaqSet {
        let mut set = FaqSet::new();
        parse_into(text, &mut set);
        set
    }

    #[test]
    fn parses_question_answer_pairs() {
        let set = parse("Q: What are your hours?\nA: 9am-5pm\n\nQ: Where are you?\nA: Online only\n");
        assert_eq!(
            set.entries(),
            &[
                ("what are your hours?".to_string(), "9am-5pm".to_string()),
                ("where are you?".to_string(), "Online only".to_string()),
            ]
        );
    }

    #[test]
    fn questions_are_case_folded() {
        let set = parse("Q: WHAT ARE YOUR HOURS?\nA: 9am-5pm\n");
        assert_eq!(set.entries()[0].0, "what are your hours?");
    }

    #[test]
    fn blank_answers_are_dropped() {
        let set = parse("Q: Anything?\nA:\nQ: Real?\nA: yes\n");
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].0, "real?");
    }

    #[test]
    fn answer_without_question_is_ignored() {
        let set = parse("A: orphan\nQ: ok?\nA: yes\n");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicate_keeps_position_and_takes_latest_answer() {
        let mut set = FaqSet::new();
        set.insert("hours", "9am-5pm");
        set.insert("location", "online");
        set.insert("Hours", "10am-6pm");
        assert_eq!(
            set.entries(),
            &[
                ("hours".to_string(), "10am-6pm".to_string()),
                ("location".to_string(), "online".to_string()),
            ]
        );
    }

    #[test]
    fn later_file_overrides_earlier_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("faq1.txt");
        let second = dir.path().join("faq2.txt");
        std::fs::write(&first, "Q: hours\nA: 9am-5pm\n").unwrap();
        std::fs::write(&second, "Q: hours\nA: 24/7\n").unwrap();

        let set = FaqSet::load_files(&[&first, &second]).expect("load");
        assert_eq!(set.entries(), &[("hours".to_string(), "24/7".to_string())]);
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let present = dir.path().join("faq1.txt");
        let absent = dir.path().join("faq9.txt");
        std::fs::write(&present, "Q: hours\nA: 9am-5pm\n").unwrap();

        let set = FaqSet::load_files(&[&absent, &present]).expect("load");
        assert_eq!(set.len(), 1);
    }
}
