//! The ordered clause list of one draft.
//!
//! Stored titles may carry an ordinal ("CLÁUSULA 3ª - DO PRAZO"). That ordinal
//! is advisory: [`display_title`] always derives it from the current position.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DraftError;
use crate::markup;
use crate::model::{Attachment, Clause, ClauseId};

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CLÁUSULA [0-9A-Za-z_]+ª").expect("ordinal pattern is valid"));

/// Rewrite the first ordinal in `title` to match a 0-based `index`.
pub fn display_title(title: &str, index: usize) -> String {
    let ordinal = format!("CLÁUSULA {}ª", index + 1);
    ORDINAL.replacen(title, 1, ordinal.as_str()).into_owned()
}

/// Title given to the n-th clause (1-based) created from imported text.
pub fn ordinal_title(n: usize) -> String {
    format!("CLÁUSULA {n}ª")
}

/// Note appended to a clause body when a file is linked to it.
pub fn attachment_note(attachment: &Attachment) -> String {
    format!(
        r#"<p class="attachment-ref"><em>(Ver anexo: {})</em></p>"#,
        markup::escape(&attachment.filename)
    )
}

/// Result of [`ClauseSequence::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub index: usize,
    /// The clause asks for an attachment the caller should prompt for.
    pub needs_attachment: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClauseSequence {
    clauses: Vec<Clause>,
}

impl From<Vec<Clause>> for ClauseSequence {
    fn from(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }
}

impl ClauseSequence {
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Clause> {
        self.clauses.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Clause> {
        self.clauses.iter()
    }

    pub fn to_vec(&self) -> Vec<Clause> {
        self.clauses.clone()
    }

    fn check_index(&self, index: usize) -> Result<(), DraftError> {
        if index < self.clauses.len() {
            Ok(())
        } else {
            Err(DraftError::ClauseOutOfRange {
                index,
                len: self.clauses.len(),
            })
        }
    }

    /// Add at the end. A clause that requires an attachment is appended all
    /// the same; the caller is told to prompt for the file.
    pub fn append(&mut self, clause: Clause) -> Appended {
        let needs_attachment = clause.requires_attachment && clause.attachment_id.is_none();
        self.clauses.push(clause);
        let index = self.clauses.len() - 1;
        debug!(index, needs_attachment, "clause appended");
        Appended {
            index,
            needs_attachment,
        }
    }

    /// Relocate the clause at `from` so it lands at `to`, counted in the list
    /// without it. `to` is clamped to the end, so `to == len` drops at the end.
    ///
    /// Returns whether the order changed. An out-of-range `from` is a no-op.
    pub fn move_clause(&mut self, from: usize, to: usize) -> bool {
        if from >= self.clauses.len() || from == to {
            return false;
        }
        let clause = self.clauses.remove(from);
        let target = to.min(self.clauses.len());
        self.clauses.insert(target, clause);
        debug!(from, to = target, "clause moved");
        target != from
    }

    /// Link an uploaded file to a clause and note it at the end of the body.
    pub fn attach_file(&mut self, index: usize, attachment: &Attachment) -> Result<(), DraftError> {
        self.check_index(index)?;
        let clause = &mut self.clauses[index];
        clause.attachment_id = Some(attachment.id);
        clause.body.push_str(&attachment_note(attachment));
        debug!(index, attachment = attachment.id, "attachment linked");
        Ok(())
    }

    pub fn edit(&mut self, index: usize, title: String, body: String) -> Result<(), DraftError> {
        self.check_index(index)?;
        let clause = &mut self.clauses[index];
        clause.title = title;
        clause.body = body;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Clause, DraftError> {
        self.check_index(index)?;
        Ok(self.clauses.remove(index))
    }

    /// Drop every clause and take `clauses` in their place.
    pub fn replace_all(&mut self, clauses: impl Into<ClauseSequence>) {
        self.clauses = clauses.into().clauses;
        debug!(len = self.clauses.len(), "clauses replaced");
    }

    /// Clauses for imported paragraphs: blank paragraphs are dropped, the rest
    /// are numbered `CLÁUSULA 1ª`, `CLÁUSULA 2ª`, ... with the paragraph HTML as body.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let clauses = paragraphs
            .into_iter()
            .map(Into::into)
            .filter(|html: &String| !markup::is_blank(html))
            .enumerate()
            .map(|(i, body)| Clause {
                id: ClauseId::custom(),
                title: ordinal_title(i + 1),
                body,
                requires_attachment: false,
                attachment_id: None,
            })
            .collect();
        Self { clauses }
    }

    /// Indices of clauses that require an attachment but have none linked yet.
    pub fn awaiting_attachment(&self) -> Vec<usize> {
        self.clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| c.requires_attachment && c.attachment_id.is_none())
            .map(|(i, _)| i)
            .collect()
    }
}
