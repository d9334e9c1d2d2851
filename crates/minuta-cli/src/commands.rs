//! Subcommand implementations. Each returns the text to print.

use std::path::Path;

use anyhow::{Context, bail};
use chrono::Local;
use minuta_core::model::{AttachmentId, ContractTypeId, EntityId, TemplateId};
use minuta_core::template::DOCUMENT_TITLE;
use minuta_core::{DraftId, DraftStatus, IdKind, markup};
use minuta_sync::{DraftStore, EditorSession};

use crate::display;

pub fn types<S: DraftStore>(session: &EditorSession<S>) -> String {
    display::contract_types(&session.catalog().contract_types)
}

pub async fn show<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    html: bool,
) -> anyhow::Result<String> {
    session.load_draft(id).await.context("loading draft")?;
    let preview = session.preview()?;
    let body = if html { preview } else { markup::plain_text(&preview) };
    let mut out = session.draft().map(display::draft_card).unwrap_or_default();
    let pending = session.pending_variables()?;
    if !pending.is_empty() {
        out.push_str(&format!("  {:<14} {}\n", "missing", pending.join(", ")));
    }
    out.push('\n');
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}

pub async fn new<S: DraftStore>(
    session: &mut EditorSession<S>,
    contract_type: ContractTypeId,
    title: &str,
) -> anyhow::Result<String> {
    session.start(contract_type)?;
    session.set_variable(DOCUMENT_TITLE, title)?;
    let id = session.save().await.context("creating draft")?;
    Ok(format!("Created draft #{id}\n"))
}

pub async fn set<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    name: &str,
    value: &str,
) -> anyhow::Result<String> {
    session.load_draft(id).await.context("loading draft")?;
    let stored = session.set_variable(name, value)?;
    session.save().await.context("saving draft")?;
    Ok(format!("{name} = {stored}\n"))
}

pub async fn assign<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    role: &str,
    entity: EntityId,
    template: TemplateId,
) -> anyhow::Result<String> {
    session.load_draft(id).await.context("loading draft")?;
    let catalog = session.catalog();
    let party = catalog
        .entity(entity)
        .cloned()
        .with_context(|| format!("entity {entity} not found"))?;
    let qualification = catalog
        .qualification_template(template)
        .cloned()
        .with_context(|| format!("qualification template {template} not found"))?;
    let name = party.name.clone();
    session.assign_party(role, party)?;
    session.assign_qualification(role, qualification)?;
    session.save().await.context("saving draft")?;
    Ok(format!("{role}: {name}\n"))
}

pub async fn add_clause<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    clause: u64,
) -> anyhow::Result<String> {
    session.load_draft(id).await.context("loading draft")?;
    let clause = session
        .catalog()
        .library_clause(clause)
        .cloned()
        .with_context(|| format!("library clause {clause} not found"))?;
    let appended = session.add_clause(clause)?;
    session.save().await.context("saving draft")?;
    let mut out = format!("Added clause at position {}\n", appended.index + 1);
    for request in session.drain_attachment_requests() {
        out.push_str(&format!(
            "Clause {} needs an attachment: minuta attach {id} {} <file>\n",
            request.index + 1,
            request.index + 1
        ));
    }
    Ok(out)
}

/// `position` is 1-based, as shown by `show`.
pub async fn attach<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    position: usize,
    file: &Path,
) -> anyhow::Result<String> {
    let index = clause_index(position)?;
    let (filename, bytes) = read_upload(file)?;
    session.load_draft(id).await.context("loading draft")?;
    let attachment = session.attach_to_clause(index, &filename, bytes).await?;
    session.save().await.context("saving draft")?;
    Ok(format!("Attached {} to clause {position}\n", attachment.filename))
}

/// Link a file already uploaded to the draft, without uploading it again.
pub async fn link_existing<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    position: usize,
    attachment: AttachmentId,
) -> anyhow::Result<String> {
    let index = clause_index(position)?;
    session.load_draft(id).await.context("loading draft")?;
    let linked = session.link_existing(index, attachment).await?;
    session.save().await.context("saving draft")?;
    Ok(format!("Attached {} to clause {position}\n", linked.filename))
}

fn clause_index(position: usize) -> anyhow::Result<usize> {
    if position == 0 {
        bail!("clause positions start at 1");
    }
    Ok(position - 1)
}

pub async fn transition<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    next: DraftStatus,
) -> anyhow::Result<String> {
    session.load_draft(id).await.context("loading draft")?;
    let status = session.transition(next).await?;
    Ok(format!("Draft #{id} is now {status}\n"))
}

pub async fn history<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
) -> anyhow::Result<String> {
    session.load_draft(id).await.context("loading draft")?;
    let entries = session.history().await.context("fetching history")?;
    Ok(display::history(&entries, &Local))
}

pub async fn attachments<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
) -> anyhow::Result<String> {
    session.load_draft(id).await.context("loading draft")?;
    let items = session.attachments().await.context("listing attachments")?;
    Ok(display::attachments(&items))
}

pub async fn export<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    out: &Path,
) -> anyhow::Result<String> {
    session.load_draft(id).await.context("loading draft")?;
    let bytes = session.export_docx().await.context("exporting document")?;
    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;
    Ok(format!("Wrote {} bytes to {}\n", bytes.len(), out.display()))
}

pub async fn import<S: DraftStore>(
    session: &mut EditorSession<S>,
    id: DraftId,
    file: &Path,
) -> anyhow::Result<String> {
    let (filename, bytes) = read_upload(file)?;
    session.load_draft(id).await.context("loading draft")?;
    let count = session.import_document(&filename, bytes).await?;
    session.save().await.context("saving draft")?;
    Ok(format!("Replaced clauses with {count} from {filename}\n"))
}

pub fn mask(kind: IdKind, value: &str) -> String {
    format!("{}\n", kind.format(value))
}

pub fn validate(kind: IdKind, value: &str) -> anyhow::Result<String> {
    kind.validate(value)?;
    Ok(format!("{} is a valid {kind}\n", kind.format(value)))
}

fn read_upload(file: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no file name", file.display()))?
        .to_string();
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    Ok((filename, bytes))
}
