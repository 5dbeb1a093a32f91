use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use tkt_records::TicketDesk;
use tkt_server::{ServerConfig, StorageKind, TicketServer};
use tkt_store::FsBackend;
use tkt_types::{
    base_filename, Attachment, AttachmentId, Comment, FileKey, FileUpload, NewComment, NewTicket,
    Priority, Status, Ticket, TicketId,
};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = resolve_config(cli.config.as_deref(), cli.data_dir)?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Ticket(args) => {
            if let TicketAction::Delete { cascade: true, .. } = args.action {
                config.records.cascade_delete = true;
            }
            let desk = open_desk(&config).await?;
            cmd_ticket(&desk, args.action, format).await
        }
        Command::Comment(args) => {
            cmd_comment(&open_desk(&config).await?, args.action, format).await
        }
        Command::Attachment(args) => {
            cmd_attachment(&open_desk(&config).await?, args.action, format).await
        }
    }
}

/// Config file first, then command-line overrides.
pub fn resolve_config(
    path: Option<&Path>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        storage = ?config.storage,
        "config resolved"
    );
    Ok(config)
}

async fn open_desk(config: &ServerConfig) -> anyhow::Result<TicketDesk> {
    let backend = FsBackend::new(&config.data_dir)
        .await
        .with_context(|| format!("opening data dir {}", config.data_dir.display()))?;
    Ok(TicketDesk::open(&backend, config.records.clone()).await?)
}

fn emit<T>(format: OutputFormat, value: &T, text: impl FnOnce()) -> anyhow::Result<()>
where
    T: Serialize,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn status_label(status: Status) -> ColoredString {
    match status {
        Status::Open => status.as_str().yellow(),
        Status::InProgress => status.as_str().cyan(),
        Status::Resolved => status.as_str().green(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => priority.as_str().red().bold(),
        Priority::Medium => priority.as_str().yellow(),
        Priority::Low => priority.as_str().dimmed(),
    }
}

fn print_ticket_line(t: &Ticket) {
    println!(
        "{}  {}  [{}] [{}]  {}",
        format!("#{}", t.id).yellow().bold(),
        t.title.bold(),
        status_label(t.status),
        priority_label(t.priority),
        t.category.to_string().cyan(),
    );
}

fn print_attachment_line(a: &Attachment) {
    println!(
        "  {}  {} ({} bytes, {})",
        a.id.as_str().yellow(),
        a.filename.bold(),
        a.size,
        a.content_type.dimmed(),
    );
}

fn print_comment_line(c: &Comment) {
    println!(
        "  {} {}  {}",
        format!("{}.", c.id).dimmed(),
        c.created_at.to_string().dimmed(),
        c.content
    );
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.memory {
        config.storage = StorageKind::Memory;
    }
    let root = config.data_dir.display().to_string();
    let bind = config.bind_addr.to_string();
    let server = TicketServer::open(config).await?;
    println!(
        "{} Ticket Desk on {} (data: {})",
        "✓".green().bold(),
        bind.bold(),
        if args.memory { "memory".to_string() } else { root },
    );
    server.serve().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// ticket
// ---------------------------------------------------------------------------

async fn cmd_ticket(
    desk: &TicketDesk,
    action: TicketAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let tickets = desk.tickets();
    match action {
        TicketAction::List => {
            let list = tickets.list().await;
            emit(format, &list, || {
                if list.is_empty() {
                    println!("No tickets.");
                }
                list.iter().for_each(print_ticket_line);
            })
        }
        TicketAction::Show { id } => {
            let id = TicketId(id);
            let ticket = tickets.get(id).await?;
            let comments = desk.comments().list(id).await;
            let attachments = desk.attachments().list(id).await;
            let view = serde_json::json!({
                "ticket": ticket,
                "comments": comments,
                "attachments": attachments,
            });
            emit(format, &view, || {
                print_ticket_line(&ticket);
                println!("  Filed: {}", ticket.created_at.to_string().dimmed());
                println!("\n{}\n", ticket.description);
                println!("{} ({})", "Comments".bold(), comments.len());
                comments.iter().for_each(print_comment_line);
                println!("{} ({})", "Attachments".bold(), attachments.len());
                attachments.iter().for_each(print_attachment_line);
            })
        }
        TicketAction::Create {
            title,
            category,
            description,
            priority,
            status,
        } => {
            let mut request = NewTicket::new(title, category, description);
            request.priority = priority;
            request.status = status;
            let ticket = tickets.create(request).await?;
            emit(format, &ticket, || {
                let id = format!("#{}", ticket.id);
                println!("{} Filed ticket {}", "✓".green().bold(), id.yellow());
            })
        }
        TicketAction::Status { id, status } => {
            let ticket = tickets.update_status(TicketId(id), status).await?;
            emit(format, &ticket, || {
                let label = status_label(ticket.status);
                println!("{} #{} is now {}", "✓".green(), ticket.id, label);
            })
        }
        TicketAction::Priority { id, priority } => {
            let ticket = tickets.update_priority(TicketId(id), priority).await?;
            emit(format, &ticket, || {
                let label = priority_label(ticket.priority);
                println!("{} #{} priority {}", "✓".green(), ticket.id, label);
            })
        }
        TicketAction::Delete { id, .. } => {
            let ticket = desk.delete_ticket(TicketId(id)).await?;
            let cascaded = desk.config().cascade_delete;
            emit(format, &ticket, || {
                let suffix = if cascaded { " with comments and attachments" } else { "" };
                println!("Deleted ticket {}{}", format!("#{}", ticket.id).yellow(), suffix);
            })
        }
    }
}

// ---------------------------------------------------------------------------
// comment
// ---------------------------------------------------------------------------

async fn cmd_comment(
    desk: &TicketDesk,
    action: CommentAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match action {
        CommentAction::List { ticket } => {
            let list = desk.comments().list(TicketId(ticket)).await;
            emit(format, &list, || {
                if list.is_empty() {
                    println!("No comments on #{ticket}.");
                }
                list.iter().for_each(print_comment_line);
            })
        }
        CommentAction::Add { ticket, content } => {
            let comment = desk
                .comments()
                .create(TicketId(ticket), NewComment::new(content))
                .await?;
            emit(format, &comment, || {
                println!("{} Comment {} on #{}", "✓".green(), comment.id, ticket);
            })
        }
    }
}

// ---------------------------------------------------------------------------
// attachment
// ---------------------------------------------------------------------------

/// MIME type for the accepted extensions. Unknown extensions map to
/// `application/octet-stream`, which the upload check then rejects.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Where `attachment download` writes when no `--output` is given: the
/// stored name's final component, inside the working directory.
pub fn default_download_target(filename: &str) -> PathBuf {
    PathBuf::from(base_filename(filename).unwrap_or("download"))
}

async fn cmd_attachment(
    desk: &TicketDesk,
    action: AttachmentAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let attachments = desk.attachments();
    match action {
        AttachmentAction::List { ticket } => {
            let list = attachments.list(TicketId(ticket)).await;
            emit(format, &list, || {
                if list.is_empty() {
                    println!("No attachments on #{ticket}.");
                }
                list.iter().for_each(print_attachment_line);
            })
        }
        AttachmentAction::Upload {
            ticket,
            path,
            content_type,
        } => {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("{} has no usable file name", path.display()))?
                .to_string();
            let content_type =
                content_type.unwrap_or_else(|| guess_content_type(&path).to_string());
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let attachment = attachments
                .upload(TicketId(ticket), FileUpload::new(filename, content_type, data))
                .await?;
            emit(format, &attachment, || {
                println!(
                    "{} Attached {} to #{}",
                    "✓".green().bold(),
                    attachment.filename.bold(),
                    ticket
                );
                println!("  Key: {}", attachment.file_key.as_str().cyan());
            })
        }
        AttachmentAction::Delete { id } => {
            let removed = attachments.delete(&AttachmentId::new(id)).await?;
            emit(format, &removed, || {
                println!(
                    "Deleted attachment {} from #{}",
                    removed.id.as_str().yellow(),
                    removed.ticket_id
                );
            })
        }
        AttachmentAction::Download { file_key, output } => {
            let file = attachments.download(&FileKey::new(file_key)).await?;
            let target = output.unwrap_or_else(|| default_download_target(&file.filename));
            tokio::fs::write(&target, &file.data)
                .await
                .with_context(|| format!("writing {}", target.display()))?;
            let saved = serde_json::json!({
                "path": target.display().to_string(),
                "size": file.data.len(),
                "contentType": file.content_type,
            });
            emit(format, &saved, || {
                println!(
                    "{} Saved {} ({} bytes)",
                    "✓".green(),
                    target.display().to_string().bold(),
                    file.data.len()
                );
            })
        }
    }
}
