use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tkt_types::{Category, Priority, Status};

#[derive(Parser)]
#[command(
    name = "tkt",
    about = "Ticket Desk: accounting support tickets over a blob store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Data directory (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// List, show, file, update or delete tickets
    Ticket(TicketArgs),
    /// List or add comments on a ticket
    Comment(CommentArgs),
    /// Manage files attached to tickets
    Attachment(AttachmentArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Keep everything in memory instead of the data directory
    #[arg(long)]
    pub memory: bool,
}

#[derive(Args)]
pub struct TicketArgs {
    #[command(subcommand)]
    pub action: TicketAction,
}

#[derive(Subcommand)]
pub enum TicketAction {
    /// List tickets, newest first
    List,
    /// Show one ticket with its comments and attachments
    Show { id: u64 },
    /// File a new ticket
    Create {
        title: String,
        #[arg(long)]
        category: Category,
        #[arg(short, long)]
        description: String,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<Status>,
    },
    /// Change a ticket's status
    Status { id: u64, status: Status },
    /// Change a ticket's priority
    Priority { id: u64, priority: Priority },
    /// Delete a ticket
    Delete {
        id: u64,
        /// Also remove its comments and attachments
        #[arg(long)]
        cascade: bool,
    },
}

#[derive(Args)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub action: CommentAction,
}

#[derive(Subcommand)]
pub enum CommentAction {
    /// List comments on a ticket, oldest first
    List { ticket: u64 },
    /// Add a comment to a ticket
    Add { ticket: u64, content: String },
}

#[derive(Args)]
pub struct AttachmentArgs {
    #[command(subcommand)]
    pub action: AttachmentAction,
}

#[derive(Subcommand)]
pub enum AttachmentAction {
    /// List attachments of a ticket
    List { ticket: u64 },
    /// Attach a local file to a ticket
    Upload {
        ticket: u64,
        path: PathBuf,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete an attachment by id
    Delete { id: String },
    /// Save a stored file
    Download {
        file_key: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ticket_create() {
        let cli = Cli::try_parse_from([
            "tkt", "ticket", "create", "Close March", "--category", "monthly financials",
            "-d", "books", "-p", "high",
        ])
        .unwrap();
        let Command::Ticket(TicketArgs {
            action:
                TicketAction::Create {
                    title,
                    category,
                    priority,
                    status,
                    ..
                },
        }) = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(title, "Close March");
        assert_eq!(category, Category::MonthlyFinancials);
        assert_eq!(priority, Some(Priority::High));
        assert_eq!(status, None);
    }

    #[test]
    fn parse_ticket_status() {
        let cli = Cli::try_parse_from(["tkt", "ticket", "status", "3", "in-progress"]).unwrap();
        let Command::Ticket(TicketArgs {
            action: TicketAction::Status { id, status },
        }) = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(id, 3);
        assert_eq!(status, Status::InProgress);
    }

    #[test]
    fn parse_rejects_unknown_category() {
        assert!(Cli::try_parse_from([
            "tkt", "ticket", "create", "t", "--category", "taxes", "-d", "x",
        ])
        .is_err());
    }

    #[test]
    fn parse_ticket_delete_cascade() {
        let cli = Cli::try_parse_from(["tkt", "ticket", "delete", "4", "--cascade"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Ticket(TicketArgs { action: TicketAction::Delete { id: 4, cascade: true } })
        ));
    }

    #[test]
    fn parse_attachment_upload() {
        let cli = Cli::try_parse_from(["tkt", "attachment", "upload", "2", "./tb.csv"]).unwrap();
        let Command::Attachment(AttachmentArgs {
            action:
                AttachmentAction::Upload {
                    ticket,
                    path,
                    content_type,
                },
        }) = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(ticket, 2);
        assert_eq!(path, PathBuf::from("./tb.csv"));
        assert!(content_type.is_none());
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["tkt", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
        assert!(!args.memory);
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "tkt", "--verbose", "--format", "json", "--data-dir", "/tmp/tkt", "ticket", "list",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/tkt")));
    }
}
