//! `docs` listing and the `doc` subcommands

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use console::style;
use regex::Regex;

use super::output::Output;
use super::render;
use super::session::Session;
use super::system;
use crate::api::{DocSearch, DocUpdate, NewDoc};
use crate::domain::{Doc, DocSummary};

/// List docs, or search them by title
#[derive(Args, Debug, Clone, Default)]
pub struct DocsArgs {
    /// Search docs by title (required for the search filters)
    #[arg(short = 't', long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Search archived docs
    #[arg(short = 'a', long)]
    pub archived: bool,

    /// Search docs created by me
    #[arg(short = 'm', long)]
    pub mine: bool,

    /// Search docs I am following
    #[arg(short = 'f', long)]
    pub following: bool,

    /// Print only doc output, no progress messages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Print only the ids of matching docs
    #[arg(short = 'I', long)]
    pub idonly: bool,
}

impl DocsArgs {
    fn search(&self) -> Option<DocSearch> {
        let title = self.title.clone().filter(|t| !t.is_empty())?;
        Some(DocSearch {
            title,
            archived: self.archived.then_some(true),
            created_by_me: self.mine,
            followed_by_me: self.following,
        })
    }

    fn has_search_filters(&self) -> bool {
        self.archived || self.mine || self.following
    }
}

/// View, create, update or delete a doc. `short doc <UUID>` views it.
#[derive(Subcommand, Debug, Clone)]
pub enum DocCommands {
    /// View a doc by id
    View {
        id: String,

        /// Include HTML content
        #[arg(long)]
        html: bool,

        /// Open the doc in the browser
        #[arg(short = 'O', long)]
        open: bool,

        /// Print only the doc content, no metadata
        #[arg(short = 'q', long)]
        quiet: bool,
    },

    /// Create a new doc
    Create {
        /// Title of the doc
        #[arg(short = 't', long, value_name = "TEXT")]
        title: String,

        /// Content of the doc
        #[arg(short = 'c', long, value_name = "TEXT")]
        content: String,

        /// Treat content as markdown (default is HTML)
        #[arg(long)]
        markdown: bool,

        /// Print only the id of the created doc
        #[arg(short = 'I', long)]
        idonly: bool,

        /// Open the doc in the browser
        #[arg(short = 'O', long)]
        open: bool,
    },

    /// Update an existing doc
    Update {
        id: String,

        /// New title
        #[arg(short = 't', long, value_name = "TEXT")]
        title: Option<String>,

        /// New content
        #[arg(short = 'c', long, value_name = "TEXT")]
        content: Option<String>,

        /// Treat content as markdown (default is HTML)
        #[arg(long)]
        markdown: bool,

        /// Open the doc in the browser
        #[arg(short = 'O', long)]
        open: bool,
    },

    /// Delete a doc
    Delete {
        id: String,

        /// Confirm the deletion
        #[arg(long)]
        confirm: bool,
    },
}

fn content_format(markdown: bool) -> &'static str {
    if markdown {
        "markdown"
    } else {
        "html"
    }
}

fn is_uuid(s: &str) -> bool {
    static UUID: OnceLock<Option<Regex>> = OnceLock::new();
    UUID.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").ok()
    })
    .as_ref()
    .is_some_and(|re| re.is_match(s))
}

/// Rewrites `doc <UUID> ...` into `doc view <UUID> ...`
///
/// Only the subcommand position counts, i.e. the first argument after any
/// leading global flags.
pub fn expand_view_shorthand(args: Vec<OsString>) -> Vec<OsString> {
    let mut pos = 1;
    while let Some(arg) = args.get(pos).and_then(|a| a.to_str()) {
        match arg {
            "--output" => pos += 2,
            "-v" | "--verbose" => pos += 1,
            _ if arg.starts_with("--output=") => pos += 1,
            _ => break,
        }
    }

    let is_doc = args.get(pos).is_some_and(|a| a == "doc");
    match args.get(pos + 1).and_then(|a| a.to_str()) {
        Some(next) if is_doc && is_uuid(next) => {
            let mut args = args;
            args.insert(pos + 1, OsString::from("view"));
            args
        }
        _ => args,
    }
}

pub async fn list(args: DocsArgs, session: &Session, output: &Output) -> Result<()> {
    let output = output.quiet(args.quiet || args.idonly);
    let client = session.client()?;

    output.status("Loading docs ...");
    let docs = match args.search() {
        Some(search) => client.search_docs(&search).await,
        None => {
            if args.has_search_filters() {
                output.line("Note: --archived, --mine, and --following require --title for searching.");
                output.line("Listing all docs instead...");
            }
            client.list_docs().await
        }
    }
    .context("Error fetching docs")?;

    print_docs(&docs, args.idonly, &output)?;
    Ok(())
}

fn print_docs(docs: &[DocSummary], idonly: bool, output: &Output) -> io::Result<()> {
    if output.is_json() {
        output.data(&docs);
        return Ok(());
    }
    let mut out = io::stdout().lock();
    if docs.is_empty() {
        return writeln!(out, "No docs found.");
    }
    for doc in docs {
        if idonly {
            writeln!(out, "{}", doc.id)?;
        } else {
            writeln!(out, "{} {}", doc.id, doc.title.as_deref().unwrap_or("(Untitled)"))?;
            writeln!(out, "\tURL: {}", doc.app_url)?;
        }
    }
    Ok(())
}

pub async fn run(command: DocCommands, session: &Session, output: &Output) -> Result<()> {
    match command {
        DocCommands::View {
            id,
            html,
            open,
            quiet,
        } => {
            let output = output.quiet(quiet);
            let client = session.client()?;
            output.status("Loading doc ...");
            let doc = client
                .get_doc(&id, html)
                .await
                .context("Error fetching doc")?;

            let mut out = io::stdout();
            if output.is_json() {
                output.data(&doc);
            } else if quiet {
                let content = doc
                    .content_markdown
                    .as_deref()
                    .or(doc.content_html.as_deref())
                    .unwrap_or("(No content)");
                writeln!(out, "{}", content)?;
            } else {
                write!(out, "{}", render::doc_detail(&doc, html))?;
            }
            open_doc(&doc, open)
        }
        DocCommands::Create {
            title,
            content,
            markdown,
            idonly,
            open,
        } => {
            if title.trim().is_empty() {
                anyhow::bail!("Must provide --title");
            }
            if content.is_empty() {
                anyhow::bail!("Must provide --content");
            }
            let client = session.client()?;
            let body = NewDoc {
                title,
                content,
                content_format: content_format(markdown),
            };
            let created = client.create_doc(&body).await.context("Error creating doc")?;
            let doc = client
                .get_doc(&created.id, false)
                .await
                .context("Error creating doc")?;

            let mut out = io::stdout();
            if output.is_json() {
                output.data(&doc);
            } else if idonly {
                writeln!(out, "{}", doc.id)?;
            } else {
                writeln!(out, "{}", style("Doc created successfully!").green())?;
                write!(out, "{}", render::doc_detail(&doc, false))?;
            }
            open_doc(&doc, open)
        }
        DocCommands::Update {
            id,
            title,
            content,
            markdown,
            open,
        } => {
            let update = DocUpdate {
                title: title.filter(|t| !t.is_empty()),
                content_format: content.as_ref().map(|_| content_format(markdown)),
                content: content.filter(|c| !c.is_empty()),
            };
            if update.title.is_none() && update.content.is_none() {
                anyhow::bail!("Must provide --title and/or --content to update");
            }
            let client = session.client()?;
            let doc = client
                .update_doc(&id, &update)
                .await
                .context("Error updating doc")?;

            let mut out = io::stdout();
            if output.is_json() {
                output.data(&doc);
            } else {
                writeln!(out, "{}", style("Doc updated successfully!").green())?;
                write!(out, "{}", render::doc_detail(&doc, false))?;
            }
            open_doc(&doc, open)
        }
        DocCommands::Delete { id, confirm } => {
            if !confirm {
                anyhow::bail!("Deletion requires --confirm flag\nUsage: short doc delete <id> --confirm");
            }
            let client = session.client()?;
            client.delete_doc(&id).await.context("Error deleting doc")?;
            output.success(&format!("Doc {} deleted successfully.", id));
            Ok(())
        }
    }
}

fn open_doc(doc: &Doc, open: bool) -> Result<()> {
    if open {
        system::open_url(&doc.app_url)?;
    }
    Ok(())
}
