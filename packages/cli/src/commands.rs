use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use console::style;
use dialoguer::Confirm;
use journal_client::{
    EntriesApi, EntryFeed, HttpEntriesApi, LoadOutcome, PhotoUpload, PublicUrlResolver,
};
use uuid::Uuid;

use crate::render;
use crate::{Cli, Command};

type Feed = EntryFeed<HttpEntriesApi, PublicUrlResolver>;

pub async fn run(cli: Cli) -> Result<()> {
    let token = cli
        .token
        .filter(|t| !t.trim().is_empty())
        .context("No token given; pass --token or set JOURNAL_TOKEN")?;
    let api = Arc::new(HttpEntriesApi::new(&cli.api_url, token));
    let resolver = Arc::new(PublicUrlResolver::new(&cli.api_url));

    match cli.command {
        Command::List { limit, all } => {
            list(&EntryFeed::with_page_size(api, resolver, limit), all).await
        }
        Command::New { text, photo, date } => {
            new_entry(&EntryFeed::new(api, resolver), &text, photo.as_deref(), date).await
        }
        Command::Edit { id, text } => edit(&EntryFeed::new(api, resolver), id, &text).await,
        Command::Polish { id } => polish(api.as_ref(), id).await,
        Command::Delete { id, yes } => {
            let feed = EntryFeed::new(api.clone(), resolver);
            delete(api.as_ref(), &feed, id, yes).await
        }
    }
}

async fn list(feed: &Feed, all: bool) -> Result<()> {
    feed.load_first_page()
        .await
        .context("Failed to load entries")?;
    if all {
        while let LoadOutcome::Loaded(_) = feed
            .load_next_page()
            .await
            .context("Failed to load more entries")?
        {}
    }

    let snapshot = feed.snapshot();
    if snapshot.cards.is_empty() {
        println!("{}", style("No entries yet.").dim());
        return Ok(());
    }
    for card in &snapshot.cards {
        println!("{}\n", render::card(card));
    }
    if snapshot.has_more {
        println!(
            "{}",
            style("More entries available; run with --all to see them.").dim()
        );
    }
    Ok(())
}

async fn new_entry(
    feed: &Feed,
    text: &str,
    photo: Option<&Path>,
    date: Option<DateTime<Utc>>,
) -> Result<()> {
    let upload = match photo {
        Some(path) => Some(read_photo(path).await?),
        None => None,
    };

    let created = feed
        .create(text, date, upload)
        .await
        .context("Failed to save entry")?;
    println!("{} {}", style("Saved").green().bold(), created.entry.id);
    if let Some(e) = created.photo_error {
        eprintln!("{} photo was not attached: {e}", style("warning:").yellow().bold());
    }
    Ok(())
}

async fn read_photo(path: &Path) -> Result<PhotoUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Photo path has no usable file name")?
        .to_string();
    let content_type = mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .with_context(|| format!("{} does not look like an image", path.display()))?;

    Ok(PhotoUpload {
        file_name,
        content_type: content_type.essence_str().to_string(),
        bytes,
    })
}

async fn edit(feed: &Feed, id: Uuid, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        bail!("Entry text must not be empty");
    }
    let entry = feed.edit(id, text).await.context("Failed to edit entry")?;
    println!(
        "{} {} (polished text cleared)",
        style("Updated").green().bold(),
        entry.id
    );
    Ok(())
}

async fn polish(api: &HttpEntriesApi, id: Uuid) -> Result<()> {
    eprintln!("{}", style("Polishing...").dim());
    let entry = api.polish(id).await.map_err(|e| {
        let hint = if e.is_retryable() { " (try again later)" } else { "" };
        anyhow::anyhow!("Failed to polish entry: {e}{hint}")
    })?;
    println!("{}", render::polished(&entry));
    Ok(())
}

async fn delete(api: &HttpEntriesApi, feed: &Feed, id: Uuid, yes: bool) -> Result<()> {
    if !yes {
        let entry = api.get(id).await.context("Failed to load entry")?;
        println!("{}", render::summary(&entry));
        let confirmed = Confirm::new()
            .with_prompt("Delete this entry and its photos?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Kept.").dim());
            return Ok(());
        }
    }
    feed.delete(id).await.context("Failed to delete entry")?;
    println!("{} {id}", style("Deleted").red().bold());
    Ok(())
}
