use console::style;
use journal_client::EntryCard;
use journal_common::{Entry, PolishState};

const SUMMARY_CHARS: usize = 80;

pub fn card(card: &EntryCard) -> String {
    let badge = match card.polish {
        PolishState::Polished => style("polished").green().to_string(),
        PolishState::Polishing => style("polishing").yellow().to_string(),
        PolishState::Unpolished => style("draft").dim().to_string(),
    };
    let mut out = format!(
        "{}  {}  {}\n{}",
        style(card.entry.date.format("%Y-%m-%d %H:%M")).bold(),
        style(card.entry.id).dim(),
        badge,
        card.entry.raw_text.trim_end()
    );
    if let Some(url) = &card.photo_url {
        out.push_str(&format!("\n{} {url}", style("photo:").cyan()));
    }
    out
}

/// One-line preview used before destructive actions.
pub fn summary(entry: &Entry) -> String {
    let text = entry.raw_text.split_whitespace().collect::<Vec<_>>().join(" ");
    let preview = if text.chars().count() > SUMMARY_CHARS {
        let cut: String = text.chars().take(SUMMARY_CHARS).collect();
        format!("{cut}...")
    } else {
        text
    };
    format!("{}  {preview}", entry.date.format("%Y-%m-%d"))
}

pub fn polished(entry: &Entry) -> String {
    match &entry.polished_text {
        Some(markup) => markup.clone(),
        None => style("(no polished text returned)").dim().to_string(),
    }
}
