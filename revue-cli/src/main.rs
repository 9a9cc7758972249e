use std::process::ExitCode;
use std::sync::Arc;

use revue_core::{FeedItem, FeedTab, HttpGateway, LoadOutcome, RevueConfig, Session};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: revue-cli [for-you | friends | profile:<user id>] [pages]";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let tab = match args.next().as_deref().map(parse_tab) {
        None => FeedTab::ForYou,
        Some(Some(tab)) => tab,
        Some(None) => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    let pages = match args.next().map(|raw| raw.parse::<usize>()) {
        None => 1,
        Some(Ok(n)) if n > 0 => n,
        Some(_) => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let config = RevueConfig::load().with_env_overrides();
    let gateway = match HttpGateway::new(&config.backend) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, url = %config.backend.url, "could not build backend client");
            return ExitCode::FAILURE;
        }
    };
    gateway.set_access_token(std::env::var("REVUE_ACCESS_TOKEN").ok());

    let session = Session::new(Arc::new(gateway), &config);
    if let Err(e) = session.start().await {
        // Without the hidden set the feed is still usable, just unfiltered.
        error!(error = %e, "failed to load hidden posts");
    }

    if let LoadOutcome::Failed(e) = session.feeds().load_initial(&tab).await {
        error!(%tab, error = %e, "initial load failed");
        return ExitCode::FAILURE;
    }
    for _ in 1..pages {
        // Wait out the shared load-more throttle between pages.
        tokio::time::sleep(session.feeds().config().load_more_throttle()).await;
        match session.feeds().load_more(&tab).await {
            LoadOutcome::Loaded { added, has_more } => {
                info!(%tab, added, has_more, "page loaded");
            }
            LoadOutcome::Failed(e) => {
                error!(%tab, error = %e, "load more failed");
                break;
            }
            LoadOutcome::Skipped(reason) => {
                info!(%tab, ?reason, "stopped paging");
                break;
            }
            LoadOutcome::Stale => break,
        }
    }

    for item in session.feeds().current_items(&tab).await {
        println!("{}", describe(&item));
    }
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_tab(raw: &str) -> Option<FeedTab> {
    match raw {
        "for-you" | "foryou" => Some(FeedTab::ForYou),
        "friends" => Some(FeedTab::Friends),
        other => other
            .strip_prefix("profile:")
            .filter(|id| !id.is_empty())
            .map(|id| FeedTab::Profile(id.to_string())),
    }
}

fn describe(item: &FeedItem) -> String {
    let media = item
        .media
        .as_ref()
        .map(|media| media.title.as_str())
        .unwrap_or("-");
    let rating = item
        .rating
        .map(|r| format!("{r:.1}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  @{}  [{}] {}  likes:{} comments:{}{}",
        item.id,
        item.author.username,
        media,
        rating,
        item.like_count,
        item.comment_count,
        if item.is_bookmarked { "  (saved)" } else { "" }
    )
}
