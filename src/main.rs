use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use concord::advisory::{HttpSuggester, NullSuggester, SuggestionService};
use concord::config::ArbiterConfig;
use concord::intent::SessionId;
use concord::pipeline::{Pipeline, TurnOutcome};
use concord::store::MemoryStore;
use concord::telemetry::TracingSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    tracing::info!("Concord pipeline booting...");

    let store = Arc::new(MemoryStore::new());

    let suggester: Arc<dyn SuggestionService> = match std::env::var("CONCORD_ADVISOR_URL") {
        Ok(url) => {
            tracing::info!(%url, "advisory suggester enabled");
            Arc::new(HttpSuggester::new(url))
        }
        Err(_) => {
            tracing::info!("no advisor configured, running deterministic-only");
            Arc::new(NullSuggester)
        }
    };

    let pipeline = Pipeline::new(store, suggester, ArbiterConfig::default())
        .with_sink(Arc::new(TracingSink));
    let session = SessionId::new("local");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        if text == "quit" || text == "exit" {
            break;
        }

        let reply = match pipeline.handle(text, &session).await {
            Ok(TurnOutcome::Done { result }) => format!("{:?}", result),
            Ok(TurnOutcome::NeedsReply { question, options }) => {
                if options.is_empty() {
                    question
                } else {
                    format!("{} (e.g. {})", question, options.join(", "))
                }
            }
            Ok(TurnOutcome::Refused { reason }) => reason,
            Err(e) => {
                tracing::error!("execution fault: {e}");
                format!("something went wrong: {e}")
            }
        };

        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
