use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::{AppConfig, ChatFactory, Notice};

fn print_notice(notice: &Notice) {
    eprintln!("{}: {}", notice.severity, notice.message);
}

pub async fn run(config: AppConfig) -> Result<()> {
    // Keep the prompt readable, only warnings and above by default
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let factory = ChatFactory::from_config(&config)?;
    let mut chat = factory.build(None)?;
    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                match chat.submit(&line).await {
                    Ok(submission) => {
                        println!("{}", submission.reply);
                        submission.notices.iter().for_each(print_notice);
                    }
                    Err(err) => print_notice(&Notice::from(&err)),
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
