use std::env;
use std::sync::Arc;

use anyhow::Result;
use log::LevelFilter;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use quillpad::command_processor::CommandProcessor;
use quillpad::{Config, DocumentSession, DocumentStore, FileStore};

#[tokio::main]
async fn main() -> Result<()> {
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("quillpad", LevelFilter::Debug);
    }
    logger.init();

    let config = match Config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("設定の読み込みに失敗しました: {}", e);
            return Err(e);
        }
    };
    let store: Arc<dyn DocumentStore> = Arc::new(FileStore::from_config(&config.storage)?);

    // Optional document id to reopen
    let args: Vec<String> = env::args().collect();
    let mut session = if args.len() > 1 {
        match DocumentSession::open(store.clone(), &config, &args[1]).await {
            Ok(session) => {
                println!("Opened \"{}\"", session.title());
                session
            }
            Err(e) => {
                eprintln!("ドキュメントを開けませんでした: {}", e);
                log::error!("Failed to open document '{}': {}", args[1], e);
                DocumentSession::new(store.clone(), &config)
            }
        }
    } else {
        log::info!("No document specified, starting with an empty one");
        DocumentSession::new(store.clone(), &config)
    };

    let processor = CommandProcessor::new(store, config);
    let res = run_repl(&processor, &mut session).await;
    session.close();

    if let Err(err) = res {
        eprintln!("実行中にエラーが発生しました: {}", err);
        log::error!("Application error: {}", err);
    }
    Ok(())
}

async fn run_repl(processor: &CommandProcessor, session: &mut DocumentSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut should_quit = false;
    let mut last_notice = None;

    while !should_quit {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let output = match line.strip_prefix(':') {
            Some(command) => match processor.execute_command(command, session, &mut should_quit).await {
                Ok(message) => message,
                Err(e) => format!("Error: {}", e),
            },
            None => {
                processor.type_line(&line, session);
                String::new()
            }
        };
        if !output.is_empty() {
            println!("{}", output);
        }
        if let Some(message) = session.update_status() {
            if last_notice != Some(message.created_at()) {
                println!("[{:?}] {}", message.message_type, message.content);
                last_notice = Some(message.created_at());
            }
        }
    }

    log::info!("Input loop ended");
    Ok(())
}
