mod config;
mod mime;
mod output;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use explica_client::{FileStore, HttpBackend, Orchestrator, Step, SUGGESTED_QUESTIONS};
use explica_core::{DetailLevel, ExplicaError, ImagePayload, SUPPORTED_LANGUAGES};
use explica_gateway::{start_server, GatewayState};
use explica_providers::OpenAiCompatProvider;

use config::Config;

#[derive(Parser)]
#[command(name = "explica")]
#[command(about = "ExplicaAí: explica imagens em linguagem simples")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the analyze-image and translate functions
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Analyse an image, optionally asking follow-ups and translating the result
    Analyze {
        /// Image file (png, jpg, webp, ...)
        image: PathBuf,
        /// What you want to know about the image
        #[arg(short, long)]
        context: Option<String>,
        /// short, standard or detailed
        #[arg(short, long)]
        detail: Option<DetailLevel>,
        /// Follow-up question, asked in order after the first analysis
        #[arg(long)]
        ask: Vec<String>,
        /// Translate the final result (pt, en, es, fr, de)
        #[arg(short, long)]
        translate: Option<String>,
    },
    /// Show or set the display name
    Name {
        name: Option<String>,
    },
    /// List supported translation languages
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            explica_logging::init_logger(&config.log_dir, &config.log_level);
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Analyze {
            image,
            context,
            detail,
            ask,
            translate,
        } => {
            explica_logging::init_console_logger(&config.log_level);
            let orch = open_session(&config).await;
            let request = AnalyzeArgs {
                image: &image,
                context: context.as_deref(),
                detail,
                questions: &ask,
                language: translate.as_deref(),
            };
            if let Err(e) = run_analysis(&orch, request).await {
                report_and_exit(e);
            }
        }
        Commands::Name { name } => {
            explica_logging::init_console_logger(&config.log_level);
            let orch = open_session(&config).await;
            match name {
                Some(name) => match orch.submit_name(&name).await {
                    Ok(_) => output::note_success(&format!(
                        "Olá, {}!",
                        orch.user_name().await.unwrap_or_default()
                    )),
                    Err(e) => report_and_exit(e.into()),
                },
                None => match orch.user_name().await {
                    Some(name) => println!("{name}"),
                    None => output::note_info("Nenhum nome salvo. Use `explica name <NOME>`."),
                },
            }
        }
        Commands::Languages => {
            let rows: Vec<Vec<String>> = SUPPORTED_LANGUAGES
                .iter()
                .map(|l| vec![l.code.to_string(), l.label.to_string()])
                .collect();
            print!("{}", output::render_table(&["Código", "Idioma"], &rows));
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        model = %config.ai_model,
        "Starting ExplicaAí gateway"
    );

    let state = match &config.ai_api_key {
        Some(api_key) => {
            let provider = OpenAiCompatProvider::new(api_key).with_base_url(&config.ai_base_url);
            info!(base_url = %config.ai_base_url, "Registered AI gateway provider");
            GatewayState::new(Arc::new(provider), &config.ai_model)
        }
        None => GatewayState::unconfigured(),
    }
    .with_max_body_bytes(config.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", config.bind_address, config.port))?;

    start_server(addr, state).await
}

async fn open_session(config: &Config) -> Orchestrator {
    let mut backend = HttpBackend::new(&config.functions_url);
    if let Some(key) = &config.publishable_key {
        backend = backend.with_publishable_key(key);
    }
    let store = FileStore::in_dir(&config.state_dir);
    Orchestrator::open(Arc::new(backend), Arc::new(store)).await
}

struct AnalyzeArgs<'a> {
    image: &'a Path,
    context: Option<&'a str>,
    detail: Option<DetailLevel>,
    questions: &'a [String],
    language: Option<&'a str>,
}

async fn load_image(path: &Path) -> Result<ImagePayload> {
    let mime_type = mime::detect_image_mime(path).ok_or_else(|| {
        anyhow!(ExplicaError::MissingInput(format!(
            "Formato não suportado: {}",
            path.display()
        )))
    })?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    Ok(ImagePayload::new(bytes, mime_type)?)
}

async fn run_analysis(orch: &Orchestrator, args: AnalyzeArgs<'_>) -> Result<()> {
    if orch.step().await == Step::Name {
        output::note_info("Dica: salve seu nome com `explica name <NOME>`.");
    } else if let Some(name) = orch.user_name().await {
        output::note_info(&format!("Olá, {name}! Analisando a imagem..."));
    }

    let image = load_image(args.image).await?;
    orch.analyze(image, args.context, args.detail).await?;
    print_current(orch).await;

    for question in args.questions {
        println!();
        output::note_info(&format!("Pergunta: {question}"));
        orch.follow_up(question).await?;
        print_current(orch).await;
    }

    if let Some(language) = args.language {
        orch.translate(language).await?;
        println!();
        print_current(orch).await;
    }

    output::print_suggestions(&SUGGESTED_QUESTIONS);
    Ok(())
}

async fn print_current(orch: &Orchestrator) {
    if let Some(view) = orch.display().await {
        println!();
        output::print_view(&view);
    }
}

/// Print one user-facing message and exit non-zero.
fn report_and_exit(err: anyhow::Error) -> ! {
    match err.downcast_ref::<ExplicaError>() {
        Some(e) => {
            output::note_error(&e.user_message());
            if let Some(hint) = retry_hint(e) {
                output::note_info(hint);
            }
        }
        None => output::note_error(&format!("{err:#}")),
    }
    std::process::exit(1);
}

/// Follow-up line for failures that may clear up on their own.
fn retry_hint(err: &ExplicaError) -> Option<&'static str> {
    err.is_retryable()
        .then_some("Você pode tentar novamente em instantes.")
}
