use clap::Parser;
use cv_intake::client::{
    Candidate, FileAcceptor, NoticeKind, Notices, ReqwestTransport, UploadOrchestrator,
};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Submit a CV to the intake server", long_about = None)]
struct Args {
    /// Base URL of the intake server
    #[arg(short, long, env = "CV_INTAKE_URL", default_value = "http://localhost:8080")]
    server: String,

    /// CV to submit (PDF or DOCX). Only the first file is used.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn print_notices(notices: &Notices) {
    for notice in notices.drain() {
        match notice.kind {
            NoticeKind::Error => eprintln!("❌ {}", notice.message),
            NoticeKind::Success => println!("✅ {}", notice.message),
            NoticeKind::Info => println!("ℹ️  {}", notice.message),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cv_intake=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let notices = Arc::new(Notices::new());
    let mut acceptor = FileAcceptor::new();

    let Some(path) = args.files.first() else {
        return Ok(ExitCode::FAILURE);
    };
    if args.files.len() > 1 {
        notices.info(format!(
            "Only the first file is used; ignoring {} more",
            args.files.len() - 1
        ));
    }

    let candidate = Candidate::from_path(path).await?;
    if let Err(e) = acceptor.select(candidate) {
        notices.error(e.to_string());
        print_notices(&notices);
        eprintln!("{}", cv_intake::utils::validation::ACCEPTED_HINT);
        return Ok(ExitCode::FAILURE);
    }

    for record in acceptor.recent() {
        println!("📄 {} ({})", record.name, record.size_label());
    }

    let transport = ReqwestTransport::new(&args.server)?;
    let orchestrator = UploadOrchestrator::new(transport, notices.clone());

    let outcome = orchestrator.submit(&acceptor).await;
    print_notices(&notices);

    match outcome {
        Ok(receipt) => {
            if !receipt.file_path.is_empty() {
                println!("Stored at {}", receipt.file_path);
            }
            orchestrator.acknowledge();
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
