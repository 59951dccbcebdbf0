use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = vodlinksctl::Cli::parse();
    vodlinksctl::init_tracing(&cli.log_level);
    if let Err(err) = vodlinksctl::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
