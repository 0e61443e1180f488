use al_service::cli;
use al_service::utils::truncation::truncate_error;
use clap::Parser;

#[tokio::main]
async fn main() {
    let args = cli::RunOnceCli::parse();
    cli::init_logging(args.debug, args.no_color);

    if let Err(e) = cli::run_once::handle_run_once(args).await {
        eprintln!("Error: {}", truncate_error(&e.to_string()));
        std::process::exit(e.exit_code());
    }
}
