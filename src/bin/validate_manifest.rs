use al_service::cli;
use al_service::utils::truncation::truncate_error;
use clap::Parser;

#[tokio::main]
async fn main() {
    let args = cli::ValidateCli::parse();
    cli::init_logging(args.debug, args.no_color);

    if let Err(e) = cli::validate::handle_validate(args).await {
        eprintln!("Error: {}", truncate_error(&e.to_string()));
        std::process::exit(e.exit_code());
    }
}
