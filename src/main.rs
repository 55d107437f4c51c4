use clap::Parser;
use repo_chat::cli::{self, Cli};
use repo_chat::error::exit_code;

fn main() {
    // A .env file in the working directory may provide OPENAI_API_KEY and GITHUB_TOKEN
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    cli::init_logging(&cli);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            std::process::exit(exit_code::FAILURE);
        }
    };

    let code = runtime.block_on(cli::run(cli));
    std::process::exit(code);
}
