use clap::Command;
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod cmd;
mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = Command::new("andrew")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Serve a directory of html pages, generating tables of contents on request");
    let args = cmd::serve::add_serve_args(command).get_matches();

    let level = if args.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    cmd::serve::execute(&args).await
}
