use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::config::AndrewConfig;
use andrew_server::AndrewServer;

pub fn add_serve_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("content_root")
                .value_name("CONTENT_ROOT")
                .help("Directory to serve [default: .]"),
        )
        .arg(
            Arg::new("address")
                .value_name("ADDRESS")
                .help("Address to listen on; :PORT listens on every interface [default: :8080]"),
        )
        .arg(
            Arg::new("base_url")
                .value_name("BASE_URL")
                .help("Public URL of the site, used in sitemap.xml and rss.xml [default: http://localhost:8080]"),
        )
        .arg(
            Arg::new("cert")
                .short('c')
                .long("cert")
                .value_name("FILE")
                .help("PEM certificate; serves https together with --privatekey"),
        )
        .arg(
            Arg::new("private_key")
                .short('p')
                .long("privatekey")
                .value_name("FILE")
                .help("PEM private key for --cert"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./andrew.toml if present]"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log at debug level")
                .action(ArgAction::SetTrue),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let config = AndrewConfig::load(args)?;
    log::debug!("{config:#?}");

    AndrewServer::new(config.server_config()).run().await
}
