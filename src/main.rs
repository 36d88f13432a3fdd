use std::path::Path;

use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use tracing_subscriber::EnvFilter;

use oven::{
    build::{build_site, load_pages},
    config::{Config, DEFAULT_CONFIG_FILE},
    parser::PostParser,
    slug::Slugifier,
    write::file_names,
};

fn main() -> Result<()> {
    let config_arg = Arg::with_name("config")
        .short("c")
        .long("config")
        .value_name("PATH")
        .takes_value(true)
        .help(
            "The site config file. Defaults to the nearest `oven.json` in the \
             current directory or its parents.",
        );

    let matches = App::new("oven")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bakes a directory of plain-text posts into a static blog")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Log every file as it is parsed and written"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .global(true)
                .conflicts_with("verbose")
                .help("Only log warnings and errors"),
        )
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site")
                .arg(config_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Lists the posts in publication order")
                .arg(config_arg),
        )
        .get_matches();

    init_logging(&matches);

    match matches.subcommand() {
        ("build", Some(sub)) => build(&load_config(sub)?),
        ("list", Some(sub)) => list(&load_config(sub)?),
        // clap rejects anything else before we get here
        _ => Ok(()),
    }
}

fn init_logging(matches: &ArgMatches) {
    let default = if matches.is_present("verbose") {
        "debug"
    } else if matches.is_present("quiet") {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    match matches.value_of("config") {
        Some(path) => Config::from_file(Path::new(path))
            .with_context(|| format!("loading configuration from `{}`", path)),
        None => {
            let cwd = std::env::current_dir()
                .context("getting current directory")?;
            Config::from_directory(&cwd)
                .with_context(|| format!("loading `{}`", DEFAULT_CONFIG_FILE))
        }
    }
}

fn build(config: &Config) -> Result<()> {
    let report = build_site(config).context("building site")?;
    for err in &report.failed {
        eprintln!("failed: {}", err);
    }
    println!(
        "{} pages, {} files written to {}",
        report.pages,
        report.files.len(),
        config.output_directory.display()
    );
    Ok(())
}

fn list(config: &Config) -> Result<()> {
    let (pages, failed) = load_pages(config, &PostParser::default())
        .context("loading posts")?;
    let names = file_names(&pages, &Slugifier::new());
    for link in &pages {
        println!(
            "{}  {:<32}  {}",
            link.post.created_at.format("%Y-%m-%d %H:%M"),
            names[link.index()],
            link.post.title
        );
    }
    for err in &failed {
        eprintln!("failed: {}", err);
    }
    Ok(())
}
