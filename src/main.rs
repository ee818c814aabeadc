use anyhow::{anyhow, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::info;
use quire::collect::MalformedPolicy;
use quire::config::Config;
use quire::document::Document;
use quire::feed::{write_feeds, FeedConfig};
use quire::index::Site;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = App::new("quire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Collects blog documents and indexes them for publishing")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("The project file (default: search for quire.yaml from the current directory up)"),
        )
        .arg(
            Arg::with_name("threads")
                .short("j")
                .long("threads")
                .value_name("N")
                .takes_value(true)
                .help("The number of parser threads"),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Lists documents, most recent first")
                .arg(
                    Arg::with_name("drafts")
                        .long("drafts")
                        .help("Also lists drafts"),
                ),
        )
        .subcommand(
            SubCommand::with_name("check")
                .about("Parses every document and fails on the first malformed one"),
        )
        .subcommand(
            SubCommand::with_name("feed")
                .about("Writes the Atom feeds")
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .value_name("DIR")
                        .takes_value(true)
                        .required(true)
                        .help("The output directory"),
                ),
        )
        .get_matches();

    let config = load_config(&matches)?;
    match matches.subcommand() {
        ("list", Some(sub)) => list(&config, sub.is_present("drafts")),
        ("check", Some(_)) => check(&config),
        ("feed", Some(sub)) => match sub.value_of("output") {
            Some(output) => feed(&config, Path::new(output)),
            None => Err(anyhow!("Missing `--output`")),
        },
        _ => Err(anyhow!("Unknown subcommand")),
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let threads = matches
        .value_of("threads")
        .map(|n| n.parse::<usize>())
        .transpose()?;
    match matches.value_of("config") {
        Some(path) => Config::from_project_file(Path::new(path), threads),
        None => Config::from_directory(&std::env::current_dir()?, threads),
    }
}

fn collect(config: &Config) -> Result<Site> {
    let documents = config.collector().collect(&config.content_directory)?;
    Ok(Site::new(documents))
}

fn list(config: &Config, drafts: bool) -> Result<()> {
    let site = collect(config)?;
    for document in site.documents() {
        println!("{}", summarize(document));
    }
    if drafts {
        for document in site.drafts() {
            println!("{} (draft)", summarize(document));
        }
    }
    Ok(())
}

fn summarize(document: &Document) -> String {
    let mut line = format!("{}  {}", document.date.format("%Y-%m-%d"), document.title);
    if let Some(category) = &document.category {
        line.push_str(&format!("  [{}]", category));
    }
    if !document.tags.is_empty() {
        let tags: Vec<&str> = document.tags.iter().map(String::as_str).collect();
        line.push_str(&format!("  #{}", tags.join(" #")));
    }
    line
}

fn check(config: &Config) -> Result<()> {
    let mut collector = config.collector();
    collector.on_malformed = MalformedPolicy::Abort;
    let documents = collector.collect(&config.content_directory)?;
    println!("{} documents OK", documents.len());
    Ok(())
}

fn feed(config: &Config, output_directory: &Path) -> Result<()> {
    let site_url = config
        .site_url
        .as_ref()
        .ok_or_else(|| anyhow!("`site_url` must be set to write feeds"))?;
    let site = collect(config)?;
    let written = write_feeds(
        &FeedConfig {
            title: config.site_name.clone(),
            site_url,
            author: config.author.clone(),
        },
        &site,
        output_directory,
        config.feed_all_atom.as_deref(),
        config.category_feed_atom.as_deref(),
    )?;
    for path in written {
        info!("Wrote `{}`", path.display());
    }
    Ok(())
}
