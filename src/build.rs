//! Exports the [`build_site`] function which stitches together the high-level
//! steps of baking the site: discovering and parsing the posts
//! ([`crate::post`]), linking them ([`crate::collection`]), rendering post and
//! index pages ([`crate::write`]), and generating the Atom feed
//! ([`crate::feed`]).

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    collection::{Pages, PostCollection},
    config::Config,
    feed::{self, write_feed, FeedConfig, FEED_FILE},
    parser::PostParser,
    post::{self, Post},
    slug::Slugifier,
    theme::{self, Theme},
    write::{self, file_names, Site, Writer},
};

/// Walks `dir` and returns the files accepted by [`Config::is_post_file`], in
/// a stable order (sorted by file name within each directory). Entries that
/// can't be read are logged and skipped.
pub fn discover(config: &Config, dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::SourceDirectory(dir.to_owned()));
    }

    let mut paths = Vec::new();
    let walker =
        WalkDir::new(dir).sort_by(|a, b| a.file_name().cmp(b.file_name()));
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        if entry.file_type().is_file() && config.is_post_file(entry.path()) {
            debug!("found post {}", entry.path().display());
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Parses every file in `paths` in parallel. Posts that parse are collected
/// in the order of `paths`; a failure affects only its own file and is
/// returned alongside the collection.
pub fn parse_posts(
    parser: &PostParser,
    paths: &[PathBuf],
) -> (PostCollection, Vec<post::Error>) {
    let results: Vec<post::Result<Post>> = paths
        .par_iter()
        .map(|path| Post::open(parser, path))
        .collect();

    let mut posts = PostCollection::new();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(post) => {
                debug!("parsed {} ({:?})", post.path.display(), post.title);
                posts.push(post);
            }
            Err(err) => {
                warn!("skipping {}", err);
                failed.push(err);
            }
        }
    }
    (posts, failed)
}

/// Discovers, parses and links the posts of the site described by `config`.
pub fn load_pages(
    config: &Config,
    parser: &PostParser,
) -> Result<(Pages, Vec<post::Error>)> {
    let paths = discover(config, &config.source_directory)?;
    let (posts, failed) = parse_posts(parser, &paths);
    Ok((posts.build(), failed))
}

/// Summarizes a completed build.
#[derive(Debug, Default)]
pub struct Report {
    /// The number of linked post pages.
    pub pages: usize,

    /// Every file written, in order.
    pub files: Vec<PathBuf>,

    /// Posts that couldn't be parsed or rendered; the build went on without
    /// them.
    pub failed: Vec<post::Error>,
}

/// Builds the site from a [`Config`] object. The parser's patterns and date
/// layouts, the slugifier, and the theme are all constructed once here and
/// shared by every post.
pub fn build_site(config: &Config) -> Result<Report> {
    let parser = PostParser::default();
    let slugifier = Slugifier::new();
    let theme = Theme::load(&config.theme_directory)?;

    let (pages, mut failed) = load_pages(config, &parser)?;
    let names = file_names(&pages, &slugifier);

    let writer = Writer {
        theme: &theme,
        site: Site {
            title: &config.title,
            base_url: &config.base_url,
            owner: &config.owner,
            date_format: &config.date_format,
        },
        output_directory: &config.output_directory,
    };
    let written = writer.write_pages(&pages, &names)?;
    failed.extend(written.failed);
    let mut files = written.files;

    let feed_path = config.output_directory.join(FEED_FILE);
    let feed_file = File::create(&feed_path).map_err(|err| Error::Io {
        path: feed_path.clone(),
        err,
    })?;
    write_feed(
        &FeedConfig {
            title: &config.title,
            base_url: &config.base_url,
            owner: &config.owner,
        },
        &pages,
        &names,
        BufWriter::new(feed_file),
    )?;
    files.push(feed_path);

    info!(
        "baked {} posts into {} ({} failed)",
        pages.len(),
        config.output_directory.display(),
        failed.len()
    );
    Ok(Report {
        pages: pages.len(),
        files,
        failed,
    })
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Failures of individual posts are not
/// errors; they are listed in [`Report::failed`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the posts source directory doesn't exist.
    #[error("source directory `{}` does not exist", .0.display())]
    SourceDirectory(PathBuf),

    /// Returned for errors loading the theme.
    #[error(transparent)]
    Theme(#[from] theme::Error),

    /// Returned for errors writing pages to disk as HTML files.
    #[error(transparent)]
    Write(#[from] write::Error),

    /// Returned for errors writing the feed.
    #[error(transparent)]
    Feed(#[from] feed::Error),

    /// Returned for other I/O errors.
    #[error("writing `{}`: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
