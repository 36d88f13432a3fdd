//! Support for creating Atom feeds from a linked sequence of pages.

use std::io::Write;

use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person};
use chrono::Utc;
use url::Url;

use crate::{collection::Pages, date::Timestamp};

/// The output file name of the feed.
pub const FEED_FILE: &str = "feed.atom";

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,
    pub base_url: &'a Url,

    /// The feed author as `name <email>` or just `name`.
    pub owner: &'a str,
}

/// Creates a feed with one entry per page, newest first, and writes it to
/// `w`. `file_names` holds the output file name of each page, by position.
pub fn write_feed<W: Write>(
    config: &FeedConfig,
    pages: &Pages,
    file_names: &[String],
    w: W,
) -> Result<()> {
    feed(config, pages, file_names)?.write_to(w)?;
    Ok(())
}

fn feed(
    config: &FeedConfig,
    pages: &Pages,
    file_names: &[String],
) -> Result<Feed> {
    let mut entries = Vec::with_capacity(pages.len());
    for link in pages.iter().rev() {
        let url = config.base_url.join(&file_names[link.index()])?;
        let mut entry = Entry::default();
        entry.set_id(url.to_string());
        entry.set_title(link.post.title.clone());
        entry.set_updated(link.post.created_at);
        entry.set_published(Some(link.post.created_at));
        entry.set_links(vec![alternate(&url)]);
        if let Some(author) = &link.post.author {
            entry.set_authors(vec![person(author)]);
        }
        entries.push(entry);
    }

    let updated: Timestamp = match pages.iter().last() {
        Some(newest) => newest.post.created_at,
        None => Utc::now().into(),
    };

    let mut feed = Feed::default();
    feed.set_title(config.title.to_owned());
    feed.set_id(config.base_url.to_string());
    feed.set_updated(updated);
    feed.set_authors(vec![person(config.owner)]);
    feed.set_links(vec![alternate(config.base_url)]);
    feed.set_entries(entries);
    Ok(feed)
}

fn alternate(url: &Url) -> Link {
    let mut link = Link::default();
    link.set_href(url.to_string());
    link.set_rel("alternate");
    link
}

/// Splits `Jane Doe <jane@example.org>` into a name and an email.
fn person(raw: &str) -> Person {
    let mut person = Person::default();
    match (raw.find('<'), raw.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            person.set_name(raw[..open].trim());
            person.set_email(Some(raw[open + 1..close].trim().to_owned()));
        }
        _ => person.set_name(raw.trim()),
    }
    person
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when there is an Atom-related error, including I/O errors
    /// while writing.
    #[error("writing feed: {0}")]
    Atom(#[from] AtomError),

    /// Returned when an entry URL can't be built from the base URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
