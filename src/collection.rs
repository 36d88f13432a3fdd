//! Defines [`PostCollection`], which gathers [`Post`]s as they are discovered,
//! and [`Pages`], the chronologically ordered and linked sequence it builds.
//!
//! Every [`PageLink`] is owned by its [`Pages`]; neighbors are referenced by
//! position, so a link can only be navigated through the sequence that owns
//! it.

use crate::post::Post;

/// Posts in discovery order. Append with [`PostCollection::push`], then call
/// [`PostCollection::build`] once all parses have completed.
#[derive(Debug, Default)]
pub struct PostCollection {
    posts: Vec<Post>,
}

impl PostCollection {
    pub fn new() -> PostCollection {
        PostCollection::default()
    }

    pub fn push(&mut self, post: Post) {
        self.posts.push(post);
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Sorts the posts by ascending creation time and links neighbors. The
    /// sort is stable: posts with equal timestamps keep their discovery
    /// order.
    pub fn build(mut self) -> Pages {
        self.posts.sort_by_key(|post| post.created_at);
        let mut links: Vec<PageLink> = self
            .posts
            .into_iter()
            .enumerate()
            .map(|(index, post)| PageLink {
                post,
                index,
                prev: None,
                next: None,
            })
            .collect();
        for i in 1..links.len() {
            links[i].prev = Some(i - 1);
            links[i - 1].next = Some(i);
        }
        Pages { links }
    }
}

impl Extend<Post> for PostCollection {
    fn extend<I: IntoIterator<Item = Post>>(&mut self, iter: I) {
        self.posts.extend(iter)
    }
}

impl std::iter::FromIterator<Post> for PostCollection {
    fn from_iter<I: IntoIterator<Item = Post>>(iter: I) -> Self {
        PostCollection {
            posts: iter.into_iter().collect(),
        }
    }
}

/// One post in a [`Pages`] sequence, together with the positions of its
/// chronological neighbors.
#[derive(Clone, Debug, PartialEq)]
pub struct PageLink {
    pub post: Post,
    index: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

impl PageLink {
    /// Position of this link in its sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Position of the previous (older) link, if any.
    pub fn prev(&self) -> Option<usize> {
        self.prev
    }

    /// Position of the next (newer) link, if any.
    pub fn next(&self) -> Option<usize> {
        self.next
    }
}

/// The read-only, linked sequence of pages, oldest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pages {
    links: Vec<PageLink>,
}

impl Pages {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PageLink> {
        self.links.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageLink> {
        self.links.iter()
    }

    /// The link before `link` in this sequence.
    pub fn prev(&self, link: &PageLink) -> Option<&PageLink> {
        link.prev.and_then(|i| self.links.get(i))
    }

    /// The link after `link` in this sequence.
    pub fn next(&self, link: &PageLink) -> Option<&PageLink> {
        link.next.and_then(|i| self.links.get(i))
    }
}

impl<'a> IntoIterator for &'a Pages {
    type Item = &'a PageLink;
    type IntoIter = std::slice::Iter<'a, PageLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}
