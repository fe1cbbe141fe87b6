//! Collection builder - pagination, category/tag groups and the date archive

use crate::content::Post;
use chrono::Datelike;
use indexmap::IndexMap;

/// Sort posts newest first; posts with equal dates keep their order
pub fn sort_by_date(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date));
}

/// One page of the home listing
#[derive(Debug, Clone, Copy)]
pub struct PostPage<'a> {
    /// 1-based page number
    pub number: usize,
    pub total: usize,
    pub posts: &'a [Post],
}

/// Split posts into pages of `per_page` (a zero size is treated as 1)
pub fn paginate(posts: &[Post], per_page: usize) -> Vec<PostPage<'_>> {
    let chunks: Vec<&[Post]> = posts.chunks(per_page.max(1)).collect();
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, posts)| PostPage {
            number: i + 1,
            total,
            posts,
        })
        .collect()
}

/// Posts grouped by label, keys in order of first appearance
pub type LabelGroups<'a> = IndexMap<&'a str, Vec<&'a Post>>;

/// year -> month (1-12) -> posts
pub type Archive<'a> = IndexMap<i32, IndexMap<u32, Vec<&'a Post>>>;

fn group_by_label<'a, F>(posts: &'a [Post], labels: F) -> LabelGroups<'a>
where
    F: Fn(&'a Post) -> &'a [String],
{
    let mut groups: LabelGroups<'a> = IndexMap::new();
    for post in posts {
        for label in labels(post) {
            groups.entry(label.as_str()).or_default().push(post);
        }
    }
    groups
}

pub fn group_by_category(posts: &[Post]) -> LabelGroups<'_> {
    group_by_label(posts, |p| p.categories.as_slice())
}

pub fn group_by_tag(posts: &[Post]) -> LabelGroups<'_> {
    group_by_label(posts, |p| p.tags.as_slice())
}

/// Group by calendar year, then month
pub fn group_by_date(posts: &[Post]) -> Archive<'_> {
    let mut archive: Archive<'_> = IndexMap::new();
    for post in posts {
        archive
            .entry(post.date.year())
            .or_default()
            .entry(post.date.month())
            .or_default()
            .push(post);
    }
    archive
}

/// Every grouping a build renders, computed once from date-sorted posts
pub struct Collections<'a> {
    pub posts: &'a [Post],
    pub pages: Vec<PostPage<'a>>,
    pub categories: LabelGroups<'a>,
    pub tags: LabelGroups<'a>,
    pub archive: Archive<'a>,
}

impl<'a> Collections<'a> {
    pub fn build(posts: &'a [Post], per_page: usize) -> Self {
        Self {
            posts,
            pages: paginate(posts, per_page),
            categories: group_by_category(posts),
            tags: group_by_tag(posts),
            archive: group_by_date(posts),
        }
    }
}
