//! Table bindings for forum posts and comments.

use super::{PgQueryAs, PgResource};
use crate::models::comment::{Comment, NewComment};
use crate::models::forum::{Forum, NewForum};

impl PgResource for Forum {
    const TABLE: &'static str = "forum";
    const COLUMNS: &'static str = "id, created_at, title, content, version";
    const INSERT_COLUMNS: &'static [&'static str] = &["title", "content"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["title", "content"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "content"];

    fn bind_draft<'q, O>(draft: &'q NewForum, query: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        query.bind(&draft.title).bind(&draft.content)
    }

    fn bind_update<'q, O>(&'q self, query: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        query.bind(&self.title).bind(&self.content)
    }
}

impl PgResource for Comment {
    const TABLE: &'static str = "comments";
    const COLUMNS: &'static str = "id, created_at, content, version";
    const INSERT_COLUMNS: &'static [&'static str] = &["content"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["content"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["content"];

    fn bind_draft<'q, O>(draft: &'q NewComment, query: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        query.bind(&draft.content)
    }

    fn bind_update<'q, O>(&'q self, query: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        query.bind(&self.content)
    }
}
