use rocket::form::Form;
use rocket::State;
use serde_json::json;
use std::sync::Arc;

use super::{page_param, path_id};
use crate::codes::Code;
use crate::config::AppConfig;
use crate::models::article::{ArticleChanges, ArticleFilter, ArticleForm};
use crate::poster;
use crate::response::ApiResponse;
use crate::store::Store;
use crate::validation::{bind_and_valid, text, Bind, Validation};

// ── Forms ──────────────────────────────────────────────

#[derive(Debug, FromForm)]
pub struct ListArticlesQuery {
    pub state: Option<String>,
    pub tag_id: Option<String>,
    pub page: Option<String>,
}

impl Bind for ListArticlesQuery {
    type Output = (ArticleFilter, i64);

    fn bind(&self, v: &mut Validation) -> Self::Output {
        let state = v.integer("state", text(&self.state));
        v.range("state", state, 0, 1);
        let tag_id = v.integer("tag_id", text(&self.tag_id));
        v.min("tag_id", tag_id, 1);
        let page = page_param(v, text(&self.page));
        (ArticleFilter { state, tag_id }, page)
    }
}

#[derive(Debug, FromForm)]
pub struct AddArticleForm {
    pub tag_id: Option<String>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub content: Option<String>,
    pub created_by: Option<String>,
    pub cover_image_url: Option<String>,
    pub state: Option<String>,
}

impl Bind for AddArticleForm {
    type Output = ArticleForm;

    fn bind(&self, v: &mut Validation) -> ArticleForm {
        let title = text(&self.title);
        let desc = text(&self.desc);
        let content = text(&self.content);
        let created_by = text(&self.created_by);
        let cover = text(&self.cover_image_url);

        v.required("tag_id", text(&self.tag_id));
        let tag_id = v.integer("tag_id", text(&self.tag_id));
        v.min("tag_id", tag_id, 1);
        v.required("title", title).max_size("title", title, 100);
        v.required("desc", desc).max_size("desc", desc, 255);
        v.required("content", content).max_size("content", content, 65535);
        v.required("created_by", created_by).max_size("created_by", created_by, 100);
        v.required("cover_image_url", cover).max_size("cover_image_url", cover, 255);
        let state = v.integer("state", text(&self.state));
        v.range("state", state, 0, 1);

        ArticleForm {
            tag_id: tag_id.unwrap_or_default(),
            title: title.unwrap_or_default().to_string(),
            description: desc.unwrap_or_default().to_string(),
            content: content.unwrap_or_default().to_string(),
            cover_image_url: cover.unwrap_or_default().to_string(),
            state: state.unwrap_or(0),
            created_by: created_by.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, FromForm)]
pub struct EditArticleForm {
    pub tag_id: Option<String>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub content: Option<String>,
    pub modified_by: Option<String>,
    pub cover_image_url: Option<String>,
    pub state: Option<String>,
}

impl Bind for EditArticleForm {
    type Output = ArticleChanges;

    fn bind(&self, v: &mut Validation) -> ArticleChanges {
        let title = text(&self.title);
        let desc = text(&self.desc);
        let content = text(&self.content);
        let modified_by = text(&self.modified_by);
        let cover = text(&self.cover_image_url);

        let tag_id = v.integer("tag_id", text(&self.tag_id));
        v.min("tag_id", tag_id, 1);
        v.max_size("title", title, 100);
        v.max_size("desc", desc, 255);
        v.max_size("content", content, 65535);
        v.required("modified_by", modified_by).max_size("modified_by", modified_by, 100);
        v.max_size("cover_image_url", cover, 255);
        let state = v.integer("state", text(&self.state));
        v.range("state", state, 0, 1);

        ArticleChanges {
            tag_id,
            title: title.map(str::to_string),
            description: desc.map(str::to_string),
            content: content.map(str::to_string),
            cover_image_url: cover.map(str::to_string),
            state,
            modified_by: modified_by.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, FromForm)]
pub struct PosterForm {
    pub id: Option<String>,
}

impl Bind for PosterForm {
    type Output = Option<i64>;

    fn bind(&self, v: &mut Validation) -> Option<i64> {
        let id = v.integer("id", text(&self.id));
        v.min("id", id, 1);
        id
    }
}

/// Checks the referenced tag is live; `Err` carries the response to return.
fn ensure_tag(store: &dyn Store, tag_id: i64) -> Result<(), ApiResponse> {
    match store.tag_exists_by_id(tag_id) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ApiResponse::business(Code::NotExistTag)),
        Err(e) => {
            log::error!("Checking tag {} failed: {}", tag_id, e);
            Err(ApiResponse::server_error(Code::ExistTagFail))
        }
    }
}

fn ensure_article(store: &dyn Store, id: i64) -> Result<(), ApiResponse> {
    match store.article_exists_by_id(id) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ApiResponse::business(Code::NotExistArticle)),
        Err(e) => {
            log::error!("Checking article {} failed: {}", id, e);
            Err(ApiResponse::server_error(Code::CheckExistArticleFail))
        }
    }
}

// ── GET: Single ────────────────────────────────────────

#[get("/articles/<id>")]
pub fn get_article(store: &State<Arc<dyn Store>>, id: Result<i64, &str>) -> ApiResponse {
    let id = match path_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_article(store.inner().as_ref(), id) {
        return resp;
    }

    match store.article_find_by_id(id) {
        Ok(Some(article)) => ApiResponse::ok(json!(article)),
        // deleted between the check and the read
        Ok(None) => ApiResponse::business(Code::NotExistArticle),
        Err(e) => {
            log::error!("Loading article {} failed: {}", id, e);
            ApiResponse::server_error(Code::GetArticleFail)
        }
    }
}

// ── GET: List ──────────────────────────────────────────

#[get("/articles?<query..>")]
pub fn list_articles(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    query: ListArticlesQuery,
) -> ApiResponse {
    let (filter, page) = match bind_and_valid(&query) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let total = match store.article_count(&filter) {
        Ok(n) => n,
        Err(e) => {
            log::error!("Counting articles failed: {}", e);
            return ApiResponse::server_error(Code::CountArticleFail);
        }
    };
    let articles = match store.article_list(&filter, page, config.page_size) {
        Ok(a) => a,
        Err(e) => {
            log::error!("Listing articles failed: {}", e);
            return ApiResponse::server_error(Code::GetArticlesFail);
        }
    };

    ApiResponse::ok(json!({
        "lists": articles,
        "total": total,
    }))
}

// ── POST: Create ───────────────────────────────────────

#[post("/articles", data = "<form>")]
pub fn add_article(store: &State<Arc<dyn Store>>, form: Form<AddArticleForm>) -> ApiResponse {
    let article = match bind_and_valid(&*form) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_tag(store.inner().as_ref(), article.tag_id) {
        return resp;
    }

    match store.article_create(&article) {
        Ok(_) => ApiResponse::done(),
        Err(e) => {
            log::error!("Creating article {:?} failed: {}", article.title, e);
            ApiResponse::server_error(Code::AddArticleFail)
        }
    }
}

// ── PUT: Update ────────────────────────────────────────

#[put("/articles/<id>", data = "<form>")]
pub fn edit_article(
    store: &State<Arc<dyn Store>>,
    id: Result<i64, &str>,
    form: Form<EditArticleForm>,
) -> ApiResponse {
    let id = match path_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let changes = match bind_and_valid(&*form) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    if let Err(resp) = ensure_article(store.inner().as_ref(), id) {
        return resp;
    }
    if let Some(tag_id) = changes.tag_id {
        if let Err(resp) = ensure_tag(store.inner().as_ref(), tag_id) {
            return resp;
        }
    }

    match store.article_update(id, &changes) {
        Ok(()) => ApiResponse::done(),
        Err(e) => {
            log::error!("Updating article {} failed: {}", id, e);
            ApiResponse::server_error(Code::EditArticleFail)
        }
    }
}

// ── DELETE ─────────────────────────────────────────────

#[delete("/articles/<id>")]
pub fn delete_article(store: &State<Arc<dyn Store>>, id: Result<i64, &str>) -> ApiResponse {
    let id = match path_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_article(store.inner().as_ref(), id) {
        return resp;
    }

    match store.article_delete(id) {
        Ok(()) => ApiResponse::done(),
        Err(e) => {
            log::error!("Deleting article {} failed: {}", id, e);
            ApiResponse::server_error(Code::DeleteArticleFail)
        }
    }
}

// ── POST: Poster ───────────────────────────────────────

#[post("/articles/poster/generate", data = "<form>")]
pub fn generate_poster(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    form: Form<PosterForm>,
) -> ApiResponse {
    let article_id = match bind_and_valid(&*form) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Some(id) = article_id {
        if let Err(resp) = ensure_article(store.inner().as_ref(), id) {
            return resp;
        }
    }

    match poster::generate(config, article_id) {
        Ok(p) => ApiResponse::ok(json!({
            "poster_url": config.poster_url(&p.filename),
            "poster_save_url": config.poster_save_url(&p.filename),
        })),
        Err(e) => {
            log::error!("Generating poster failed: {}", e);
            ApiResponse::server_error(Code::GenArticlePosterFail)
        }
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        get_article,
        list_articles,
        add_article,
        edit_article,
        delete_article,
        generate_poster
    ]
}
