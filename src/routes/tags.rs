use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::State;
use serde_json::json;
use std::sync::Arc;

use super::{page_param, path_id};
use crate::codes::Code;
use crate::config::AppConfig;
use crate::export;
use crate::models::tag::{TagChanges, TagFilter, TagForm, MAX_FIELD_LEN};
use crate::response::ApiResponse;
use crate::store::Store;
use crate::validation::{bind_and_valid, text, Bind, Validation};

// ── Forms ──────────────────────────────────────────────

#[derive(Debug, FromForm)]
pub struct ListTagsQuery {
    pub name: Option<String>,
    pub state: Option<String>,
    pub page: Option<String>,
}

impl Bind for ListTagsQuery {
    type Output = (TagFilter, i64);

    fn bind(&self, v: &mut Validation) -> Self::Output {
        let state = v.integer("state", text(&self.state));
        v.range("state", state, 0, 1);
        let page = page_param(v, text(&self.page));
        let filter = TagFilter {
            name: text(&self.name).map(str::to_string),
            state,
        };
        (filter, page)
    }
}

#[derive(Debug, FromForm)]
pub struct AddTagForm {
    pub name: Option<String>,
    pub created_by: Option<String>,
    pub state: Option<String>,
}

impl Bind for AddTagForm {
    type Output = TagForm;

    fn bind(&self, v: &mut Validation) -> TagForm {
        let name = text(&self.name);
        let created_by = text(&self.created_by);
        v.required("name", name).max_size("name", name, MAX_FIELD_LEN);
        v.required("created_by", created_by).max_size("created_by", created_by, MAX_FIELD_LEN);
        let state = v.integer("state", text(&self.state));
        v.range("state", state, 0, 1);

        TagForm {
            name: name.unwrap_or_default().to_string(),
            created_by: created_by.unwrap_or_default().to_string(),
            state: state.unwrap_or(0),
        }
    }
}

#[derive(Debug, FromForm)]
pub struct EditTagForm {
    pub name: Option<String>,
    pub modified_by: Option<String>,
    pub state: Option<String>,
}

impl Bind for EditTagForm {
    type Output = TagChanges;

    fn bind(&self, v: &mut Validation) -> TagChanges {
        let name = text(&self.name);
        let modified_by = text(&self.modified_by);
        v.max_size("name", name, MAX_FIELD_LEN);
        v.required("modified_by", modified_by).max_size("modified_by", modified_by, MAX_FIELD_LEN);
        let state = v.integer("state", text(&self.state));
        v.range("state", state, 0, 1);

        TagChanges {
            name: name.map(str::to_string),
            state,
            modified_by: modified_by.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, FromForm)]
pub struct ExportTagForm {
    pub name: Option<String>,
    pub state: Option<String>,
}

impl Bind for ExportTagForm {
    type Output = TagFilter;

    fn bind(&self, v: &mut Validation) -> TagFilter {
        let state = v.integer("state", text(&self.state));
        v.range("state", state, 0, 1);
        TagFilter {
            name: text(&self.name).map(str::to_string),
            state,
        }
    }
}

#[derive(FromForm)]
pub struct ImportTagForm<'f> {
    pub file: Option<TempFile<'f>>,
}

// ── GET: List ──────────────────────────────────────────

#[get("/tags?<query..>")]
pub fn list_tags(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    query: ListTagsQuery,
) -> ApiResponse {
    let (filter, page) = match bind_and_valid(&query) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let tags = match store.tag_list(&filter, page, config.page_size) {
        Ok(tags) => tags,
        Err(e) => {
            log::error!("Listing tags failed: {}", e);
            return ApiResponse::server_error(Code::GetTagsFail);
        }
    };
    let total = match store.tag_count(&filter) {
        Ok(n) => n,
        Err(e) => {
            log::error!("Counting tags failed: {}", e);
            return ApiResponse::server_error(Code::CountTagFail);
        }
    };

    ApiResponse::ok(json!({
        "lists": tags,
        "total": total,
    }))
}

// ── POST: Create ───────────────────────────────────────

#[post("/tags", data = "<form>")]
pub fn add_tag(store: &State<Arc<dyn Store>>, form: Form<AddTagForm>) -> ApiResponse {
    let tag = match bind_and_valid(&*form) {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    match store.tag_exists_by_name(&tag.name) {
        Ok(true) => return ApiResponse::business(Code::ExistTag),
        Ok(false) => {}
        Err(e) => {
            log::error!("Checking tag name {:?} failed: {}", tag.name, e);
            return ApiResponse::server_error(Code::ExistTagFail);
        }
    }

    match store.tag_create(&tag) {
        Ok(_) => ApiResponse::done(),
        Err(e) => {
            log::error!("Creating tag {:?} failed: {}", tag.name, e);
            ApiResponse::server_error(Code::AddTagFail)
        }
    }
}

// ── PUT: Update ────────────────────────────────────────

#[put("/tags/<id>", data = "<form>")]
pub fn edit_tag(
    store: &State<Arc<dyn Store>>,
    id: Result<i64, &str>,
    form: Form<EditTagForm>,
) -> ApiResponse {
    let id = match path_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let changes = match bind_and_valid(&*form) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match store.tag_exists_by_id(id) {
        Ok(true) => {}
        Ok(false) => return ApiResponse::business(Code::NotExistTag),
        Err(e) => {
            log::error!("Checking tag {} failed: {}", id, e);
            return ApiResponse::server_error(Code::ExistTagFail);
        }
    }

    if let Some(name) = changes.name.as_deref() {
        match store.tag_find_by_name(name) {
            Ok(Some(other)) if other.id != id => return ApiResponse::business(Code::ExistTag),
            Ok(_) => {}
            Err(e) => {
                log::error!("Checking tag name {:?} failed: {}", name, e);
                return ApiResponse::server_error(Code::ExistTagFail);
            }
        }
    }

    match store.tag_update(id, &changes) {
        Ok(()) => ApiResponse::done(),
        Err(e) => {
            log::error!("Updating tag {} failed: {}", id, e);
            ApiResponse::server_error(Code::EditTagFail)
        }
    }
}

// ── DELETE ─────────────────────────────────────────────

#[delete("/tags/<id>")]
pub fn delete_tag(store: &State<Arc<dyn Store>>, id: Result<i64, &str>) -> ApiResponse {
    let id = match path_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match store.tag_exists_by_id(id) {
        Ok(true) => {}
        Ok(false) => return ApiResponse::business(Code::NotExistTag),
        Err(e) => {
            log::error!("Checking tag {} failed: {}", id, e);
            return ApiResponse::server_error(Code::ExistTagFail);
        }
    }

    match store.tag_delete(id) {
        Ok(()) => ApiResponse::done(),
        Err(e) => {
            log::error!("Deleting tag {} failed: {}", id, e);
            ApiResponse::server_error(Code::DeleteTagFail)
        }
    }
}

// ── POST: Export / Import ──────────────────────────────

#[post("/tags/export", data = "<form>")]
pub fn export_tags(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    form: Form<ExportTagForm>,
) -> ApiResponse {
    let filter = match bind_and_valid(&*form) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match export::export_tags(store.inner().as_ref(), config, &filter) {
        Ok(filename) => ApiResponse::ok(json!({
            "export_url": config.export_url(&filename),
            "export_save_url": config.export_save_url(&filename),
        })),
        Err(e) => {
            log::error!("Exporting tags failed: {}", e);
            ApiResponse::server_error(Code::ExportTagFail)
        }
    }
}

#[post("/tags/import", data = "<form>")]
pub async fn import_tags(store: &State<Arc<dyn Store>>, form: Form<ImportTagForm<'_>>) -> ApiResponse {
    let file = match form.file.as_ref() {
        Some(f) if f.len() > 0 => f,
        _ => {
            log::info!("file: cannot be empty");
            return ApiResponse::invalid_params();
        }
    };

    let bytes = match read_upload(file).await {
        Ok(b) => b,
        Err(e) => {
            log::warn!("Reading tag import upload failed: {}", e);
            return ApiResponse::server_error(Code::ImportTagFail);
        }
    };

    let store = Arc::clone(store.inner());
    let outcome =
        rocket::tokio::task::spawn_blocking(move || export::import_tags(store.as_ref(), &bytes)).await;

    match outcome {
        Ok(Ok(summary)) => ApiResponse::ok(json!(summary)),
        Ok(Err(e)) => {
            log::warn!("Importing tags failed: {}", e);
            ApiResponse::server_error(Code::ImportTagFail)
        }
        Err(e) => {
            log::error!("Tag import task failed: {}", e);
            ApiResponse::server_error(Code::ImportTagFail)
        }
    }
}

async fn read_upload(file: &TempFile<'_>) -> std::io::Result<Vec<u8>> {
    use rocket::tokio::io::AsyncReadExt;

    let reader = file.open().await?;
    rocket::tokio::pin!(reader);
    let mut buf = Vec::with_capacity(file.len() as usize);
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

pub fn routes() -> Vec<rocket::Route> {
    routes![list_tags, add_tag, edit_tag, delete_tag, export_tags, import_tags]
}
