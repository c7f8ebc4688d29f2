use crate::response::ApiResponse;
use crate::validation::Validation;

pub mod articles;
pub mod tags;

/// Everything served under `/api/v1`.
pub fn routes() -> Vec<rocket::Route> {
    let mut all = tags::routes();
    all.extend(articles::routes());
    all
}

/// Path ids must be integers ≥ 1.
pub(crate) fn path_id(raw: Result<i64, &str>) -> Result<i64, ApiResponse> {
    let mut v = Validation::new();
    let id = match raw {
        Ok(id) => Some(id),
        Err(s) => v.integer("id", Some(s)),
    };
    v.min("id", id, 1);

    match (v.error(), id) {
        (None, Some(id)) => Ok(id),
        (err, _) => {
            if let Some(err) = err {
                log::info!("{}", err);
            }
            Err(ApiResponse::invalid_params())
        }
    }
}

/// Listing page from the query string. Absent means the first page;
/// `0` or a negative page disables pagination.
pub(crate) fn page_param(v: &mut Validation, raw: Option<&str>) -> i64 {
    v.integer("page", raw).unwrap_or(1)
}
