/// Stable application codes carried in every response envelope.
/// The numeric values are part of the public API and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Success,
    Error,
    InvalidParams,
    NotFound,

    // ── Tags ──────────────────────────────────────────────
    ExistTag,
    ExistTagFail,
    NotExistTag,
    GetTagsFail,
    CountTagFail,
    AddTagFail,
    EditTagFail,
    DeleteTagFail,
    ExportTagFail,
    ImportTagFail,

    // ── Articles ──────────────────────────────────────────
    NotExistArticle,
    CheckExistArticleFail,
    AddArticleFail,
    DeleteArticleFail,
    EditArticleFail,
    CountArticleFail,
    GetArticlesFail,
    GetArticleFail,
    GenArticlePosterFail,
}

const UNKNOWN_MESSAGE: &str = "unknown error";

/// code → message lookup
const MESSAGES: &[(i32, &str)] = &[
    (200, "ok"),
    (500, "fail"),
    (400, "invalid request parameters"),
    (404, "resource not found"),
    (10001, "tag name already exists"),
    (10002, "failed to check whether the tag exists"),
    (10003, "tag does not exist"),
    (10004, "failed to get tags"),
    (10005, "failed to count tags"),
    (10006, "failed to add tag"),
    (10007, "failed to edit tag"),
    (10008, "failed to delete tag"),
    (10009, "failed to export tags"),
    (10010, "failed to import tags"),
    (10011, "article does not exist"),
    (10012, "failed to check whether the article exists"),
    (10013, "failed to add article"),
    (10014, "failed to delete article"),
    (10015, "failed to edit article"),
    (10016, "failed to count articles"),
    (10017, "failed to get articles"),
    (10018, "failed to get article"),
    (10019, "failed to generate article poster"),
];

impl Code {
    pub fn value(self) -> i32 {
        match self {
            Code::Success => 200,
            Code::Error => 500,
            Code::InvalidParams => 400,
            Code::NotFound => 404,
            Code::ExistTag => 10001,
            Code::ExistTagFail => 10002,
            Code::NotExistTag => 10003,
            Code::GetTagsFail => 10004,
            Code::CountTagFail => 10005,
            Code::AddTagFail => 10006,
            Code::EditTagFail => 10007,
            Code::DeleteTagFail => 10008,
            Code::ExportTagFail => 10009,
            Code::ImportTagFail => 10010,
            Code::NotExistArticle => 10011,
            Code::CheckExistArticleFail => 10012,
            Code::AddArticleFail => 10013,
            Code::DeleteArticleFail => 10014,
            Code::EditArticleFail => 10015,
            Code::CountArticleFail => 10016,
            Code::GetArticlesFail => 10017,
            Code::GetArticleFail => 10018,
            Code::GenArticlePosterFail => 10019,
        }
    }

    pub fn msg(self) -> &'static str {
        message(self.value())
    }
}

/// Resolve the human-readable message for a numeric code.
/// Unrecognized codes fall back to a generic message.
pub fn message(code: i32) -> &'static str {
    MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, m)| *m)
        .unwrap_or(UNKNOWN_MESSAGE)
}
