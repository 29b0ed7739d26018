use axum::response::Html;

static CHAT_PAGE: &str = include_str!("../../static/chat.html");

/// Single-page chat client for `POST /agent`.
pub async fn chat_page_handler() -> Html<&'static str> {
    Html(CHAT_PAGE)
}
