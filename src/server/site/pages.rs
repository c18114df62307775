use axum::response::Response;

use crate::server::dto::StaticPageData;
use crate::server::page::PageContext;

pub async fn about(ctx: PageContext) -> Response {
    ctx.render(
        "about",
        StaticPageData {
            heading: "About Me",
            subheading: "This is what I do.",
        },
    )
}

pub async fn contact(ctx: PageContext) -> Response {
    ctx.render(
        "contact",
        StaticPageData {
            heading: "Contact Me",
            subheading: "Have questions? I have answers.",
        },
    )
}
