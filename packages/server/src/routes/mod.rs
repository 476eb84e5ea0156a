use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::{entry, photo};
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/entries", entry_routes(config))
}

fn entry_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(entry::list_entries, entry::create_entry))
        .routes(routes!(
            entry::get_entry,
            entry::update_entry,
            entry::delete_entry
        ))
        .routes(routes!(entry::polish_entry));

    let upload = OpenApiRouter::new()
        .routes(routes!(photo::upload_photo))
        .layer(photo::photo_upload_body_limit(
            config.storage.max_photo_size,
        ));

    crud.merge(upload)
}
