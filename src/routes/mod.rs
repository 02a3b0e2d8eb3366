pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::app::{json_config, path_config};

/// Registers every route plus the JSON and path extractor configuration.
///
/// Authentication is enforced per handler through the `Authenticated` extractor,
/// so public and protected routes can share a scope.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .service(health::health)
        .service(
            web::scope("/users")
                .service(users::signup)
                .service(users::login)
                .service(users::logout)
                .service(users::logout_all)
                // Ahead of `/me/avatar`: GET /users/me/avatar must 404, not 405.
                .service(users::get_avatar)
                .service(
                    web::resource("/me")
                        .route(web::get().to(users::get_profile))
                        .route(web::patch().to(users::update_profile))
                        .route(web::delete().to(users::delete_profile)),
                )
                .service(
                    web::resource("/me/avatar")
                        .route(web::post().to(users::upload_avatar))
                        .route(web::delete().to(users::delete_avatar)),
                ),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::list_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
