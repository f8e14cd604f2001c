//! Route registration for the `/api` scope.
//!
//! Shared by the server and the handler tests so both exercise the same
//! match order. Literal paths (`/users/me/`, `/users/subscriptions/`,
//! `/recipes/download_shopping_cart/`) must register before their `{id}`
//! siblings; actix matches services in registration order.

use actix_web::web;

use crate::inbound::http::{catalogue, recipes, subscriptions, users};

/// Register every API endpoint under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(users::register)
            .service(users::list_users)
            .service(subscriptions::list_subscriptions)
            .service(users::me)
            .service(users::set_avatar)
            .service(users::delete_avatar)
            .service(subscriptions::subscribe)
            .service(subscriptions::unsubscribe)
            .service(users::retrieve_user)
            .service(users::login)
            .service(users::logout)
            .service(catalogue::list_tags)
            .service(catalogue::retrieve_tag)
            .service(catalogue::list_ingredients)
            .service(catalogue::retrieve_ingredient)
            .service(recipes::create_recipe)
            .service(recipes::list_recipes)
            .service(recipes::download_shopping_cart)
            .service(recipes::short_url)
            .service(recipes::add_favorite)
            .service(recipes::remove_favorite)
            .service(recipes::add_to_cart)
            .service(recipes::remove_from_cart)
            .service(recipes::retrieve_recipe)
            .service(recipes::update_recipe)
            .service(recipes::delete_recipe),
    );
}

#[cfg(test)]
mod tests {
    use crate::inbound::http::test_utils::{register_user, test_app};
    use crate::outbound::InMemoryStore;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    // `/users/me/` and `/users/subscriptions/` share a prefix with
    // `/users/{id}/`; these guard the registration order.
    #[rstest]
    #[actix_web::test]
    async fn me_is_not_shadowed_by_the_id_route() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/users/me/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["username"], "ada");
    }

    #[rstest]
    #[actix_web::test]
    async fn subscriptions_list_is_not_shadowed_by_the_id_route() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/users/subscriptions/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["count"], 0);
    }

    #[rstest]
    #[actix_web::test]
    async fn download_is_not_shadowed_by_the_id_route() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/recipes/download_shopping_cart/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_path_is_not_found() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/nope/")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
