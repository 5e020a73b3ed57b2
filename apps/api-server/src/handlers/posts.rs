//! Post resource handlers.

use actix_web::{Either, HttpResponse, web};

use posts_core::domain::{Post, PostChanges, PostId};
use posts_core::error::RepoError;
use posts_shared::dto::{PostForm, PostParams, PostRequest};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// A post body sent either as JSON or as a `post[...]` form.
type PostBody = Either<web::Json<PostRequest>, web::Form<PostForm>>;

fn submitted(body: PostBody) -> AppResult<PostParams> {
    match body {
        Either::Left(json) => Ok(json.into_inner().post),
        Either::Right(form) => form.into_inner().into_params().ok_or_else(|| {
            AppError::BadRequest("param is missing or the value is empty: post".to_string())
        }),
    }
}

/// Turn the permitted request attributes into a change set.
fn permitted(params: PostParams) -> PostChanges {
    PostChanges {
        title: params.title,
        content: params.content,
    }
}

async fn find_post(state: &AppState, id: PostId) -> AppResult<Post> {
    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post with id {} not found", id)))
}

fn rejected(post_id: Option<PostId>, err: RepoError) -> AppError {
    match &err {
        RepoError::Invalid(errors) => {
            tracing::warn!(?post_id, %errors, "Post failed validation");
        }
        RepoError::Constraint(msg) => {
            tracing::warn!(?post_id, constraint = %msg, "Post write rejected by store");
        }
        _ => {}
    }
    err.into()
}

/// GET /posts
pub async fn index(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.posts.list().await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /posts/{id}
pub async fn show(state: web::Data<AppState>, path: web::Path<PostId>) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// POST /posts
pub async fn create(
    state: web::Data<AppState>,
    body: PostBody,
) -> AppResult<HttpResponse> {
    let changes = permitted(submitted(body)?);

    let post = state
        .posts
        .create(changes)
        .await
        .map_err(|e| rejected(None, e))?;

    tracing::info!(post_id = post.id, "Post created");
    Ok(HttpResponse::Created().json(post))
}

/// PUT|PATCH /posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    path: web::Path<PostId>,
    body: PostBody,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;
    let id = post.id;
    let last_written = post.updated_at;

    let changes = permitted(submitted(body)?);

    let post = state
        .posts
        .update(post, changes)
        .await
        .map_err(|e| rejected(Some(id), e))?;

    if post.updated_at != last_written {
        tracing::info!(post_id = id, "Post updated");
    } else {
        tracing::debug!(post_id = id, "Update left post unchanged");
    }
    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /posts/{id}
pub async fn destroy(
    state: web::Data<AppState>,
    path: web::Path<PostId>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;
    let id = post.id;

    state
        .posts
        .delete(post)
        .await
        .map_err(|e| rejected(Some(id), e))?;

    tracing::info!(post_id = id, "Post deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    use posts_core::domain::{Post, PostChanges, PostId};
    use posts_core::error::RepoError;
    use posts_core::ports::PostRepository;
    use posts_infra::InMemoryPostRepository;

    use crate::handlers::configure_routes;
    use crate::state::{AppState, Storage};

    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    async fn seed(state: &AppState, title: &str, content: &str) -> Post {
        state
            .posts
            .create(PostChanges {
                title: Some(Some(title.to_string())),
                content: Some(Some(content.to_string())),
            })
            .await
            .unwrap()
    }

    async fn stored(state: &AppState, post: &Post) -> Option<Post> {
        state.posts.find_by_id(post.id).await.unwrap()
    }

    /// Store whose deletes are refused, as when other rows still reference a post.
    #[derive(Default)]
    struct ReferencedPosts(InMemoryPostRepository);

    #[async_trait]
    impl PostRepository for ReferencedPosts {
        async fn list(&self) -> Result<Vec<Post>, RepoError> {
            self.0.list().await
        }

        async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, RepoError> {
            self.0.find_by_id(id).await
        }

        async fn count(&self) -> Result<u64, RepoError> {
            self.0.count().await
        }

        async fn create(&self, changes: PostChanges) -> Result<Post, RepoError> {
            self.0.create(changes).await
        }

        async fn update(&self, post: Post, changes: PostChanges) -> Result<Post, RepoError> {
            self.0.update(post, changes).await
        }

        async fn delete(&self, _post: Post) -> Result<(), RepoError> {
            Err(RepoError::Constraint("still referenced".to_string()))
        }
    }

    #[actix_rt::test]
    async fn test_index_lists_all_posts() {
        let state = AppState::in_memory();
        for n in 0..10 {
            seed(&state, &format!("Post {n}"), "Body").await;
        }
        let app = init_app!(state);

        let req = test::TestRequest::get().uri("/posts").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let expected = serde_json::to_value(state.posts.list().await.unwrap()).unwrap();
        assert_eq!(body, expected);
        assert_eq!(body.as_array().unwrap().len(), 10);
    }

    #[actix_rt::test]
    async fn test_index_on_empty_store() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::get().uri("/posts").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!([]));
    }

    #[actix_rt::test]
    async fn test_show_returns_post() {
        let state = AppState::in_memory();
        let post = seed(&state, "Post Title", "Post content.").await;
        let app = init_app!(state);

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}", post.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::to_value(&post).unwrap());
        for key in ["id", "title", "content", "created_at", "updated_at"] {
            assert!(body.get(key).is_some(), "missing {key}");
        }
    }

    #[actix_rt::test]
    async fn test_show_unknown_post_is_not_found() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        for uri in ["/posts/42", "/posts/not-a-number"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_rt::test]
    async fn test_create_with_valid_parameters() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/posts")
            .set_json(json!({ "post": { "title": "Post Title", "content": "Post content." } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["title"], "Post Title");
        assert_eq!(body["content"], "Post content.");
        assert!(body["id"].is_number());
        assert_eq!(state.posts.count().await.unwrap(), 1);
    }

    #[actix_rt::test]
    async fn test_create_with_invalid_parameters() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/posts")
            .set_json(json!({ "post": { "title": null, "content": "Post content." } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({ "errors": [{ "field": "title", "messages": ["can't be blank"] }] })
        );
        assert_eq!(state.posts.count().await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_create_discards_unpermitted_fields() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/posts")
            .set_json(json!({
                "post": {
                    "id": 500,
                    "title": "Post Title",
                    "created_at": "1999-01-01T00:00:00Z",
                    "author": "mallory"
                }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["content"], Value::Null);
        assert!(body.get("author").is_none());
        assert_ne!(body["created_at"], "1999-01-01T00:00:00Z");
    }

    #[actix_rt::test]
    async fn test_create_without_post_envelope_is_bad_request() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/posts")
            .set_json(json!({ "title": "Post Title" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 400);
        assert_eq!(state.posts.count().await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_create_from_form_parameters() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/posts")
            .set_form([("post[title]", "Post Title"), ("post[content]", "Post content.")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["title"], "Post Title");
        assert_eq!(body["content"], "Post content.");
        assert_eq!(state.posts.count().await.unwrap(), 1);
    }

    #[actix_rt::test]
    async fn test_create_from_form_with_blank_title() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/posts")
            .set_form([("post[title]", ""), ("post[content]", "Post content.")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({ "errors": [{ "field": "title", "messages": ["can't be blank"] }] })
        );
        assert_eq!(state.posts.count().await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_create_from_form_without_post_keys_is_bad_request() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/posts")
            .set_form([("title", "Post Title")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 400);
        assert_eq!(state.posts.count().await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_update_with_valid_parameters() {
        let state = AppState::in_memory();
        let post = seed(&state, "Post Title", "Post content.").await;
        let app = init_app!(state);

        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", post.id))
            .set_json(json!({ "post": { "title": "Updated Title" } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["title"], "Updated Title");
        assert_eq!(body["content"], "Post content.");

        let saved = stored(&state, &post).await.unwrap();
        assert_eq!(saved.title, "Updated Title");
        assert_eq!(saved.content.as_deref(), Some("Post content."));
        assert_eq!(saved.created_at, post.created_at);
    }

    #[actix_rt::test]
    async fn test_patch_is_routed_to_update() {
        let state = AppState::in_memory();
        let post = seed(&state, "Post Title", "Post content.").await;
        let app = init_app!(state);

        let req = test::TestRequest::patch()
            .uri(&format!("/posts/{}", post.id))
            .set_json(json!({ "post": { "content": "Rewritten." } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let saved = stored(&state, &post).await.unwrap();
        assert_eq!(saved.title, "Post Title");
        assert_eq!(saved.content.as_deref(), Some("Rewritten."));
    }

    #[actix_rt::test]
    async fn test_update_from_form_parameters() {
        let state = AppState::in_memory();
        let post = seed(&state, "Post Title", "Post content.").await;
        let app = init_app!(state);

        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", post.id))
            .set_form([("post[title]", "Updated Title")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let saved = stored(&state, &post).await.unwrap();
        assert_eq!(saved.title, "Updated Title");
        assert_eq!(saved.content.as_deref(), Some("Post content."));
    }

    #[actix_rt::test]
    async fn test_update_without_changes_keeps_timestamps() {
        let state = AppState::in_memory();
        let post = seed(&state, "Post Title", "Post content.").await;
        let app = init_app!(state);

        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", post.id))
            .set_json(json!({ "post": { "title": "Post Title" } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::to_value(&post).unwrap());
        assert_eq!(stored(&state, &post).await, Some(post));
    }

    #[actix_rt::test]
    async fn test_update_with_invalid_parameters() {
        let state = AppState::in_memory();
        let post = seed(&state, "Post Title", "Post content.").await;
        let app = init_app!(state);

        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", post.id))
            .set_json(json!({ "post": { "title": null, "content": "Sneaky." } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"][0]["field"], "title");
        assert_eq!(stored(&state, &post).await, Some(post));
    }

    #[actix_rt::test]
    async fn test_update_unknown_post_is_not_found() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::put()
            .uri("/posts/9")
            .set_json(json!({ "post": { "title": "Updated Title" } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_destroy_removes_post() {
        let state = AppState::in_memory();
        let post = seed(&state, "Post Title", "Post content.").await;
        let app = init_app!(state);

        let req = test::TestRequest::delete()
            .uri(&format!("/posts/{}", post.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(test::read_body(resp).await.is_empty());

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}", post.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.posts.count().await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_destroy_unknown_post_is_not_found() {
        let state = AppState::in_memory();
        let app = init_app!(state);

        let req = test::TestRequest::delete().uri("/posts/3").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_destroy_rejected_by_store_is_unprocessable() {
        let state = AppState {
            posts: Arc::new(ReferencedPosts::default()),
            storage: Storage::Memory,
        };
        let post = seed(&state, "Post Title", "Post content.").await;
        let app = init_app!(state);

        let req = test::TestRequest::delete()
            .uri(&format!("/posts/{}", post.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({ "errors": [{ "field": "base", "messages": ["still referenced"] }] })
        );
        assert_eq!(stored(&state, &post).await, Some(post));
    }
}
